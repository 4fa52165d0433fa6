pub mod error;
pub mod schema;
pub mod llm;
pub mod db;
pub mod agent;
pub mod config;
pub mod tracing;

pub use error::{AskDbError, Result};
