pub mod tables;
pub mod description;

pub use tables::{Column, ForeignKey, Table, TABLES};
pub use description::{create_tables_sql, schema_description};
