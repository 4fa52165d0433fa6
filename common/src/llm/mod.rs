pub mod message;
pub mod history;
pub mod provider;
pub mod gemini;

pub use message::{Message, MessageRole};
pub use history::{Checkpoint, ConversationHistory};
pub use provider::{ChatModel, ChatRequest};
pub use gemini::GeminiClient;
