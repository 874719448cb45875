pub mod config;
pub mod db;
pub mod error;
pub mod ipc;
pub mod llm;
pub mod models;

pub use config::LeadlineConfig;
pub use error::LeadlineError;
pub use llm::{ChatBackend, ChatConfig, ChatError, GeminiChatClient};
