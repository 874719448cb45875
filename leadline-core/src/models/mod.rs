pub mod conversation;
pub mod lead;
pub mod message;

pub use conversation::Conversation;
pub use lead::Lead;
pub use message::ChatMessage;
