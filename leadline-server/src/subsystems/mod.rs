pub mod chat;
pub mod engage;
pub mod persist;
pub mod scoring;
pub mod signals;
