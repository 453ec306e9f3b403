pub mod chat;
pub mod generation;

pub use chat::{ChatClient, ChatSession, UiMessage};
pub use generation::GenerationClient;
