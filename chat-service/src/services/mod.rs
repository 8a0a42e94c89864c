pub mod chat;
pub mod metrics;
pub mod prompt;
pub mod providers;
pub mod table;

pub use chat::{Answer, ChatError, ChatService};
