//! Configuration, prompt construction, and the retrieval-grounded assistant.

pub mod assistant;
pub mod config;
pub mod prompt;

pub use assistant::{Answer, Assistant, AssistantError};
pub use config::Config;
