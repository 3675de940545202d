//! Embedding and text-generation providers.

pub mod error;
pub(crate) mod http;
#[cfg(feature = "mock")]
pub mod mock;
pub mod ollama;
pub mod provider;

pub use error::LlmError;
pub use provider::{EmbeddingProvider, LlmProvider};
