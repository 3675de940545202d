use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::error::LlmError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One prior conversation turn, used when building prompts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Turns text into a fixed-length vector through an external model.
///
/// One call is one round trip: implementations do not cache or retry.
pub trait EmbeddingProvider: Send + Sync {
    /// Embed `text`.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, a non-success status, or a
    /// response without a usable `embedding` field.
    fn embed(&self, text: &str) -> impl Future<Output = Result<Vec<f32>, LlmError>> + Send;

    fn name(&self) -> &str;

    /// Embed `text`, logging and discarding any failure.
    fn embed_or_none(&self, text: &str) -> impl Future<Output = Option<Vec<f32>>> + Send {
        async move {
            match self.embed(text).await {
                Ok(vector) => Some(vector),
                Err(e) => {
                    tracing::warn!(provider = self.name(), "embedding failed: {e}");
                    None
                }
            }
        }
    }
}

/// Produces a completion for a fully built prompt.
pub trait LlmProvider: Send + Sync {
    /// # Errors
    ///
    /// Returns an error if the provider is unreachable, times out, or
    /// returns an empty completion.
    fn generate(&self, prompt: &str) -> impl Future<Output = Result<String, LlmError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(Option<Vec<f32>>);

    impl EmbeddingProvider for Fixed {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>, LlmError> {
            self.0
                .clone()
                .ok_or_else(|| LlmError::Other("unavailable".into()))
        }

        #[allow(clippy::unnecessary_literal_bound)]
        fn name(&self) -> &str {
            "fixed"
        }
    }

    #[tokio::test]
    async fn embed_or_none_passes_vector_through() {
        let provider = Fixed(Some(vec![0.5, 0.5]));
        assert_eq!(provider.embed_or_none("x").await, Some(vec![0.5, 0.5]));
    }

    #[tokio::test]
    async fn embed_or_none_swallows_error() {
        let provider = Fixed(None);
        assert!(provider.embed_or_none("x").await.is_none());
    }

    #[test]
    fn message_constructors_set_role() {
        assert_eq!(Message::user("oi").role, Role::User);
        assert_eq!(Message::assistant("olá").role, Role::Assistant);
    }

    #[test]
    fn role_serializes_lowercase() {
        let json = serde_json::to_string(&Role::Assistant).unwrap();
        assert_eq!(json, "\"assistant\"");
    }
}
