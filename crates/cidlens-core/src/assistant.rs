//! Retrieval-grounded question answering.

use std::sync::Arc;

use cidlens_index::{ContextFormatter, RetrievalConfig, RetrievalEngine, RetrievalResult};
use cidlens_llm::provider::Message;
use cidlens_llm::{EmbeddingProvider, LlmError, LlmProvider};
use cidlens_memory::CodeRepository;

use crate::prompt::build_prompt;

#[derive(Debug, thiserror::Error)]
pub enum AssistantError {
    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error("question is empty")]
    EmptyQuestion,

    #[error("model returned an empty reply")]
    EmptyReply,
}

/// Reply with the records that grounded it.
#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    pub reply: String,
    pub sources: Vec<RetrievalResult>,
}

/// Runs search → format → prompt → generation for one question.
pub struct Assistant<R, P> {
    engine: RetrievalEngine<R, P>,
    formatter: ContextFormatter,
    provider: Arc<P>,
}

impl<R, P> Assistant<R, P>
where
    R: CodeRepository,
    P: EmbeddingProvider + LlmProvider,
{
    #[must_use]
    pub fn new(
        repository: Arc<R>,
        provider: Arc<P>,
        retrieval: RetrievalConfig,
        formatter: ContextFormatter,
    ) -> Self {
        Self {
            engine: RetrievalEngine::new(repository, Arc::clone(&provider), retrieval),
            formatter,
            provider,
        }
    }

    #[must_use]
    pub fn engine(&self) -> &RetrievalEngine<R, P> {
        &self.engine
    }

    /// Answer `question` given the prior turns in `history`.
    ///
    /// Retrieval problems never fail the call; the prompt then tells the
    /// model that no classification data was found.
    ///
    /// # Errors
    ///
    /// Returns an error if the question is blank, generation fails, or the
    /// model's reply is empty once reasoning blocks are removed.
    pub async fn answer(
        &self,
        question: &str,
        history: &[Message],
    ) -> Result<Answer, AssistantError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(AssistantError::EmptyQuestion);
        }

        let sources = self.engine.search(question).await;
        let context = self.formatter.format(&sources);
        tracing::debug!(
            sources = sources.len(),
            context_len = context.len(),
            history = history.len(),
            "prompt context built"
        );

        let prompt = build_prompt(question, history, &context);
        let raw = self.provider.generate(&prompt).await?;
        let reply = strip_reasoning(&raw);
        if reply.is_empty() {
            return Err(AssistantError::EmptyReply);
        }

        Ok(Answer {
            reply: reply.to_owned(),
            sources,
        })
    }
}

/// Drop `<think>…</think>` blocks emitted by reasoning models and trim.
/// An unterminated block swallows the rest of the text.
#[must_use]
pub fn strip_reasoning(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut remaining = text;
    while let Some(start) = remaining.find("<think>") {
        out.push_str(&remaining[..start]);
        let after = &remaining[start + "<think>".len()..];
        match after.find("</think>") {
            Some(end) => remaining = &after[end + "</think>".len()..],
            None => {
                remaining = "";
                break;
            }
        }
    }
    out.push_str(remaining);
    out.trim().to_owned()
}
