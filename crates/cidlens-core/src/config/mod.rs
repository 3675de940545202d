mod env;
mod types;

#[cfg(test)]
mod tests;

pub use types::*;

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, ensure};

use cidlens_index::{ContextFormatter, IngestConfig, RetrievalConfig};
use cidlens_llm::ollama::OllamaProvider;

impl Config {
    /// Load configuration from a TOML file, apply `CIDLENS_*` env overrides,
    /// and validate the result.
    ///
    /// Falls back to defaults when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed, or
    /// the final configuration is invalid.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str::<Self>(&content).context("failed to parse config file")?
        } else {
            tracing::debug!(path = %path.display(), "config file not found, using defaults");
            Self::default()
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    ///
    /// Returns an error naming the first out-of-range setting.
    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(
            !self.llm.base_url.trim().is_empty(),
            "llm.base_url must not be empty"
        );
        ensure!(
            self.retrieval.top_k >= 1,
            "retrieval.top_k must be at least 1"
        );
        ensure!(
            (0.0..=1.0).contains(&self.retrieval.min_similarity),
            "retrieval.min_similarity must be within [0.0, 1.0], got {}",
            self.retrieval.min_similarity
        );
        ensure!(
            self.retrieval.max_field_chars > 0,
            "retrieval.max_field_chars must be positive"
        );
        ensure!(
            self.timeouts.embedding_secs > 0 && self.timeouts.generation_secs > 0,
            "timeouts must be positive"
        );
        ensure!(
            !self.storage.sqlite_path.trim().is_empty(),
            "storage.sqlite_path must not be empty"
        );
        Ok(())
    }

    #[must_use]
    pub fn retrieval_config(&self) -> RetrievalConfig {
        RetrievalConfig {
            top_k: self.retrieval.top_k,
            min_similarity: self.retrieval.min_similarity,
        }
    }

    #[must_use]
    pub fn context_formatter(&self) -> ContextFormatter {
        ContextFormatter::new(self.retrieval.max_field_chars)
    }

    /// Column mapping for ingestion; run flags keep their defaults.
    #[must_use]
    pub fn ingest_config(&self) -> IngestConfig {
        let eligibility = self.ingest.eligibility_column.trim();
        IngestConfig {
            code_column: self.ingest.code_column.clone(),
            description_column: self.ingest.description_column.clone(),
            eligibility_column: (!eligibility.is_empty()).then(|| eligibility.to_owned()),
            ..IngestConfig::default()
        }
    }

    #[must_use]
    pub fn ollama_provider(&self) -> OllamaProvider {
        OllamaProvider::new(
            &self.llm.base_url,
            self.llm.model.clone(),
            self.llm.embedding_model.clone(),
        )
        .with_embed_timeout(Duration::from_secs(self.timeouts.embedding_secs))
        .with_generate_timeout(Duration::from_secs(self.timeouts.generation_secs))
    }
}
