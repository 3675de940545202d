use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
    #[serde(default)]
    pub retrieval: RetrievalSettings,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub ingest: IngestSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct LlmConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
}

fn default_base_url() -> String {
    "http://localhost:11434".into()
}

fn default_model() -> String {
    "deepseek-r1:8b".into()
}

fn default_embedding_model() -> String {
    "nomic-embed-text".into()
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            embedding_model: default_embedding_model(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct TimeoutConfig {
    #[serde(default = "default_embedding_timeout")]
    pub embedding_secs: u64,
    #[serde(default = "default_generation_timeout")]
    pub generation_secs: u64,
}

fn default_embedding_timeout() -> u64 {
    30
}

fn default_generation_timeout() -> u64 {
    100
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            embedding_secs: default_embedding_timeout(),
            generation_secs: default_generation_timeout(),
        }
    }
}

/// `[retrieval]` section.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct RetrievalSettings {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_min_similarity")]
    pub min_similarity: f32,
    /// Per-field character bound applied by the context formatter.
    #[serde(default = "default_max_field_chars")]
    pub max_field_chars: usize,
}

fn default_top_k() -> usize {
    5
}

fn default_min_similarity() -> f32 {
    0.5
}

fn default_max_field_chars() -> usize {
    cidlens_index::context::DEFAULT_MAX_FIELD_CHARS
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            min_similarity: default_min_similarity(),
            max_field_chars: default_max_field_chars(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct StorageConfig {
    #[serde(default = "default_sqlite_path")]
    pub sqlite_path: String,
}

fn default_sqlite_path() -> String {
    "data/cidlens.db".into()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            sqlite_path: default_sqlite_path(),
        }
    }
}

/// `[ingest]` section: column names of the source table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct IngestSettings {
    #[serde(default = "default_code_column")]
    pub code_column: String,
    #[serde(default = "default_description_column")]
    pub description_column: String,
    /// Empty disables eligibility parsing.
    #[serde(default = "default_eligibility_column")]
    pub eligibility_column: String,
}

fn default_code_column() -> String {
    "CODE".into()
}

fn default_description_column() -> String {
    "DESC".into()
}

fn default_eligibility_column() -> String {
    "BPC".into()
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            code_column: default_code_column(),
            description_column: default_description_column(),
            eligibility_column: default_eligibility_column(),
        }
    }
}
