use super::Config;

impl Config {
    pub(crate) fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("CIDLENS_LLM_BASE_URL") {
            self.llm.base_url = v;
        }
        if let Ok(v) = std::env::var("CIDLENS_LLM_MODEL") {
            self.llm.model = v;
        }
        if let Ok(v) = std::env::var("CIDLENS_LLM_EMBEDDING_MODEL") {
            self.llm.embedding_model = v;
        }
        if let Ok(v) = std::env::var("CIDLENS_TIMEOUT_EMBEDDING")
            && let Ok(secs) = v.parse::<u64>()
        {
            self.timeouts.embedding_secs = secs;
        }
        if let Ok(v) = std::env::var("CIDLENS_TIMEOUT_GENERATION")
            && let Ok(secs) = v.parse::<u64>()
        {
            self.timeouts.generation_secs = secs;
        }
        if let Ok(v) = std::env::var("CIDLENS_RETRIEVAL_TOP_K")
            && let Ok(top_k) = v.parse::<usize>()
        {
            self.retrieval.top_k = top_k;
        }
        if let Ok(v) = std::env::var("CIDLENS_RETRIEVAL_MIN_SIMILARITY")
            && let Ok(min) = v.parse::<f32>()
        {
            self.retrieval.min_similarity = min;
        }
        if let Ok(v) = std::env::var("CIDLENS_SQLITE_PATH") {
            self.storage.sqlite_path = v;
        }
    }
}
