use std::io::Write;

use serial_test::serial;

use super::*;

const ENV_KEYS: [&str; 8] = [
    "CIDLENS_LLM_BASE_URL",
    "CIDLENS_LLM_MODEL",
    "CIDLENS_LLM_EMBEDDING_MODEL",
    "CIDLENS_TIMEOUT_EMBEDDING",
    "CIDLENS_TIMEOUT_GENERATION",
    "CIDLENS_RETRIEVAL_TOP_K",
    "CIDLENS_RETRIEVAL_MIN_SIMILARITY",
    "CIDLENS_SQLITE_PATH",
];

fn clear_env() {
    for key in ENV_KEYS {
        unsafe { std::env::remove_var(key) };
    }
}

#[test]
fn defaults() {
    let config = Config::default();
    assert_eq!(config.llm.base_url, "http://localhost:11434");
    assert_eq!(config.llm.model, "deepseek-r1:8b");
    assert_eq!(config.llm.embedding_model, "nomic-embed-text");
    assert_eq!(config.timeouts.embedding_secs, 30);
    assert_eq!(config.timeouts.generation_secs, 100);
    assert_eq!(config.retrieval.top_k, 5);
    assert!((config.retrieval.min_similarity - 0.5).abs() < f32::EPSILON);
    assert_eq!(config.retrieval.max_field_chars, 500);
    assert_eq!(config.storage.sqlite_path, "data/cidlens.db");
    assert_eq!(config.ingest.code_column, "CODE");
    assert_eq!(config.ingest.description_column, "DESC");
    assert_eq!(config.ingest.eligibility_column, "BPC");
    assert!(config.validate().is_ok());
}

#[test]
#[serial]
fn load_missing_file_uses_defaults() {
    clear_env();
    let config = Config::load(Path::new("/nonexistent/cidlens.toml")).unwrap();
    assert_eq!(config, Config::default());
}

#[test]
#[serial]
fn load_partial_file_fills_defaults() {
    clear_env();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
[llm]
model = "llama3.1:8b"

[retrieval]
top_k = 3
"#
    )
    .unwrap();

    let config = Config::load(file.path()).unwrap();
    assert_eq!(config.llm.model, "llama3.1:8b");
    assert_eq!(config.llm.embedding_model, "nomic-embed-text");
    assert_eq!(config.retrieval.top_k, 3);
    assert!((config.retrieval.min_similarity - 0.5).abs() < f32::EPSILON);
    assert_eq!(config.timeouts, TimeoutConfig::default());
}

#[test]
#[serial]
fn load_rejects_malformed_toml() {
    clear_env();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "[retrieval\ntop_k = ").unwrap();
    let err = Config::load(file.path()).unwrap_err();
    assert!(format!("{err:#}").contains("failed to parse config file"));
}

#[test]
#[serial]
fn load_rejects_out_of_range_values() {
    clear_env();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "[retrieval]\nmin_similarity = 1.5\n").unwrap();
    let err = Config::load(file.path()).unwrap_err();
    assert!(err.to_string().contains("min_similarity"));
}

#[test]
#[serial]
fn env_overrides() {
    clear_env();
    let mut config = Config::default();

    unsafe {
        std::env::set_var("CIDLENS_LLM_BASE_URL", "http://ollama:11434");
        std::env::set_var("CIDLENS_LLM_MODEL", "qwen2.5:7b");
        std::env::set_var("CIDLENS_LLM_EMBEDDING_MODEL", "mxbai-embed-large");
        std::env::set_var("CIDLENS_SQLITE_PATH", "/var/lib/cidlens/codes.db");
    }
    config.apply_env_overrides();
    clear_env();

    assert_eq!(config.llm.base_url, "http://ollama:11434");
    assert_eq!(config.llm.model, "qwen2.5:7b");
    assert_eq!(config.llm.embedding_model, "mxbai-embed-large");
    assert_eq!(config.storage.sqlite_path, "/var/lib/cidlens/codes.db");
}

#[test]
#[serial]
fn env_override_numeric_values() {
    clear_env();
    let mut config = Config::default();

    unsafe {
        std::env::set_var("CIDLENS_TIMEOUT_EMBEDDING", "5");
        std::env::set_var("CIDLENS_TIMEOUT_GENERATION", "240");
        std::env::set_var("CIDLENS_RETRIEVAL_TOP_K", "8");
        std::env::set_var("CIDLENS_RETRIEVAL_MIN_SIMILARITY", "0.65");
    }
    config.apply_env_overrides();
    clear_env();

    assert_eq!(config.timeouts.embedding_secs, 5);
    assert_eq!(config.timeouts.generation_secs, 240);
    assert_eq!(config.retrieval.top_k, 8);
    assert!((config.retrieval.min_similarity - 0.65).abs() < f32::EPSILON);
}

#[test]
#[serial]
fn env_override_invalid_number_ignored() {
    clear_env();
    let mut config = Config::default();

    unsafe { std::env::set_var("CIDLENS_RETRIEVAL_TOP_K", "many") };
    config.apply_env_overrides();
    clear_env();

    assert_eq!(config.retrieval.top_k, 5);
}

#[test]
#[serial]
fn env_overrides_file_values() {
    clear_env();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "[llm]\nmodel = \"from-file\"\n").unwrap();

    unsafe { std::env::set_var("CIDLENS_LLM_MODEL", "from-env") };
    let config = Config::load(file.path());
    clear_env();

    assert_eq!(config.unwrap().llm.model, "from-env");
}

#[test]
#[serial]
fn env_zero_top_k_fails_validation() {
    clear_env();
    unsafe { std::env::set_var("CIDLENS_RETRIEVAL_TOP_K", "0") };
    let result = Config::load(Path::new("/nonexistent/cidlens.toml"));
    clear_env();

    assert!(result.unwrap_err().to_string().contains("top_k"));
}

#[test]
fn validate_rejects_zero_timeout() {
    let mut config = Config::default();
    config.timeouts.generation_secs = 0;
    assert!(config.validate().is_err());
}

#[test]
fn validate_rejects_zero_field_bound() {
    let mut config = Config::default();
    config.retrieval.max_field_chars = 0;
    assert!(config.validate().is_err());
}

#[test]
fn validate_rejects_blank_paths() {
    let mut config = Config::default();
    config.storage.sqlite_path = "  ".into();
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.llm.base_url = String::new();
    assert!(config.validate().is_err());
}

#[test]
fn retrieval_config_mirrors_settings() {
    let mut config = Config::default();
    config.retrieval.top_k = 7;
    config.retrieval.min_similarity = 0.3;
    let retrieval = config.retrieval_config();
    assert_eq!(retrieval.top_k, 7);
    assert!((retrieval.min_similarity - 0.3).abs() < f32::EPSILON);
}

#[test]
fn formatter_uses_field_bound() {
    let mut config = Config::default();
    config.retrieval.max_field_chars = 42;
    assert_eq!(config.context_formatter().max_field_chars(), 42);
}

#[test]
fn ingest_config_maps_columns() {
    let mut config = Config::default();
    config.ingest.code_column = "Codigo".into();
    let ingest = config.ingest_config();
    assert_eq!(ingest.code_column, "Codigo");
    assert_eq!(ingest.description_column, "DESC");
    assert_eq!(ingest.eligibility_column.as_deref(), Some("BPC"));
    assert!(!ingest.fresh);
    assert!(!ingest.skip_embeddings);
    assert!(ingest.limit.is_none());
}

#[test]
fn blank_eligibility_column_disables_it() {
    let mut config = Config::default();
    config.ingest.eligibility_column = " ".into();
    assert!(config.ingest_config().eligibility_column.is_none());
}

#[test]
fn ollama_provider_uses_embedding_model() {
    let mut config = Config::default();
    config.llm.embedding_model = "all-minilm".into();
    assert_eq!(config.ollama_provider().embedding_model(), "all-minilm");
}

#[test]
fn serializes_back_to_toml() {
    let config = Config::default();
    let text = toml::to_string(&config).unwrap();
    let parsed: Config = toml::from_str(&text).unwrap();
    assert_eq!(parsed, config);
}
