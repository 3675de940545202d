use std::time::Duration;

use ollama_rs::Ollama;
use ollama_rs::generation::completion::request::GenerationRequest;
use serde::{Deserialize, Serialize};

use crate::error::LlmError;
use crate::provider::{EmbeddingProvider, LlmProvider};

const PROVIDER: &str = "ollama";
const EMBEDDINGS_PATH: &str = "/api/embeddings";
const DEFAULT_PORT: u16 = 11434;

pub const DEFAULT_EMBED_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_GENERATE_TIMEOUT: Duration = Duration::from_secs(100);

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    embedding: Option<Vec<f32>>,
}

/// Ollama-backed provider: `/api/embeddings` for vectors, `/api/generate`
/// for completions.
#[derive(Debug, Clone)]
pub struct OllamaProvider {
    client: Ollama,
    http: reqwest::Client,
    base_url: String,
    model: String,
    embedding_model: String,
    embed_timeout: Duration,
    generate_timeout: Duration,
}

impl OllamaProvider {
    #[must_use]
    pub fn new(base_url: &str, model: String, embedding_model: String) -> Self {
        let base_url = base_url.trim_end_matches('/').to_owned();
        let (host, port) = parse_host_port(&base_url);
        Self {
            client: Ollama::new(host, port),
            http: crate::http::default_client(),
            base_url,
            model,
            embedding_model,
            embed_timeout: DEFAULT_EMBED_TIMEOUT,
            generate_timeout: DEFAULT_GENERATE_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_embed_timeout(mut self, timeout: Duration) -> Self {
        self.embed_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_generate_timeout(mut self, timeout: Duration) -> Self {
        self.generate_timeout = timeout;
        self
    }

    #[must_use]
    pub fn embedding_model(&self) -> &str {
        &self.embedding_model
    }

    /// Check if Ollama is reachable.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection to Ollama fails.
    pub async fn health_check(&self) -> Result<(), LlmError> {
        self.client.list_local_models().await.map_err(|e| {
            LlmError::Other(format!("failed to connect to Ollama, is it running? {e}"))
        })?;
        Ok(())
    }
}

impl EmbeddingProvider for OllamaProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, LlmError> {
        let response = self
            .http
            .post(format!("{}{EMBEDDINGS_PATH}", self.base_url))
            .timeout(self.embed_timeout)
            .json(&EmbeddingRequest {
                model: &self.embedding_model,
                prompt: text,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(LlmError::Status {
                provider: PROVIDER,
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await?;
        let parsed: EmbeddingResponse = serde_json::from_slice(&body)?;
        match parsed.embedding {
            Some(vector) if !vector.is_empty() => Ok(vector),
            _ => Err(LlmError::EmptyResponse { provider: PROVIDER }),
        }
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        PROVIDER
    }
}

impl LlmProvider for OllamaProvider {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        let request = GenerationRequest::new(self.model.clone(), prompt.to_owned());

        let response = tokio::time::timeout(self.generate_timeout, self.client.generate(request))
            .await
            .map_err(|_| LlmError::Timeout { provider: PROVIDER })?
            .map_err(|e| LlmError::Other(format!("Ollama generate request failed: {e}")))?;

        let text = response.response.trim();
        if text.is_empty() {
            return Err(LlmError::EmptyResponse { provider: PROVIDER });
        }
        Ok(text.to_owned())
    }
}

fn parse_host_port(url: &str) -> (String, u16) {
    let url = url.trim_end_matches('/');
    if let Some(colon_pos) = url.rfind(':') {
        let port_str = &url[colon_pos + 1..];
        if let Ok(port) = port_str.parse::<u16>() {
            let host = url[..colon_pos].to_string();
            return (host, port);
        }
    }
    (url.to_string(), DEFAULT_PORT)
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn provider_for(server: &MockServer) -> OllamaProvider {
        OllamaProvider::new(&server.uri(), "deepseek-r1:8b".into(), "nomic-embed-text".into())
    }

    #[tokio::test]
    async fn embed_posts_model_and_prompt() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/embeddings"))
            .and(body_json(serde_json::json!({
                "model": "nomic-embed-text",
                "prompt": "dor lombar crônica"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "embedding": [0.1, 0.2, 0.3]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let vector = provider_for(&server)
            .embed("dor lombar crônica")
            .await
            .unwrap();
        assert_eq!(vector, vec![0.1, 0.2, 0.3]);
    }

    #[tokio::test]
    async fn embed_non_success_status_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/embeddings"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let err = provider_for(&server).embed("x").await.unwrap_err();
        assert!(matches!(err, LlmError::Status { status: 500, .. }));
    }

    #[tokio::test]
    async fn embed_missing_field_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/embeddings"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "error": "nope" })),
            )
            .mount(&server)
            .await;

        let err = provider_for(&server).embed("x").await.unwrap_err();
        assert!(matches!(err, LlmError::EmptyResponse { .. }));
    }

    #[tokio::test]
    async fn embed_empty_vector_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/embeddings"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "embedding": [] })),
            )
            .mount(&server)
            .await;

        let err = provider_for(&server).embed("x").await.unwrap_err();
        assert!(matches!(err, LlmError::EmptyResponse { .. }));
    }

    #[tokio::test]
    async fn embed_malformed_field_is_json_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/embeddings"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "embedding": "not-a-vector" })),
            )
            .mount(&server)
            .await;

        let err = provider_for(&server).embed("x").await.unwrap_err();
        assert!(matches!(err, LlmError::Json(_)));
    }

    #[tokio::test]
    async fn embed_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/embeddings"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "embedding": [1.0] }))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let provider = provider_for(&server).with_embed_timeout(Duration::from_millis(50));
        let err = provider.embed("x").await.unwrap_err();
        assert!(matches!(err, LlmError::Http(_)));
    }

    #[tokio::test]
    async fn embed_or_none_degrades_on_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        assert!(provider_for(&server).embed_or_none("x").await.is_none());
    }

    #[tokio::test]
    async fn embed_with_unreachable_endpoint_errors() {
        let provider =
            OllamaProvider::new("http://127.0.0.1:1", "test-model".into(), "embed".into());
        assert!(provider.embed("test text").await.is_err());
    }

    #[tokio::test]
    async fn generate_with_unreachable_endpoint_errors() {
        let provider =
            OllamaProvider::new("http://127.0.0.1:1", "test-model".into(), "embed".into());
        assert!(provider.generate("hello").await.is_err());
    }

    #[tokio::test]
    async fn health_check_unreachable_errors() {
        let provider =
            OllamaProvider::new("http://127.0.0.1:1", "test-model".into(), "embed".into());
        let result = provider.health_check().await;
        assert!(result.unwrap_err().to_string().contains("Ollama"));
    }

    #[test]
    fn new_trims_trailing_slash() {
        let provider =
            OllamaProvider::new("http://localhost:11434/", "m".into(), "e".into());
        assert_eq!(provider.base_url, "http://localhost:11434");
    }

    #[test]
    fn default_timeouts() {
        let provider = OllamaProvider::new("http://localhost:11434", "m".into(), "e".into());
        assert_eq!(provider.embed_timeout, Duration::from_secs(30));
        assert_eq!(provider.generate_timeout, Duration::from_secs(100));
    }

    #[test]
    fn name_returns_ollama() {
        let provider = OllamaProvider::new("http://localhost:11434", "m".into(), "e".into());
        assert_eq!(provider.name(), "ollama");
        assert_eq!(provider.embedding_model(), "e");
    }

    #[test]
    fn parse_host_port_with_port() {
        let (host, port) = parse_host_port("http://localhost:11434");
        assert_eq!(host, "http://localhost");
        assert_eq!(port, 11434);
    }

    #[test]
    fn parse_host_port_without_port() {
        let (host, port) = parse_host_port("http://localhost");
        assert_eq!(host, "http://localhost");
        assert_eq!(port, 11434);
    }

    #[test]
    fn parse_host_port_invalid_port_falls_back() {
        let (host, port) = parse_host_port("http://localhost:notaport");
        assert_eq!(host, "http://localhost:notaport");
        assert_eq!(port, 11434);
    }

    #[test]
    fn parse_host_port_ipv4() {
        let (host, port) = parse_host_port("http://192.168.1.1:8080");
        assert_eq!(host, "http://192.168.1.1");
        assert_eq!(port, 8080);
    }
}
