//! Ollama `/api/generate` client over `reqwest`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use notesgen_shared::{AppConfig, NotesError, Result};

use crate::GenerationClient;

/// User-Agent string for generation requests.
const USER_AGENT: &str = concat!("notesgen/", env!("CARGO_PKG_VERSION"));

/// Maximum characters of an error body echoed back in error messages.
const MAX_ERROR_BODY_CHARS: usize = 500;

/// Connection settings for one model on one endpoint.
#[derive(Debug, Clone)]
pub struct OllamaConfig {
    pub endpoint: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl OllamaConfig {
    /// Settings for the per-topic notes model.
    pub fn notes(config: &AppConfig) -> Self {
        Self {
            endpoint: config.generation.endpoint.clone(),
            model: config.generation.notes_model.clone(),
            timeout_secs: config.generation.timeout_secs,
        }
    }

    /// Settings for the syllabus-structuring model.
    pub fn structure(config: &AppConfig) -> Self {
        Self {
            model: config.generation.structure_model.clone(),
            ..Self::notes(config)
        }
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

/// Non-streaming Ollama client.
pub struct OllamaClient {
    client: Client,
    config: OllamaConfig,
}

impl OllamaClient {
    pub fn new(config: OllamaConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                NotesError::GenerationClient(format!("failed to build HTTP client: {e}"))
            })?;
        Ok(Self { client, config })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }
}

#[async_trait]
impl GenerationClient for OllamaClient {
    #[instrument(skip_all, fields(model = %self.config.model, prompt_len = prompt.len()))]
    async fn generate(&self, prompt: &str) -> Result<String> {
        let endpoint = &self.config.endpoint;
        let body = GenerateRequest {
            model: &self.config.model,
            prompt,
            stream: false,
        };

        let response = self
            .client
            .post(endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| NotesError::GenerationClient(format!("{endpoint}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let excerpt: String = text.chars().take(MAX_ERROR_BODY_CHARS).collect();
            return Err(NotesError::GenerationClient(format!(
                "{endpoint}: HTTP {status}: {excerpt}"
            )));
        }

        let parsed: GenerateResponse = response.json().await.map_err(|e| {
            NotesError::GenerationClient(format!("{endpoint}: undecodable response: {e}"))
        })?;

        if parsed.response.trim().is_empty() {
            return Err(NotesError::GenerationClient(format!(
                "{endpoint}: model returned empty text"
            )));
        }

        debug!(chars = parsed.response.len(), "generation complete");
        Ok(parsed.response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> OllamaClient {
        OllamaClient::new(OllamaConfig {
            endpoint: format!("{}/api/generate", server.uri()),
            model: "llama3.2".into(),
            timeout_secs: 5,
        })
        .expect("build client")
    }

    #[test]
    fn structure_config_swaps_model_only() {
        let app = AppConfig::default();
        let notes = OllamaConfig::notes(&app);
        let structure = OllamaConfig::structure(&app);
        assert_eq!(notes.model, "llama3.2");
        assert_eq!(structure.model, "llama3");
        assert_eq!(notes.endpoint, structure.endpoint);
    }

    #[tokio::test]
    async fn generate_returns_response_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .and(body_partial_json(serde_json::json!({
                "model": "llama3.2",
                "prompt": "Explain loops",
                "stream": false
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "model": "llama3.2",
                "response": "A loop repeats a block.",
                "done": true
            })))
            .expect(1)
            .mount(&server)
            .await;

        let text = client_for(&server).generate("Explain loops").await.unwrap();
        assert_eq!(text, "A loop repeats a block.");
    }

    #[tokio::test]
    async fn http_error_is_a_client_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(500).set_body_string("model not loaded"))
            .mount(&server)
            .await;

        let err = client_for(&server).generate("Explain loops").await.unwrap_err();
        assert!(matches!(err, NotesError::GenerationClient(_)));
        assert!(err.to_string().contains("model not loaded"));
    }

    #[tokio::test]
    async fn blank_response_is_a_client_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "response": "  " })),
            )
            .mount(&server)
            .await;

        let err = client_for(&server).generate("Explain loops").await.unwrap_err();
        assert!(err.to_string().contains("empty text"));
    }

    #[tokio::test]
    async fn undecodable_body_is_a_client_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>proxy</html>"))
            .mount(&server)
            .await;

        let err = client_for(&server).generate("Explain loops").await.unwrap_err();
        assert!(err.to_string().contains("undecodable"));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_a_client_error() {
        let client = OllamaClient::new(OllamaConfig {
            endpoint: "http://127.0.0.1:1/api/generate".into(),
            model: "llama3.2".into(),
            timeout_secs: 2,
        })
        .unwrap();

        let err = client.generate("Explain loops").await.unwrap_err();
        assert!(matches!(err, NotesError::GenerationClient(_)));
    }
}
