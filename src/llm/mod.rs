//! Chat-completions client used for every text generation call.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::LlmConfig;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Provider returned {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("Provider returned no choices")]
    EmptyResponse,
}

#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Sends `prompt` as a single user message and returns the reply text.
    async fn complete(&self, model: &str, prompt: &str) -> Result<String, LlmError>;
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    #[serde(default)]
    content: Option<String>,
}

/// OpenRouter's OpenAI-compatible `/chat/completions` endpoint.
pub struct OpenRouterClient {
    client: Client,
    api_key: Option<String>,
    base_url: String,
}

impl OpenRouterClient {
    pub fn new(api_key: Option<String>, base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &LlmConfig) -> Self {
        Self::new(config.openrouter_api_key.clone(), config.openrouter_base_url.clone())
    }
}

#[async_trait]
impl ChatClient for OpenRouterClient {
    async fn complete(&self, model: &str, prompt: &str) -> Result<String, LlmError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(LlmError::NotConfigured("OPENROUTER_API_KEY"))?;

        let request = ChatRequest {
            model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        tracing::debug!("Chat completion with {} ({} prompt chars)", model, prompt.len());
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or(LlmError::EmptyResponse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_complete_returns_first_choice() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer or-key"))
            .and(body_json(json!({
                "model": "some/model",
                "messages": [{"role": "user", "content": "Hello"}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": "Hi there"}}]
            })))
            .mount(&server)
            .await;

        let client = OpenRouterClient::new(Some("or-key".into()), server.uri());
        assert_eq!(client.complete("some/model", "Hello").await.unwrap(), "Hi there");
    }

    #[tokio::test]
    async fn test_missing_key_fails_before_request() {
        let client = OpenRouterClient::new(None, "http://127.0.0.1:9");
        let err = client.complete("m", "p").await.unwrap_err();
        assert!(matches!(err, LlmError::NotConfigured("OPENROUTER_API_KEY")));
    }

    #[tokio::test]
    async fn test_upstream_error_surfaces_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
            .mount(&server)
            .await;

        let client = OpenRouterClient::new(Some("k".into()), server.uri());
        match client.complete("m", "p").await.unwrap_err() {
            LlmError::Upstream { status, body } => {
                assert_eq!(status, 429);
                assert_eq!(body, "slow down");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_empty_choices() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
            .mount(&server)
            .await;

        let client = OpenRouterClient::new(Some("k".into()), server.uri());
        assert!(matches!(client.complete("m", "p").await, Err(LlmError::EmptyResponse)));
    }
}
