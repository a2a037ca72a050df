//! Minimal Langfuse prompt-management client (public REST API v2).

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{PromptError, PromptId, PromptSource, PromptTemplate};
use crate::config::LangfuseConfig;

/// Label that marks the version served to the application.
pub const PRODUCTION_LABEL: &str = "production";

pub struct LangfuseClient {
    client: Client,
    host: String,
    public_key: String,
    secret_key: String,
}

#[derive(Debug, Deserialize)]
struct PromptResponse {
    name: String,
    version: Option<u32>,
    prompt: Value,
}

#[derive(Debug, Serialize)]
pub struct CreatePrompt {
    pub name: String,
    pub prompt: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub labels: Vec<String>,
    pub tags: Vec<String>,
    pub config: Value,
}

impl CreatePrompt {
    /// Text prompt for a catalog entry, labelled for production use.
    pub fn for_catalog(id: PromptId, text: String) -> Self {
        Self {
            name: id.name(),
            prompt: text,
            kind: "text",
            labels: vec![PRODUCTION_LABEL.to_string()],
            tags: id.tags(),
            config: serde_json::json!({ "description": id.description() }),
        }
    }
}

impl LangfuseClient {
    pub fn new(host: impl Into<String>, public_key: String, secret_key: String) -> Self {
        Self {
            client: Client::new(),
            host: host.into().trim_end_matches('/').to_string(),
            public_key,
            secret_key,
        }
    }

    pub fn from_config(config: &LangfuseConfig) -> Result<Self, PromptError> {
        let public_key = config
            .public_key
            .clone()
            .ok_or(PromptError::NotConfigured("LANGFUSE_PUBLIC_KEY"))?;
        let secret_key = config
            .secret_key
            .clone()
            .ok_or(PromptError::NotConfigured("LANGFUSE_SECRET_KEY"))?;
        Ok(Self::new(config.host.clone(), public_key, secret_key))
    }

    fn prompts_url(&self) -> String {
        format!("{}/api/public/v2/prompts", self.host)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, PromptError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(PromptError::Upstream {
            status: status.as_u16(),
            body,
        })
    }

    /// Fetches the version of `name` carrying `label`.
    pub async fn get_prompt(&self, name: &str, label: &str) -> Result<PromptTemplate, PromptError> {
        let encoded: String = url::form_urlencoded::byte_serialize(name.as_bytes()).collect();
        let response = self
            .client
            .get(format!("{}/{}", self.prompts_url(), encoded))
            .basic_auth(&self.public_key, Some(&self.secret_key))
            .query(&[("label", label)])
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(PromptError::NotFound(name.to_string()));
        }

        let body: PromptResponse = Self::check(response).await?.json().await?;
        match body.prompt {
            Value::String(text) => Ok(PromptTemplate {
                name: body.name,
                text,
                version: body.version,
            }),
            _ => Err(PromptError::NotText(name.to_string())),
        }
    }

    /// Creates a new version of a prompt.
    pub async fn create_prompt(&self, prompt: &CreatePrompt) -> Result<(), PromptError> {
        let response = self
            .client
            .post(self.prompts_url())
            .basic_auth(&self.public_key, Some(&self.secret_key))
            .json(prompt)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }
}

#[async_trait]
impl PromptSource for LangfuseClient {
    async fn get(&self, id: PromptId) -> Result<PromptTemplate, PromptError> {
        self.get_prompt(&id.name(), PRODUCTION_LABEL).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    // base64("pk:sk")
    const BASIC: &str = "Basic cGs6c2s=";

    fn client(server: &MockServer) -> LangfuseClient {
        LangfuseClient::new(server.uri(), "pk".into(), "sk".into())
    }

    #[tokio::test]
    async fn test_get_prompt_encodes_folder_name() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/public/v2/prompts/image%2Fprompt-idea"))
            .and(query_param("label", "production"))
            .and(header("authorization", BASIC))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "image/prompt-idea",
                "version": 3,
                "type": "text",
                "prompt": "Picture {{entry}}"
            })))
            .mount(&server)
            .await;

        let template = client(&server).get(PromptId::ImagePromptIdea).await.unwrap();
        assert_eq!(template.text, "Picture {{entry}}");
        assert_eq!(template.version, Some(3));
    }

    #[tokio::test]
    async fn test_missing_prompt() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        assert!(matches!(
            client(&server).get(PromptId::Question2Main).await,
            Err(PromptError::NotFound(name)) if name == "question-2/main"
        ));
    }

    #[tokio::test]
    async fn test_chat_prompts_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "question-2/main",
                "version": 1,
                "type": "chat",
                "prompt": [{"role": "system", "content": "x"}]
            })))
            .mount(&server)
            .await;

        assert!(matches!(
            client(&server).get(PromptId::Question2Main).await,
            Err(PromptError::NotText(_))
        ));
    }

    #[tokio::test]
    async fn test_create_prompt_sends_catalog_metadata() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/public/v2/prompts"))
            .and(header("authorization", BASIC))
            .and(body_partial_json(json!({
                "name": "bridge-to-image/message",
                "type": "text",
                "labels": ["production"],
                "tags": ["bridge", "image"],
                "config": {"description": "Creates a warm transition message from journaling to image generation"}
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let prompt = CreatePrompt::for_catalog(PromptId::BridgeToImage, "Bridge".into());
        client(&server).create_prompt(&prompt).await.unwrap();
    }
}
