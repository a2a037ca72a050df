#![allow(dead_code)]

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::net::TcpListener;

use journal_api::config::{
    AppConfig, Environment, ImageConfig, LangfuseConfig, LlmConfig, PromptConfig, PromptSourceKind,
    SecurityConfig, ServerConfig, StorageConfig, DEFAULT_LANGFUSE_HOST, DEFAULT_OPENAI_BASE_URL,
    DEFAULT_OPENROUTER_BASE_URL, DEFAULT_QUESTION_MODEL, DEFAULT_RECRAFT_BASE_URL,
};
use journal_api::server;
use journal_api::state::AppState;

pub const PASSWORD: &str = "correct horse";
pub const JWT_SECRET: &str = "integration-test-secret";

/// Template directory shipped with the crate.
pub fn prompts_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("prompts")
}

/// Local-storage configuration with no provider credentials.
pub fn test_config(data_dir: &Path) -> AppConfig {
    AppConfig {
        environment: Environment::Development,
        server: ServerConfig { port: 0 },
        security: SecurityConfig {
            jwt_secret: JWT_SECRET.to_string(),
            auth_password: PASSWORD.to_string(),
            jwt_expiry_hours: 24,
            cors_origins: vec!["*".to_string()],
        },
        storage: StorageConfig::Local {
            data_dir: data_dir.to_path_buf(),
        },
        llm: LlmConfig {
            openrouter_api_key: None,
            openrouter_base_url: DEFAULT_OPENROUTER_BASE_URL.to_string(),
            question_model: DEFAULT_QUESTION_MODEL.to_string(),
            image_idea_model: None,
        },
        images: ImageConfig {
            service: None,
            openai_api_key: None,
            openai_image_model: None,
            openai_base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            recraft_api_key: None,
            recraft_image_model: None,
            recraft_base_url: DEFAULT_RECRAFT_BASE_URL.to_string(),
        },
        prompts: PromptConfig {
            source: PromptSourceKind::File,
            dir: prompts_dir(),
            langfuse: LangfuseConfig {
                host: DEFAULT_LANGFUSE_HOST.to_string(),
                public_key: None,
                secret_key: None,
            },
            cache_ttl_secs: 60,
        },
    }
}

/// The real router served in-process on an ephemeral port.
pub struct TestServer {
    pub base_url: String,
    pub client: Client,
    data: TempDir,
}

impl TestServer {
    pub async fn start() -> Result<Self> {
        Self::start_with(|_| {}).await
    }

    /// Starts a server after letting the caller adjust the default configuration.
    pub async fn start_with(configure: impl FnOnce(&mut AppConfig)) -> Result<Self> {
        let data = tempfile::tempdir().context("failed to create data dir")?;
        let mut config = test_config(data.path());
        configure(&mut config);

        let state = AppState::from_config(config)?;
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let base_url = format!("http://{}", listener.local_addr()?);

        tokio::spawn(async move {
            let _ = axum::serve(listener, server::app(state)).await;
        });

        Ok(Self {
            base_url,
            client: Client::new(),
            data,
        })
    }

    pub fn data_dir(&self) -> &Path {
        self.data.path()
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn login(&self) -> Result<String> {
        let res = self
            .client
            .post(self.url("/api/auth/login"))
            .json(&json!({ "password": PASSWORD }))
            .send()
            .await?;
        anyhow::ensure!(res.status() == StatusCode::OK, "login failed: {}", res.status());
        let body: Value = res.json().await?;
        body["token"]
            .as_str()
            .map(str::to_string)
            .context("login response has no token")
    }

    pub async fn get(&self, path: &str) -> Result<RequestBuilder> {
        Ok(self.client.get(self.url(path)).bearer_auth(self.login().await?))
    }

    pub async fn post(&self, path: &str, body: Value) -> Result<RequestBuilder> {
        Ok(self
            .client
            .post(self.url(path))
            .bearer_auth(self.login().await?)
            .json(&body))
    }

    pub async fn delete(&self, path: &str, body: Value) -> Result<RequestBuilder> {
        Ok(self
            .client
            .delete(self.url(path))
            .bearer_auth(self.login().await?)
            .json(&body))
    }
}

/// Error message carried by an API error body.
pub async fn error_message(res: reqwest::Response) -> Result<String> {
    let body: Value = res.json().await?;
    body["error"]
        .as_str()
        .map(str::to_string)
        .context("error body has no message")
}
