use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::config::{ConfigError, ImageConfig, ImageServiceKind};
use crate::llm::{ChatClient, LlmError};
use crate::prompts::{PromptError, PromptId, PromptSource};
use crate::storage::{NewImage, Storage, StorageError};

#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Image provider returned {status}: {body}")]
    Upstream { status: u16, body: String },
    #[error("Image provider returned no image")]
    EmptyResponse,
    #[error("Invalid base64 image data: {0}")]
    Decode(#[from] base64::DecodeError),
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("Prompt error: {0}")]
    Prompt(#[from] PromptError),
    #[error("Model error: {0}")]
    Llm(#[from] LlmError),
}

#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Returns the raw bytes of one generated image.
    async fn generate(&self, prompt: &str) -> Result<Vec<u8>, ImageError>;
}

#[derive(Debug, Deserialize)]
struct GenerationResponse {
    #[serde(default)]
    data: Vec<GeneratedImage>,
}

#[derive(Debug, Deserialize)]
struct GeneratedImage {
    b64_json: Option<String>,
    url: Option<String>,
}

async fn post_generation(
    client: &Client,
    url: String,
    api_key: &str,
    body: serde_json::Value,
) -> Result<GenerationResponse, ImageError> {
    let response = client.post(url).bearer_auth(api_key).json(&body).send().await?;
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ImageError::Upstream {
            status: status.as_u16(),
            body,
        });
    }
    Ok(response.json().await?)
}

pub struct OpenAiImageGenerator {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAiImageGenerator {
    pub fn new(client: Client, api_key: String, model: String, base_url: &str) -> Self {
        Self {
            client,
            api_key,
            model,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ImageGenerator for OpenAiImageGenerator {
    async fn generate(&self, prompt: &str) -> Result<Vec<u8>, ImageError> {
        let body = json!({
            "model": self.model,
            "prompt": prompt,
            "n": 1,
            "size": "1024x1024",
            "response_format": "b64_json",
        });
        let response = post_generation(
            &self.client,
            format!("{}/images/generations", self.base_url),
            &self.api_key,
            body,
        )
        .await?;

        let encoded = response
            .data
            .into_iter()
            .next()
            .and_then(|image| image.b64_json)
            .ok_or(ImageError::EmptyResponse)?;
        Ok(base64::engine::general_purpose::STANDARD.decode(encoded)?)
    }
}

/// Recraft returns a hosted URL, which is downloaded immediately.
pub struct RecraftImageGenerator {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl RecraftImageGenerator {
    pub fn new(client: Client, api_key: String, model: String, base_url: &str) -> Self {
        Self {
            client,
            api_key,
            model,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ImageGenerator for RecraftImageGenerator {
    async fn generate(&self, prompt: &str) -> Result<Vec<u8>, ImageError> {
        let body = json!({
            "prompt": prompt,
            "style": "digital_illustration",
            "substyle": "neon_calm",
            "model": self.model,
        });
        let response = post_generation(
            &self.client,
            format!("{}/images/generations", self.base_url),
            &self.api_key,
            body,
        )
        .await?;

        let url = response
            .data
            .into_iter()
            .next()
            .and_then(|image| image.url)
            .ok_or(ImageError::EmptyResponse)?;

        let download = self.client.get(&url).send().await?;
        let status = download.status();
        if !status.is_success() {
            return Err(ImageError::Upstream {
                status: status.as_u16(),
                body: format!("failed to download {}", url),
            });
        }
        Ok(download.bytes().await?.to_vec())
    }
}

/// Picks the generator named by `IMAGE_GENERATION_SERVICE`, checking its credentials.
pub fn generator_from_config(
    config: &ImageConfig,
    client: Client,
) -> Result<Box<dyn ImageGenerator>, ConfigError> {
    let raw = config
        .service
        .as_deref()
        .ok_or(ConfigError::Missing("IMAGE_GENERATION_SERVICE"))?;
    let kind =
        ImageServiceKind::parse(raw).ok_or_else(|| ConfigError::UnknownImageService(raw.to_string()))?;

    match kind {
        ImageServiceKind::OpenAi => {
            let api_key = config
                .openai_api_key
                .clone()
                .ok_or(ConfigError::Missing("OPENAI_API_KEY"))?;
            let model = config
                .openai_image_model
                .clone()
                .ok_or(ConfigError::Missing("OPENAI_IMAGE_MODEL"))?;
            Ok(Box::new(OpenAiImageGenerator::new(client, api_key, model, &config.openai_base_url)))
        }
        ImageServiceKind::Recraft => {
            let api_key = config
                .recraft_api_key
                .clone()
                .ok_or(ConfigError::Missing("RECRAFT_API_KEY"))?;
            let model = config
                .recraft_image_model
                .clone()
                .ok_or(ConfigError::Missing("RECRAFT_IMAGE_MODEL"))?;
            Ok(Box::new(RecraftImageGenerator::new(client, api_key, model, &config.recraft_base_url)))
        }
    }
}

pub struct ImageService {
    client: Client,
    config: ImageConfig,
    storage: Arc<dyn Storage>,
    chat: Arc<dyn ChatClient>,
    prompts: Arc<dyn PromptSource>,
    idea_model: Option<String>,
}

impl ImageService {
    pub fn new(
        config: ImageConfig,
        storage: Arc<dyn Storage>,
        chat: Arc<dyn ChatClient>,
        prompts: Arc<dyn PromptSource>,
        idea_model: Option<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            config,
            storage,
            chat,
            prompts,
            idea_model,
        }
    }

    /// Fails with a configuration error when no usable generator is configured.
    pub fn check_generator(&self) -> Result<(), ConfigError> {
        generator_from_config(&self.config, self.client.clone()).map(|_| ())
    }

    /// Generates an image, stores it as `<unix-ms>.png` and returns its URL.
    pub async fn generate(&self, prompt: &str) -> Result<String, ImageError> {
        let generator = generator_from_config(&self.config, self.client.clone())?;
        let bytes = generator.generate(prompt).await?;

        let id = Utc::now().timestamp_millis().to_string();
        let saved = self
            .storage
            .save_image(NewImage {
                id,
                bytes,
                content_type: Some("image/png".to_string()),
                extension: Some("png".to_string()),
            })
            .await?;
        info!("Stored generated image {}", saved.id);

        Ok(self.storage.get_image_url(&saved.id).await?)
    }

    /// Asks the model for an image prompt that fits the entry.
    pub async fn generate_prompt_idea(&self, entry: &str) -> Result<String, ImageError> {
        let model = self
            .idea_model
            .as_deref()
            .ok_or(ConfigError::Missing("IMAGE_IDEA_MODEL"))?;
        let template = self.prompts.get(PromptId::ImagePromptIdea).await?;
        let prompt = template.compile(&[("entry", entry)]);
        let idea = self.chat.complete(model, &prompt).await?;
        Ok(idea.trim().to_string())
    }
}
