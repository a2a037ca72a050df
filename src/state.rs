use std::sync::Arc;

use crate::config::AppConfig;
use crate::llm::{ChatClient, OpenRouterClient};
use crate::prompts::{source_from_config, PromptError, PromptSource};
use crate::services::{ImageService, QuestionService};
use crate::storage::{self, Storage, StorageError};

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("Storage initialization failed: {0}")]
    Storage(#[from] StorageError),
    #[error("Prompt source initialization failed: {0}")]
    Prompts(#[from] PromptError),
}

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub storage: Arc<dyn Storage>,
    pub questions: Arc<QuestionService>,
    pub images: Arc<ImageService>,
}

impl AppState {
    /// Wires the real providers from configuration.
    pub fn from_config(config: AppConfig) -> Result<Self, StartupError> {
        let storage = storage::from_config(&config.storage)?;
        let prompts = source_from_config(&config.prompts)?;
        let chat: Arc<dyn ChatClient> = Arc::new(OpenRouterClient::from_config(&config.llm));
        Ok(Self::with_providers(config, storage, chat, prompts))
    }

    pub fn with_providers(
        config: AppConfig,
        storage: Arc<dyn Storage>,
        chat: Arc<dyn ChatClient>,
        prompts: Arc<dyn PromptSource>,
    ) -> Self {
        let questions = QuestionService::new(chat.clone(), prompts.clone(), config.llm.question_model.clone());
        let images = ImageService::new(
            config.images.clone(),
            storage.clone(),
            chat,
            prompts,
            config.llm.image_idea_model.clone(),
        );

        Self {
            config: Arc::new(config),
            storage,
            questions: Arc::new(questions),
            images: Arc::new(images),
        }
    }
}
