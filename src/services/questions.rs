use std::sync::Arc;

use rand::seq::IndexedRandom;
use tracing::{info, instrument};

use crate::llm::{ChatClient, LlmError};
use crate::prompts::{PromptError, PromptId, PromptSource};
use crate::types::{QuestionCategory, WildcardCategory};

#[derive(Debug, thiserror::Error)]
pub enum QuestionError {
    #[error("Unknown wildcard category: {0}")]
    UnknownWildcard(String),
    #[error("Prompt error: {0}")]
    Prompt(#[from] PromptError),
    #[error("Model error: {0}")]
    Llm(#[from] LlmError),
    #[error("Model answered with an unknown category: {0}")]
    UnknownCategory(String),
}

/// Which wildcard-driven follow-up to ask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowUp {
    Second,
    Third,
}

impl FollowUp {
    fn main_prompt(self) -> PromptId {
        match self {
            FollowUp::Second => PromptId::Question2Main,
            FollowUp::Third => PromptId::Question3Main,
        }
    }

    fn wildcard_prompt(self, category: WildcardCategory) -> PromptId {
        match self {
            FollowUp::Second => PromptId::Question2Wildcard(category),
            FollowUp::Third => PromptId::Question3Wildcard(category),
        }
    }
}

pub struct QuestionService {
    chat: Arc<dyn ChatClient>,
    prompts: Arc<dyn PromptSource>,
    model: String,
}

impl QuestionService {
    pub fn new(chat: Arc<dyn ChatClient>, prompts: Arc<dyn PromptSource>, model: impl Into<String>) -> Self {
        Self {
            chat,
            prompts,
            model: model.into(),
        }
    }

    async fn ask(&self, id: PromptId, variables: &[(&str, &str)]) -> Result<String, QuestionError> {
        let template = self.prompts.get(id).await?;
        let prompt = template.compile(variables);
        let reply = self.chat.complete(&self.model, &prompt).await?;
        Ok(reply.trim().to_string())
    }

    /// Categorises the entry, then asks a question in that category's style.
    #[instrument(skip_all)]
    pub async fn question_1(&self, entry: &str) -> Result<String, QuestionError> {
        let reply = self
            .ask(PromptId::Question1Categorization, &[("entry", entry)])
            .await?;
        let category =
            QuestionCategory::parse_reply(&reply).ok_or(QuestionError::UnknownCategory(reply))?;
        info!("Question 1 category: {}", category);

        let guidelines = self.prompts.get(PromptId::Question1Category(category)).await?;
        self.ask(
            PromptId::Question1Generation,
            &[
                ("category", category.as_str()),
                ("entry", entry),
                ("category_guidelines", guidelines.text.trim()),
            ],
        )
        .await
    }

    /// Question 2 or 3, steered by a wildcard category.
    #[instrument(skip(self, entry, session), fields(session = session.unwrap_or("-")))]
    pub async fn follow_up(
        &self,
        which: FollowUp,
        entry: &str,
        category: &str,
        session: Option<&str>,
    ) -> Result<String, QuestionError> {
        let category: WildcardCategory = category
            .parse()
            .map_err(QuestionError::UnknownWildcard)?;
        let description = self.prompts.get(which.wildcard_prompt(category)).await?;

        self.ask(
            which.main_prompt(),
            &[
                ("wildcard_category", category.as_str()),
                ("entry", entry),
                ("wildcard_category_description", description.text.trim()),
            ],
        )
        .await
    }

    pub async fn bridge_to_image(&self, conversation: &str) -> Result<String, QuestionError> {
        self.ask(PromptId::BridgeToImage, &[("conversation", conversation)])
            .await
    }
}

/// Two distinct wildcard categories, chosen uniformly.
pub fn random_two() -> Vec<WildcardCategory> {
    let mut rng = rand::rng();
    WildcardCategory::ALL
        .choose_multiple(&mut rng, 2)
        .copied()
        .collect()
}
