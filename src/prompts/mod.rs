//! Prompt templates and the catalog of prompts the service uses.
//!
//! Templates use `{{variable}}` placeholders. The same catalog backs both
//! template files on disk and prompts managed in Langfuse.

pub mod langfuse;
pub mod source;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{QuestionCategory, WildcardCategory};

pub use langfuse::LangfuseClient;
pub use source::{source_from_config, CachedPromptSource, FilePromptSource, PromptSource};

#[derive(Debug, Error)]
pub enum PromptError {
    #[error("Prompt not found: {0}")]
    NotFound(String),

    #[error("{0} must be set to use Langfuse prompts")]
    NotConfigured(&'static str),

    #[error("Failed to read prompt {name}: {source}")]
    Io {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Langfuse returned {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("Prompt {0} is not a text prompt")]
    NotText(String),
}

/// Logical prompts known to the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptId {
    BridgeToImage,
    ImagePromptIdea,
    Question1Categorization,
    Question1Generation,
    Question1Category(QuestionCategory),
    Question2Main,
    Question3Main,
    Question2Wildcard(WildcardCategory),
    Question3Wildcard(WildcardCategory),
}

impl PromptId {
    /// Every prompt, in upload order.
    pub fn catalog() -> Vec<PromptId> {
        let mut all = vec![
            PromptId::BridgeToImage,
            PromptId::ImagePromptIdea,
            PromptId::Question1Categorization,
            PromptId::Question1Generation,
        ];
        all.extend(QuestionCategory::ALL.into_iter().map(PromptId::Question1Category));
        all.push(PromptId::Question2Main);
        all.extend(WildcardCategory::ALL.into_iter().map(PromptId::Question2Wildcard));
        all.push(PromptId::Question3Main);
        all.extend(WildcardCategory::ALL.into_iter().map(PromptId::Question3Wildcard));
        all
    }

    /// Name in Langfuse; slashes group prompts into folders.
    pub fn name(&self) -> String {
        match self {
            PromptId::BridgeToImage => "bridge-to-image/message".into(),
            PromptId::ImagePromptIdea => "image/prompt-idea".into(),
            PromptId::Question1Categorization => "question-1/categorization".into(),
            PromptId::Question1Generation => "question-1/question-generation".into(),
            PromptId::Question1Category(c) => format!("question-1/category-{}", c.slug()),
            PromptId::Question2Main => "question-2/main".into(),
            PromptId::Question3Main => "question-3/main".into(),
            PromptId::Question2Wildcard(c) => format!("question-2/wildcard-{}", c.as_str().replace('_', "-")),
            PromptId::Question3Wildcard(c) => format!("question-3/wildcard-{}", c.as_str().replace('_', "-")),
        }
    }

    /// Template file name inside the prompts directory. Both follow-up
    /// questions share the wildcard description files.
    pub fn file_name(&self) -> String {
        match self {
            PromptId::BridgeToImage => "bridge-to-image-prompt.txt".into(),
            PromptId::ImagePromptIdea => "image-prompt.txt".into(),
            PromptId::Question1Categorization => "question-1-categorization.txt".into(),
            PromptId::Question1Generation => "question-1-question-prompt.txt".into(),
            PromptId::Question1Category(c) => format!("question-1-category-description-{}.txt", c.slug()),
            PromptId::Question2Main => "question-2-prompt.txt".into(),
            PromptId::Question3Main => "question-3-prompt.txt".into(),
            PromptId::Question2Wildcard(c) | PromptId::Question3Wildcard(c) => {
                format!("wildcard-category-description-{}.txt", c.as_str())
            }
        }
    }

    pub fn description(&self) -> String {
        match self {
            PromptId::BridgeToImage => {
                "Creates a warm transition message from journaling to image generation".into()
            }
            PromptId::ImagePromptIdea => {
                "Generates a poetic, metaphorical image prompt based on the journal entry".into()
            }
            PromptId::Question1Categorization => {
                "Analyzes journal entry and categorizes it into REFRAMER, CHALLENGER, META REFLECTOR, or DEEPENER".into()
            }
            PromptId::Question1Generation => {
                "Generates the actual follow-up question based on the category".into()
            }
            PromptId::Question1Category(c) => format!("Guidelines for {} category questions", c.as_str()),
            PromptId::Question2Main => "Generates question 2 with wildcard category focus".into(),
            PromptId::Question3Main => "Generates question 3 with wildcard category focus".into(),
            PromptId::Question2Wildcard(c) | PromptId::Question3Wildcard(c) => {
                format!("Wildcard category: {}", c.label())
            }
        }
    }

    pub fn tags(&self) -> Vec<String> {
        match self {
            PromptId::BridgeToImage => vec!["bridge".into(), "image".into()],
            PromptId::ImagePromptIdea => vec!["image".into(), "prompt-generation".into()],
            PromptId::Question1Categorization => vec!["question-1".into(), "categorization".into()],
            PromptId::Question1Generation => vec!["question-1".into(), "generation".into()],
            PromptId::Question1Category(c) => vec![
                "question-1".into(),
                "category".into(),
                c.slug().to_lowercase(),
            ],
            PromptId::Question2Main => vec!["question-2".into(), "wildcard".into()],
            PromptId::Question3Main => vec!["question-3".into(), "wildcard".into()],
            PromptId::Question2Wildcard(c) => vec![
                "question-2".into(),
                "wildcard".into(),
                wildcard_tag(*c).into(),
            ],
            PromptId::Question3Wildcard(c) => vec![
                "question-3".into(),
                "wildcard".into(),
                wildcard_tag(*c).into(),
            ],
        }
    }
}

fn wildcard_tag(category: WildcardCategory) -> &'static str {
    match category {
        WildcardCategory::SensesEmbodiment => "senses",
        WildcardCategory::PeopleRelationships => "relationships",
        WildcardCategory::EnvironmentPlaces => "environment",
        WildcardCategory::MicromomentsJoys => "micromoments",
        WildcardCategory::LearningGrowth => "learning",
        WildcardCategory::GratitudeHighlights => "gratitude",
        WildcardCategory::ImaginationMetaphor => "imagination",
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptTemplate {
    pub name: String,
    pub text: String,
    pub version: Option<u32>,
}

impl PromptTemplate {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
            version: None,
        }
    }

    /// Replaces every `{{ name }}` with its value. Placeholders without a
    /// value are left as written; substituted text is not rescanned.
    pub fn compile(&self, variables: &[(&str, &str)]) -> String {
        let mut out = String::with_capacity(self.text.len());
        let mut rest = self.text.as_str();

        while let Some(open) = rest.find("{{") {
            out.push_str(&rest[..open]);
            let after_open = &rest[open + 2..];
            let Some(close) = after_open.find("}}") else {
                out.push_str(&rest[open..]);
                return out;
            };

            let key = after_open[..close].trim();
            match variables.iter().find(|(k, _)| *k == key) {
                Some((_, value)) => out.push_str(value),
                None => out.push_str(&rest[open..open + 2 + close + 2]),
            }
            rest = &after_open[close + 2..];
        }

        out.push_str(rest);
        out
    }
}
