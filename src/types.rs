/// Shared types used across the codebase

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Topic tags used to steer questions two and three.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WildcardCategory {
    SensesEmbodiment,
    PeopleRelationships,
    EnvironmentPlaces,
    MicromomentsJoys,
    LearningGrowth,
    GratitudeHighlights,
    ImaginationMetaphor,
}

impl WildcardCategory {
    pub const ALL: [WildcardCategory; 7] = [
        WildcardCategory::SensesEmbodiment,
        WildcardCategory::PeopleRelationships,
        WildcardCategory::EnvironmentPlaces,
        WildcardCategory::MicromomentsJoys,
        WildcardCategory::LearningGrowth,
        WildcardCategory::GratitudeHighlights,
        WildcardCategory::ImaginationMetaphor,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WildcardCategory::SensesEmbodiment => "SENSES_EMBODIMENT",
            WildcardCategory::PeopleRelationships => "PEOPLE_RELATIONSHIPS",
            WildcardCategory::EnvironmentPlaces => "ENVIRONMENT_PLACES",
            WildcardCategory::MicromomentsJoys => "MICROMOMENTS_JOYS",
            WildcardCategory::LearningGrowth => "LEARNING_GROWTH",
            WildcardCategory::GratitudeHighlights => "GRATITUDE_HIGHLIGHTS",
            WildcardCategory::ImaginationMetaphor => "IMAGINATION_METAPHOR",
        }
    }

    /// Human label, e.g. "Senses & Embodiment"
    pub fn label(&self) -> &'static str {
        match self {
            WildcardCategory::SensesEmbodiment => "Senses & Embodiment",
            WildcardCategory::PeopleRelationships => "People & Relationships",
            WildcardCategory::EnvironmentPlaces => "Environment & Places",
            WildcardCategory::MicromomentsJoys => "Micromoments & Joys",
            WildcardCategory::LearningGrowth => "Learning & Growth",
            WildcardCategory::GratitudeHighlights => "Gratitude & Highlights",
            WildcardCategory::ImaginationMetaphor => "Imagination & Metaphor",
        }
    }
}

impl fmt::Display for WildcardCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WildcardCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        WildcardCategory::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| s.to_string())
    }
}

/// The stance the model picks before writing the first follow-up question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuestionCategory {
    Reframer,
    Challenger,
    MetaReflector,
    Deepener,
}

impl QuestionCategory {
    pub const ALL: [QuestionCategory; 4] = [
        QuestionCategory::Challenger,
        QuestionCategory::Deepener,
        QuestionCategory::MetaReflector,
        QuestionCategory::Reframer,
    ];

    /// Name as the model writes it.
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionCategory::Reframer => "REFRAMER",
            QuestionCategory::Challenger => "CHALLENGER",
            QuestionCategory::MetaReflector => "META REFLECTOR",
            QuestionCategory::Deepener => "DEEPENER",
        }
    }

    /// Name usable in prompt identifiers and file names.
    pub fn slug(&self) -> &'static str {
        match self {
            QuestionCategory::Reframer => "REFRAMER",
            QuestionCategory::Challenger => "CHALLENGER",
            QuestionCategory::MetaReflector => "META-REFLECTOR",
            QuestionCategory::Deepener => "DEEPENER",
        }
    }

    /// Parses a model reply, tolerating case, quotes, trailing punctuation
    /// and `_`/`-` in place of the space.
    pub fn parse_reply(reply: &str) -> Option<Self> {
        let normalized: String = reply
            .trim()
            .trim_matches(|c: char| !c.is_ascii_alphanumeric())
            .chars()
            .map(|c| if c == '_' || c == '-' { ' ' } else { c.to_ascii_uppercase() })
            .collect();
        let normalized = normalized.split_whitespace().collect::<Vec<_>>().join(" ");

        QuestionCategory::ALL
            .into_iter()
            .find(|c| c.as_str() == normalized)
    }
}

impl fmt::Display for QuestionCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wildcards_serialize_as_screaming_snake() {
        let json = serde_json::to_string(&WildcardCategory::MicromomentsJoys).unwrap();
        assert_eq!(json, "\"MICROMOMENTS_JOYS\"");
        for c in WildcardCategory::ALL {
            assert_eq!(serde_json::to_value(c).unwrap(), c.as_str());
            assert_eq!(c.as_str().parse::<WildcardCategory>(), Ok(c));
        }
    }

    #[test]
    fn test_unknown_wildcard_rejected() {
        assert_eq!("SPORTS".parse::<WildcardCategory>(), Err("SPORTS".to_string()));
        assert!("senses_embodiment".parse::<WildcardCategory>().is_err());
    }

    #[test]
    fn test_question_category_reply_parsing() {
        assert_eq!(QuestionCategory::parse_reply("DEEPENER"), Some(QuestionCategory::Deepener));
        assert_eq!(QuestionCategory::parse_reply("  reframer.\n"), Some(QuestionCategory::Reframer));
        assert_eq!(QuestionCategory::parse_reply("META_REFLECTOR"), Some(QuestionCategory::MetaReflector));
        assert_eq!(QuestionCategory::parse_reply("\"Meta Reflector\""), Some(QuestionCategory::MetaReflector));
        assert_eq!(QuestionCategory::parse_reply("**CHALLENGER**"), Some(QuestionCategory::Challenger));
        assert_eq!(QuestionCategory::parse_reply("The category is DEEPENER"), None);
    }
}
