//! Vocabulary types

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Default number of words returned by an extraction.
pub const DEFAULT_MAX_WORDS: usize = 10;

/// Hard cap on `max_words`, whatever the client asks for.
pub const MAX_WORDS_LIMIT: usize = 20;

/// Reading level a word is pitched at.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DifficultyLevel {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
}

impl DifficultyLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            DifficultyLevel::Beginner => "beginner",
            DifficultyLevel::Intermediate => "intermediate",
            DifficultyLevel::Advanced => "advanced",
        }
    }
}

impl fmt::Display for DifficultyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DifficultyLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "beginner" => Ok(DifficultyLevel::Beginner),
            "intermediate" => Ok(DifficultyLevel::Intermediate),
            "advanced" => Ok(DifficultyLevel::Advanced),
            other => Err(format!("unknown difficulty level '{other}'")),
        }
    }
}

/// A word worth teaching, with kid-friendly explanation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VocabularyItem {
    /// Lowercase canonical form; the dedup key against stored vocabulary.
    pub word: String,
    pub definition: String,
    pub difficulty_level: DifficultyLevel,
    pub part_of_speech: String,
    pub example_sentence: String,
}

/// Input to vocabulary extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VocabularyRequest {
    pub description: String,
    pub difficulty_level: DifficultyLevel,
    pub max_words: usize,
}

impl VocabularyRequest {
    /// Build a request; `max_words` defaults to 10 and is capped at 20.
    pub fn new(
        description: impl Into<String>,
        difficulty_level: DifficultyLevel,
        max_words: Option<usize>,
    ) -> Self {
        Self {
            description: description.into(),
            difficulty_level,
            max_words: max_words.unwrap_or(DEFAULT_MAX_WORDS).min(MAX_WORDS_LIMIT),
        }
    }
}
