//! Stored book, page and vocabulary records

use serde::{Deserialize, Serialize};

use super::vocabulary::DifficultyLevel;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub id: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub id: String,
    pub book_id: String,
    pub page_number: i64,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl Page {
    /// Whether the page already carries a non-blank description.
    pub fn has_description(&self) -> bool {
        self.description
            .as_deref()
            .is_some_and(|d| !d.trim().is_empty())
    }
}

/// A persisted vocabulary word, shared across the books it appears in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VocabularyEntry {
    pub id: String,
    pub word: String,
    pub definition: String,
    pub difficulty_level: DifficultyLevel,
    pub part_of_speech: String,
    pub example_sentence: String,
    #[serde(default)]
    pub book_ids: Vec<String>,
}
