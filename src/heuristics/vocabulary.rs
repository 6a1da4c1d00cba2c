//! Vocabulary extraction by token filtering.

use crate::types::{DifficultyLevel, VocabularyItem, VocabularyRequest};

/// Exclusive length bounds for candidate words.
const MIN_LEN_EXCLUSIVE: usize = 3;
const MAX_LEN_EXCLUSIVE: usize = 12;

/// Function words and description boilerplate that pass the length filter
/// but are useless to teach.
const STOPWORDS: &[&str] = &[
    "about", "above", "after", "again", "also", "because", "been", "before", "being", "below",
    "between", "both", "could", "does", "doing", "down", "during", "each", "from", "further",
    "have", "having", "here", "into", "just", "like", "more", "most", "once", "only", "other",
    "over", "same", "should", "some", "such", "than", "that", "their", "them", "then", "there",
    "these", "they", "this", "those", "through", "under", "until", "very", "were", "what",
    "when", "where", "which", "while", "with", "would", "your", "image", "picture", "shows",
    "showing",
];

/// Pick up to `max_words` teachable words from a description.
///
/// Lowercases, drops every character that is neither a word character nor
/// whitespace, keeps tokens strictly longer than 3 and shorter than 12
/// characters that are not stopwords, and dedupes in first-seen order.
/// Definitions and examples are templated, not looked up.
pub fn extract(request: &VocabularyRequest) -> Vec<VocabularyItem> {
    candidate_words(&request.description)
        .into_iter()
        .take(request.max_words)
        .map(|word| synthesize(word, request.difficulty_level))
        .collect()
}

/// The filtered, deduplicated word list before truncation.
pub fn candidate_words(description: &str) -> Vec<String> {
    let cleaned: String = description
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || c.is_whitespace())
        .collect();

    let mut words: Vec<String> = Vec::new();
    for token in cleaned.split_whitespace() {
        let len = token.chars().count();
        if len <= MIN_LEN_EXCLUSIVE || len >= MAX_LEN_EXCLUSIVE {
            continue;
        }
        if STOPWORDS.contains(&token) || words.iter().any(|w| w == token) {
            continue;
        }
        words.push(token.to_string());
    }
    words
}

fn synthesize(word: String, level: DifficultyLevel) -> VocabularyItem {
    VocabularyItem {
        definition: format!("\"{word}\" is a {level} word that helps describe this page."),
        example_sentence: format!("Can you find the {word} in the picture?"),
        part_of_speech: guess_part_of_speech(&word).to_string(),
        difficulty_level: level,
        word,
    }
}

/// Suffix rule of thumb; good enough for a label shown to children.
fn guess_part_of_speech(word: &str) -> &'static str {
    if word.ends_with("ly") {
        "adverb"
    } else if word.ends_with("ing") || word.ends_with("ed") {
        "verb"
    } else if ["ful", "ous", "ive", "able"].iter().any(|s| word.ends_with(s)) {
        "adjective"
    } else {
        "noun"
    }
}
