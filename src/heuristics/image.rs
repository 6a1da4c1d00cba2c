//! Canned image descriptions keyed by page context.

use super::vocabulary;
use crate::types::{DifficultyLevel, ImageAnalysis, ImageContext, VocabularyRequest};

/// Words pulled from a canned description.
const FALLBACK_VOCABULARY_WORDS: usize = 5;

/// The canned sentence for a context.
pub fn describe(context: ImageContext) -> &'static str {
    match context {
        ImageContext::Cover => {
            "This is the cover of the book. It shows the title and the main characters, \
             inviting readers into the story."
        }
        ImageContext::Story => {
            "This page shows a scene from the story. Look closely at the characters \
             and what they are doing."
        }
        ImageContext::Educational => {
            "This page shows an educational illustration that helps explain a new idea \
             with colorful drawings."
        }
        ImageContext::Default => {
            "This is a colorful illustration from the book. Take a close look at \
             everything you can find."
        }
    }
}

/// Full fallback analysis: the canned description plus words taken from it.
pub fn analyze(context: ImageContext) -> ImageAnalysis {
    let description = describe(context).to_string();
    let vocabulary = vocabulary::extract(&VocabularyRequest::new(
        description.clone(),
        DifficultyLevel::Beginner,
        Some(FALLBACK_VOCABULARY_WORDS),
    ));
    ImageAnalysis {
        description,
        vocabulary,
    }
}
