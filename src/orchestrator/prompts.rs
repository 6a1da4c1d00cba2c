//! Prompt text for each orchestrated operation.

use crate::types::{DifficultyLevel, EvaluationRequest, ImageContext};

pub const PRONUNCIATION_SYSTEM: &str = "You are a friendly English reading tutor for children. \
Compare what the child said with the text they were asked to read. \
Respond with only a JSON object with integer fields pronunciationScore, fluencyScore and \
accuracyScore (each 0-100) and a field suggestions: an array of short, encouraging tips.";

pub const VOCABULARY_SYSTEM: &str = "You pick vocabulary words for children learning English. \
Respond with only a JSON array. Each element has the fields word, definition, partOfSpeech \
and exampleSentence. Definitions and examples must be simple enough for a young reader.";

pub const IMAGE_SYSTEM: &str = "You describe picture-book illustrations for children learning \
English. Respond with only a JSON object with a field description (two or three simple \
sentences) and a field vocabulary: an array of up to five objects with the fields word, \
definition, partOfSpeech and exampleSentence.";

pub fn pronunciation_user(request: &EvaluationRequest) -> String {
    format!(
        "Target text: \"{}\"\nChild said: \"{}\"\nSpeech recognizer confidence: {:.2}",
        request.target_text, request.transcript, request.confidence
    )
}

pub fn vocabulary_user(description: &str, level: DifficultyLevel, max_words: usize) -> String {
    format!(
        "Choose at most {max_words} {level} words from this page description:\n{description}"
    )
}

pub fn image_user(context: ImageContext) -> String {
    let focus = match context {
        ImageContext::Cover => "This is the book cover. Mention the title and main characters.",
        ImageContext::Story => "This is a story page. Describe what is happening in the scene.",
        ImageContext::Educational => {
            "This is an educational page. Explain what the picture teaches."
        }
        ImageContext::Default => "Describe what you see in the picture.",
    };
    format!("{focus} Use words a young reader can learn from.")
}
