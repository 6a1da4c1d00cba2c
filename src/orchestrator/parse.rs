//! Turning model content into typed results.
//!
//! Models are asked for bare JSON but often wrap it in a Markdown code
//! fence or add a sentence around it. Anything that still does not parse
//! into the expected shape is a `MalformedResponse`.

use serde::Deserialize;

use crate::error::GatewayError;
use crate::types::{
    DifficultyLevel, EvaluationResult, ImageAnalysis, MAX_WORDS_LIMIT, VocabularyItem,
    clamp_score,
};

/// The JSON payload inside `content`, without fences or surrounding prose.
///
/// A fenced block is cut at its closing fence, then narrowed to the span
/// from the first `{`/`[` to the last `}`/`]`.
pub fn json_payload(content: &str) -> &str {
    let mut text = content.trim();
    if let Some(open) = text.find("```") {
        // Skip an optional language tag, which may sit on the same line as the body.
        let body = text[open + 3..].trim_start_matches(|c: char| c.is_ascii_alphanumeric());
        text = body.find("```").map_or(body, |close| &body[..close]).trim();
    }
    let start = text.find(['{', '[']);
    let end = text.rfind(['}', ']']);
    match (start, end) {
        (Some(start), Some(end)) if start < end => &text[start..=end],
        _ => text,
    }
}

fn malformed(what: &str, err: impl std::fmt::Display) -> GatewayError {
    GatewayError::MalformedResponse(format!("{what}: {err}"))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEvaluation {
    pronunciation_score: f64,
    fluency_score: f64,
    accuracy_score: f64,
    #[serde(default)]
    suggestions: Vec<String>,
}

pub fn evaluation(content: &str) -> Result<EvaluationResult, GatewayError> {
    let raw: RawEvaluation = serde_json::from_str(json_payload(content))
        .map_err(|e| malformed("evaluation payload", e))?;
    Ok(EvaluationResult {
        pronunciation_score: clamp_score(raw.pronunciation_score),
        fluency_score: clamp_score(raw.fluency_score),
        accuracy_score: clamp_score(raw.accuracy_score),
        suggestions: raw
            .suggestions
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
    })
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawVocabularyItem {
    word: String,
    #[serde(default)]
    definition: String,
    #[serde(default, alias = "part_of_speech")]
    part_of_speech: String,
    #[serde(default, alias = "example_sentence", alias = "example")]
    example_sentence: String,
    #[serde(default, alias = "difficulty_level")]
    difficulty_level: Option<DifficultyLevel>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawVocabulary {
    List(Vec<RawVocabularyItem>),
    Wrapped {
        #[serde(alias = "words")]
        vocabulary: Vec<RawVocabularyItem>,
    },
}

/// Normalize words to lowercase, drop blanks and duplicates, keep order.
fn normalize_items(
    raw: Vec<RawVocabularyItem>,
    level: DifficultyLevel,
    max_words: usize,
) -> Vec<VocabularyItem> {
    let mut items: Vec<VocabularyItem> = Vec::new();
    for item in raw {
        let word = item.word.trim().to_lowercase();
        if word.is_empty() || items.iter().any(|i| i.word == word) {
            continue;
        }
        items.push(VocabularyItem {
            word,
            definition: item.definition.trim().to_string(),
            difficulty_level: item.difficulty_level.unwrap_or(level),
            part_of_speech: item.part_of_speech.trim().to_lowercase(),
            example_sentence: item.example_sentence.trim().to_string(),
        });
        if items.len() >= max_words {
            break;
        }
    }
    items
}

pub fn vocabulary(
    content: &str,
    level: DifficultyLevel,
    max_words: usize,
) -> Result<Vec<VocabularyItem>, GatewayError> {
    let raw: RawVocabulary = serde_json::from_str(json_payload(content))
        .map_err(|e| malformed("vocabulary payload", e))?;
    let raw = match raw {
        RawVocabulary::List(items) | RawVocabulary::Wrapped { vocabulary: items } => items,
    };
    let items = normalize_items(raw, level, max_words);
    if items.is_empty() && max_words > 0 {
        return Err(malformed("vocabulary payload", "no usable words"));
    }
    Ok(items)
}

#[derive(Deserialize)]
struct RawImageAnalysis {
    description: String,
    #[serde(default)]
    vocabulary: Vec<RawVocabularyItem>,
}

pub fn image_analysis(content: &str) -> Result<ImageAnalysis, GatewayError> {
    let raw: RawImageAnalysis = serde_json::from_str(json_payload(content))
        .map_err(|e| malformed("image payload", e))?;
    let description = raw.description.trim().to_string();
    if description.is_empty() {
        return Err(malformed("image payload", "empty description"));
    }
    Ok(ImageAnalysis {
        description,
        vocabulary: normalize_items(raw.vocabulary, DifficultyLevel::Beginner, MAX_WORDS_LIMIT),
    })
}
