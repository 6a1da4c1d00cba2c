//! Rule-based pronunciation scoring.

use super::tokenize;
use crate::types::{EvaluationRequest, EvaluationResult, clamp_score};

const ACCURACY_THRESHOLD: u8 = 80;
const PRONUNCIATION_THRESHOLD: u8 = 70;
const FLUENCY_THRESHOLD: u8 = 70;
const FLUENCY_PENALTY_PER_WORD: usize = 10;

pub const ACCURACY_TIP: &str =
    "Try to read each word exactly as it is written. Go slowly and point to each word.";
pub const PRONUNCIATION_TIP: &str =
    "Practice saying each sound clearly. Listen to the word and say it again.";
pub const FLUENCY_TIP: &str = "Try to read smoothly, without skipping or adding words.";
pub const PRAISE: &str = "Great job! Your reading was clear and accurate. Keep it up!";

/// Score a reading attempt without a model.
///
/// - accuracy: share of target positions whose spoken token is identical at
///   the same index (no alignment)
/// - pronunciation: recognizer confidence as a percentage
/// - fluency: 100 minus 10 per word of length difference, floored at 0
pub fn evaluate(request: &EvaluationRequest) -> EvaluationResult {
    let target = tokenize(&request.target_text);
    let spoken = tokenize(&request.transcript);

    let accuracy = if target.is_empty() {
        0
    } else {
        let matched = target
            .iter()
            .zip(spoken.iter())
            .filter(|(t, s)| t == s)
            .count();
        clamp_score(matched as f64 / target.len() as f64 * 100.0)
    };

    let pronunciation = clamp_score(f64::from(request.confidence) * 100.0);

    let penalty = spoken.len().abs_diff(target.len()) * FLUENCY_PENALTY_PER_WORD;
    let fluency = 100usize.saturating_sub(penalty) as u8;

    EvaluationResult {
        pronunciation_score: pronunciation,
        fluency_score: fluency,
        accuracy_score: accuracy,
        suggestions: suggestions(accuracy, pronunciation, fluency),
    }
}

fn suggestions(accuracy: u8, pronunciation: u8, fluency: u8) -> Vec<String> {
    let mut tips = Vec::new();
    if accuracy < ACCURACY_THRESHOLD {
        tips.push(ACCURACY_TIP.to_string());
    }
    if pronunciation < PRONUNCIATION_THRESHOLD {
        tips.push(PRONUNCIATION_TIP.to_string());
    }
    if fluency < FLUENCY_THRESHOLD {
        tips.push(FLUENCY_TIP.to_string());
    }
    if tips.is_empty() {
        tips.push(PRAISE.to_string());
    }
    tips
}
