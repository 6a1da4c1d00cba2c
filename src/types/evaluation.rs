//! Pronunciation evaluation types

use serde::{Deserialize, Serialize};

/// Recognizer confidence used when the client does not send one.
pub const DEFAULT_CONFIDENCE: f32 = 0.8;

/// A child's spoken attempt at reading `target_text`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationRequest {
    pub transcript: String,
    pub target_text: String,
    /// Speech recognizer confidence in `[0, 1]`.
    pub confidence: f32,
}

impl EvaluationRequest {
    /// Build a request, defaulting and clamping `confidence`.
    pub fn new(
        transcript: impl Into<String>,
        target_text: impl Into<String>,
        confidence: Option<f32>,
    ) -> Self {
        let confidence = match confidence {
            Some(c) if c.is_finite() => c.clamp(0.0, 1.0),
            _ => DEFAULT_CONFIDENCE,
        };
        Self {
            transcript: transcript.into(),
            target_text: target_text.into(),
            confidence,
        }
    }
}

/// Scores in `[0, 100]` plus feedback for the reader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationResult {
    pub pronunciation_score: u8,
    pub fluency_score: u8,
    pub accuracy_score: u8,
    pub suggestions: Vec<String>,
}

/// Round and clamp an arbitrary number into a `[0, 100]` score.
///
/// Non-finite input maps to 0.
pub fn clamp_score(value: f64) -> u8 {
    if !value.is_finite() {
        return 0;
    }
    value.round().clamp(0.0, 100.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confidence_defaults_and_clamps() {
        assert_eq!(EvaluationRequest::new("a", "a", None).confidence, 0.8);
        assert_eq!(EvaluationRequest::new("a", "a", Some(1.7)).confidence, 1.0);
        assert_eq!(EvaluationRequest::new("a", "a", Some(-0.2)).confidence, 0.0);
        assert_eq!(
            EvaluationRequest::new("a", "a", Some(f32::NAN)).confidence,
            DEFAULT_CONFIDENCE
        );
    }

    #[test]
    fn clamp_score_bounds() {
        assert_eq!(clamp_score(-12.0), 0);
        assert_eq!(clamp_score(87.6), 88);
        assert_eq!(clamp_score(250.0), 100);
        assert_eq!(clamp_score(f64::NAN), 0);
    }
}
