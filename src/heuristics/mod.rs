//! Deterministic fallbacks for every orchestrated operation.
//!
//! These never touch the network or storage and never fail; the
//! orchestrator uses them whenever the model path is unavailable or
//! returns something unusable. Their output has the same shape as the
//! model path's.

pub mod image;
pub mod pronunciation;
pub mod vocabulary;

/// Lowercase whitespace tokens with surrounding punctuation removed.
///
/// Empty tokens (e.g. a lone "—") are dropped.
pub(crate) fn tokenize(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(|token| {
            token
                .trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase()
        })
        .filter(|token| !token.is_empty())
        .collect()
}
