//! Per-call completion options

use std::time::Duration;

use crate::gateway::RetryPolicy;

/// Options for a single chat-completion call.
///
/// Each orchestrated operation builds its own options, so timeout and retry
/// behaviour are chosen per call site rather than globally.
#[derive(Debug, Clone)]
pub struct CompletionOptions {
    /// Call-site label for logs and metrics (e.g. "pronunciation").
    pub operation: &'static str,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Hard wall-clock limit for one attempt.
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl CompletionOptions {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            operation: "completion",
            model: model.into(),
            max_tokens: 500,
            temperature: 0.3,
            timeout: Duration::from_secs(10),
            retry: RetryPolicy::default(),
        }
    }

    pub fn operation(mut self, operation: &'static str) -> Self {
        self.operation = operation;
        self
    }

    pub fn max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = max;
        self
    }

    pub fn temperature(mut self, temp: f32) -> Self {
        self.temperature = temp;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}
