//! Chat-completion gateway: the trait, the OpenAI-compatible client, and
//! the resilience layer every call goes through.
//!
//! ```text
//!   Orchestrator
//!        │  complete(messages, options)
//!        ▼
//!   RetryingGateway ── options.retry (attempts, linear backoff)
//!        │
//!        ▼
//!   OpenAiGateway ──── options.timeout (per attempt)
//!        │  POST {base_url}/chat/completions
//!        ▼
//!   provider
//! ```
//!
//! Availability is decided once per request context ([`AiAvailability`]),
//! before any of this is reached.

pub mod availability;
pub mod config;
pub mod openai;
pub mod retry;

use async_trait::async_trait;

use crate::error::GatewayError;
use crate::types::{ChatMessage, CompletionOptions, RawCompletion};

pub use availability::{AiAvailability, UnavailableReason};
pub use config::AiConfig;
pub use openai::OpenAiGateway;
pub use retry::{RetryPolicy, RetryingGateway, with_retry};

/// A chat-completion endpoint.
///
/// Implementations issue exactly one request per call; retries are layered
/// on top by [`RetryingGateway`].
#[async_trait]
pub trait CompletionGateway: Send + Sync {
    /// Gateway name for logging/debugging.
    fn name(&self) -> &str;

    /// Send `messages` and return the first choice's content.
    async fn complete(
        &self,
        messages: &[ChatMessage],
        options: &CompletionOptions,
    ) -> Result<RawCompletion, GatewayError>;
}
