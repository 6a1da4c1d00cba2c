//! The AI-or-heuristic decision for each operation.
//!
//! Every operation follows the same path:
//!
//! ```text
//!   availability check ──unavailable──┐
//!        │                            │
//!        ▼                            │
//!   gateway (retry + timeout)         │
//!        │ ok         │ err           │
//!        ▼            ▼               ▼
//!   parse content ──malformed──► FailurePolicy
//!        │                      ├─ FallbackOnError → heuristic result
//!        ▼                      └─ FailOnError     → Err(GatewayError)
//!   Orchestrated { source: Ai }
//! ```
//!
//! The availability check happens before any I/O, so an unconfigured key
//! never produces a network request.

mod parse;
mod prompts;
pub mod side_effect;

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, instrument, warn};

use crate::error::GatewayError;
use crate::gateway::{AiAvailability, AiConfig, CompletionGateway, RetryPolicy, RetryingGateway};
use crate::heuristics;
use crate::store::{RowStore, library};
use crate::telemetry;
use crate::types::{
    ChatMessage, CompletionOptions, EvaluationRequest, EvaluationResult, ImageAnalysis,
    ImageRequest, VocabularyItem, VocabularyRequest,
};

pub use parse::json_payload;
pub use side_effect::{SideEffect, best_effort};

/// Which path produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultSource {
    Ai,
    Heuristic,
}

/// Why the heuristic path was taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FallbackReason {
    Unconfigured,
    Transport,
    Http,
    Timeout,
    Malformed,
}

impl FallbackReason {
    pub fn from_error(err: &GatewayError) -> Self {
        match err {
            GatewayError::Unconfigured => FallbackReason::Unconfigured,
            GatewayError::Network(_) => FallbackReason::Transport,
            GatewayError::Http { .. } => FallbackReason::Http,
            GatewayError::Timeout(_) => FallbackReason::Timeout,
            GatewayError::MalformedResponse(_) => FallbackReason::Malformed,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FallbackReason::Unconfigured => "unconfigured",
            FallbackReason::Transport => "transport",
            FallbackReason::Http => "http",
            FallbackReason::Timeout => "timeout",
            FallbackReason::Malformed => "malformed",
        }
    }
}

/// What to do when the model path fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Return the heuristic result instead.
    #[default]
    FallbackOnError,
    /// Return the error to the caller.
    FailOnError,
}

/// A result tagged with where it came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Orchestrated<T> {
    pub value: T,
    pub source: ResultSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<FallbackReason>,
}

impl<T> Orchestrated<T> {
    pub fn ai(value: T) -> Self {
        Self {
            value,
            source: ResultSource::Ai,
            fallback_reason: None,
        }
    }

    pub fn heuristic(value: T, reason: FallbackReason) -> Self {
        Self {
            value,
            source: ResultSource::Heuristic,
            fallback_reason: Some(reason),
        }
    }
}

/// Outcome of [`Orchestrator::describe_page`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Described {
    pub analysis: Orchestrated<ImageAnalysis>,
    pub persistence: SideEffect,
}

/// Timeout, retry and sampling settings for one kind of call.
#[derive(Debug, Clone)]
pub struct CallProfile {
    pub timeout: Duration,
    pub retry: RetryPolicy,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl CallProfile {
    pub fn new(timeout: Duration, max_tokens: u32, temperature: f32) -> Self {
        Self {
            timeout,
            retry: RetryPolicy::default(),
            max_tokens,
            temperature,
        }
    }

    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn options(&self, operation: &'static str, model: &str) -> CompletionOptions {
        CompletionOptions::new(model)
            .operation(operation)
            .max_tokens(self.max_tokens)
            .temperature(self.temperature)
            .timeout(self.timeout)
            .retry(self.retry.clone())
    }
}

/// Call profiles for each orchestrated operation.
#[derive(Debug, Clone)]
pub struct CallProfiles {
    pub pronunciation: CallProfile,
    pub vocabulary: CallProfile,
    pub image: CallProfile,
    pub batch_image: CallProfile,
}

impl Default for CallProfiles {
    fn default() -> Self {
        Self {
            pronunciation: CallProfile::new(Duration::from_secs(10), 500, 0.3),
            vocabulary: CallProfile::new(Duration::from_secs(15), 1000, 0.5),
            image: CallProfile::new(Duration::from_secs(30), 800, 0.4),
            batch_image: CallProfile::new(Duration::from_secs(60), 800, 0.4)
                .retry(RetryPolicy::new().max_attempts(2)),
        }
    }
}

impl CallProfiles {
    /// The same retry policy on every profile.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        for profile in [
            &mut self.pronunciation,
            &mut self.vocabulary,
            &mut self.image,
            &mut self.batch_image,
        ] {
            profile.retry = retry.clone();
        }
        self
    }
}

/// Models used for text-only and vision calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSelection {
    pub text: String,
    pub vision: String,
}

/// Decides per call between the model path and the heuristic path.
///
/// Cheap to clone; the gateway is shared.
#[derive(Clone)]
pub struct Orchestrator {
    gateway: Arc<dyn CompletionGateway>,
    availability: AiAvailability,
    models: ModelSelection,
    profiles: CallProfiles,
}

impl Orchestrator {
    /// Wrap `gateway` with retries and fix availability from `config`.
    pub fn new(gateway: Arc<dyn CompletionGateway>, config: &AiConfig) -> Self {
        Self {
            gateway: Arc::new(RetryingGateway::new(gateway)),
            availability: config.availability(),
            models: ModelSelection {
                text: config.text_model.clone(),
                vision: config.vision_model.clone(),
            },
            profiles: CallProfiles::default(),
        }
    }

    pub fn with_profiles(mut self, profiles: CallProfiles) -> Self {
        self.profiles = profiles;
        self
    }

    pub fn availability(&self) -> &AiAvailability {
        &self.availability
    }

    pub fn profiles(&self) -> &CallProfiles {
        &self.profiles
    }

    /// A copy whose image calls use the batch profile.
    pub fn for_batch(&self) -> Self {
        let mut batch = self.clone();
        batch.profiles.image = self.profiles.batch_image.clone();
        batch
    }

    /// Score a read-aloud attempt.
    #[instrument(skip_all, fields(operation = "pronunciation"))]
    pub async fn evaluate_pronunciation(
        &self,
        request: &EvaluationRequest,
    ) -> Orchestrated<EvaluationResult> {
        let messages = [
            ChatMessage::system(prompts::PRONUNCIATION_SYSTEM),
            ChatMessage::user(prompts::pronunciation_user(request)),
        ];
        let options = self
            .profiles
            .pronunciation
            .options("pronunciation", &self.models.text);
        let attempt = self.invoke(&messages, &options, parse::evaluation).await;
        self.fallback(options.operation, attempt, || {
            heuristics::pronunciation::evaluate(request)
        })
    }

    /// Pick teachable words from a page description.
    #[instrument(skip_all, fields(operation = "vocabulary", max_words = request.max_words))]
    pub async fn extract_vocabulary(
        &self,
        request: &VocabularyRequest,
    ) -> Orchestrated<Vec<VocabularyItem>> {
        let messages = [
            ChatMessage::system(prompts::VOCABULARY_SYSTEM),
            ChatMessage::user(prompts::vocabulary_user(
                &request.description,
                request.difficulty_level,
                request.max_words,
            )),
        ];
        let options = self
            .profiles
            .vocabulary
            .options("vocabulary", &self.models.text);
        let attempt = self
            .invoke(&messages, &options, |content| {
                parse::vocabulary(content, request.difficulty_level, request.max_words)
            })
            .await;
        self.fallback(options.operation, attempt, || {
            heuristics::vocabulary::extract(request)
        })
    }

    /// Describe one image.
    #[instrument(skip_all, fields(operation = "image", context = request.context.as_str()))]
    pub async fn analyze_image(
        &self,
        request: &ImageRequest,
        policy: FailurePolicy,
    ) -> Result<Orchestrated<ImageAnalysis>, GatewayError> {
        let messages = [
            ChatMessage::system(prompts::IMAGE_SYSTEM),
            ChatMessage::user_with_image(
                prompts::image_user(request.context),
                request.image_url.clone(),
            ),
        ];
        let options = self.profiles.image.options("image", &self.models.vision);
        let attempt = self
            .invoke(&messages, &options, parse::image_analysis)
            .await;
        match policy {
            FailurePolicy::FallbackOnError => Ok(self.fallback(options.operation, attempt, || {
                heuristics::image::analyze(request.context)
            })),
            FailurePolicy::FailOnError => attempt.map(Orchestrated::ai),
        }
    }

    /// Describe a stored page's image and write the description back.
    ///
    /// The write is best-effort: its failure is reported in
    /// [`Described::persistence`] and never replaces the analysis.
    #[instrument(skip(self, store, request))]
    pub async fn describe_page(
        &self,
        store: &dyn RowStore,
        page_id: &str,
        request: &ImageRequest,
        policy: FailurePolicy,
    ) -> Result<Described, GatewayError> {
        let analysis = self.analyze_image(request, policy).await?;
        let persistence = best_effort(
            "page_description",
            library::update_page_description(store, page_id, &analysis.value.description),
        )
        .await;
        Ok(Described {
            analysis,
            persistence,
        })
    }

    async fn invoke<T>(
        &self,
        messages: &[ChatMessage],
        options: &CompletionOptions,
        parse: impl FnOnce(&str) -> Result<T, GatewayError>,
    ) -> Result<T, GatewayError> {
        if !self.availability.is_available() {
            return Err(GatewayError::Unconfigured);
        }
        let raw = self.gateway.complete(messages, options).await?;
        parse(&raw.content)
    }

    fn fallback<T>(
        &self,
        operation: &'static str,
        attempt: Result<T, GatewayError>,
        heuristic: impl FnOnce() -> T,
    ) -> Orchestrated<T> {
        match attempt {
            Ok(value) => {
                debug!(operation, "answered by model");
                Orchestrated::ai(value)
            }
            Err(e) => {
                let reason = FallbackReason::from_error(&e);
                metrics::counter!(
                    telemetry::FALLBACKS_TOTAL,
                    "operation" => operation,
                    "reason" => reason.as_str()
                )
                .increment(1);
                match &self.availability {
                    AiAvailability::Unavailable(why) => {
                        warn!(operation, reason = why.as_str(), "AI unavailable, using heuristic")
                    }
                    AiAvailability::Available => {
                        warn!(operation, reason = reason.as_str(), error = %e, "AI call failed, using heuristic")
                    }
                }
                Orchestrated::heuristic(heuristic(), reason)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reasons_follow_error_kind() {
        assert_eq!(
            FallbackReason::from_error(&GatewayError::Unconfigured),
            FallbackReason::Unconfigured
        );
        assert_eq!(
            FallbackReason::from_error(&GatewayError::Network("reset".into())),
            FallbackReason::Transport
        );
        assert_eq!(
            FallbackReason::from_error(&GatewayError::Timeout(Duration::from_secs(1))),
            FallbackReason::Timeout
        );
        assert_eq!(
            FallbackReason::from_error(&GatewayError::MalformedResponse("x".into())),
            FallbackReason::Malformed
        );
    }

    #[test]
    fn batch_profile_swaps_image_settings() {
        let profiles = CallProfiles::default();
        assert_eq!(profiles.pronunciation.timeout, Duration::from_secs(10));
        assert_eq!(profiles.vocabulary.timeout, Duration::from_secs(15));
        assert_eq!(profiles.image.timeout, Duration::from_secs(30));
        assert_eq!(profiles.batch_image.timeout, Duration::from_secs(60));

        let gateway: Arc<dyn CompletionGateway> =
            Arc::new(crate::gateway::OpenAiGateway::new(&AiConfig::default()));
        let orchestrator = Orchestrator::new(gateway, &AiConfig::default());
        assert!(!orchestrator.availability().is_available());
        assert_eq!(
            orchestrator.for_batch().profiles().image.timeout,
            Duration::from_secs(60)
        );
    }

    #[test]
    fn orchestrated_serializes_camel_case() {
        let value = Orchestrated::heuristic(1, FallbackReason::Http);
        let json = serde_json::to_value(&value).unwrap();
        assert_eq!(json["source"], "heuristic");
        assert_eq!(json["fallbackReason"], "http");
        let json = serde_json::to_value(Orchestrated::ai(1)).unwrap();
        assert!(json.get("fallbackReason").is_none());
    }
}
