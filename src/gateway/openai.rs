//! OpenAI-compatible chat-completion client.
//!
//! Speaks `POST {base_url}/chat/completions` with bearer auth. Works against
//! OpenAI itself and any server that mirrors its wire format.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::CompletionGateway;
use super::availability::AiAvailability;
use super::config::AiConfig;
use crate::error::GatewayError;
use crate::telemetry;
use crate::types::{ChatMessage, CompletionOptions, RawCompletion, Usage};

const COMPLETIONS_PATH: &str = "/chat/completions";

/// Client for an OpenAI-compatible chat-completion endpoint.
///
/// The client itself has no request timeout; each call is bounded by
/// [`CompletionOptions::timeout`] instead.
#[derive(Clone)]
pub struct OpenAiGateway {
    api_key: Option<String>,
    http: Client,
    base_url: String,
}

impl OpenAiGateway {
    /// Create a gateway from configuration.
    pub fn new(config: &AiConfig) -> Self {
        Self::with_base_url(config.api_key.clone(), config.base_url.clone())
    }

    /// Create a gateway with an explicit base URL (for testing with wiremock).
    ///
    /// Surrounding whitespace in the key (a trailing newline from a file or
    /// env var) is dropped so the bearer header matches what availability checked.
    pub fn with_base_url(api_key: Option<String>, base_url: impl Into<String>) -> Self {
        let api_key = api_key.map(|k| k.trim().to_string());
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .expect("failed to build HTTP client");

        Self {
            api_key,
            http,
            base_url: base_url.into(),
        }
    }

    /// Full endpoint URL; a trailing slash on the base URL is tolerated.
    pub fn completions_url(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), COMPLETIONS_PATH)
    }

    async fn send(
        &self,
        api_key: &str,
        messages: &[ChatMessage],
        options: &CompletionOptions,
    ) -> Result<RawCompletion, GatewayError> {
        let response = self
            .http
            .post(self.completions_url())
            .bearer_auth(api_key)
            .json(&CompletionRequest {
                model: &options.model,
                messages,
                max_tokens: options.max_tokens,
                temperature: options.temperature,
            })
            .send()
            .await
            .map_err(|e| map_transport_error(e, options.timeout))?;

        let status = response.status();
        if !status.is_success() {
            // Body is best effort; an unreadable body still yields the status.
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| map_transport_error(e, options.timeout))?;
        parse_completion(&body)
    }
}

fn map_transport_error(err: reqwest::Error, timeout: Duration) -> GatewayError {
    if err.is_timeout() {
        GatewayError::Timeout(timeout)
    } else {
        GatewayError::from(err)
    }
}

/// Extract `choices[0].message.content` from a raw response body.
pub fn parse_completion(body: &str) -> Result<RawCompletion, GatewayError> {
    let parsed: CompletionResponse = serde_json::from_str(body)
        .map_err(|e| GatewayError::MalformedResponse(format!("invalid JSON envelope: {e}")))?;

    let content = parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message)
        .and_then(|m| m.content)
        .ok_or_else(|| {
            GatewayError::MalformedResponse("missing choices[0].message.content".to_string())
        })?;

    Ok(RawCompletion {
        content,
        usage: parsed.usage,
        model: parsed.model,
    })
}

#[async_trait]
impl CompletionGateway for OpenAiGateway {
    fn name(&self) -> &str {
        "openai"
    }

    async fn complete(
        &self,
        messages: &[ChatMessage],
        options: &CompletionOptions,
    ) -> Result<RawCompletion, GatewayError> {
        if !AiAvailability::from_key(self.api_key.as_deref()).is_available() {
            return Err(GatewayError::Unconfigured);
        }
        let api_key = self.api_key.as_deref().unwrap_or_default();

        let start = Instant::now();
        // Dropping the send future on timeout abandons the in-flight request.
        let send = self.send(api_key, messages, options);
        let result = match tokio::time::timeout(options.timeout, send).await {
            Ok(result) => result,
            Err(_) => Err(GatewayError::Timeout(options.timeout)),
        };

        let status = if result.is_ok() { "ok" } else { "error" };
        metrics::counter!(telemetry::AI_REQUESTS_TOTAL,
            "operation" => options.operation,
            "status" => status,
        )
        .increment(1);
        metrics::histogram!(telemetry::AI_REQUEST_DURATION_SECONDS,
            "operation" => options.operation,
        )
        .record(start.elapsed().as_secs_f64());

        debug!(
            operation = options.operation,
            model = %options.model,
            status,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "chat completion finished"
        );
        result
    }
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
    #[serde(default)]
    model: Option<String>,
}

#[derive(Deserialize)]
struct Choice {
    #[serde(default)]
    message: Option<ChoiceMessage>,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}
