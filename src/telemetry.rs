//! Telemetry metric name constants.
//!
//! Centralised metric names for readaloud operations. The daemon (or an
//! embedding application) installs its own `metrics` recorder; without a
//! recorder installed, all metric calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `readaloud_`. Counters end in `_total`,
//! histograms use meaningful units (e.g. `_seconds`).
//!
//! # Common labels
//!
//! - `operation` — orchestrated call (e.g. "pronunciation", "vocabulary", "image")
//! - `status` — outcome: "ok" or "error"
//! - `reason` — why the heuristic path was taken (see [`FallbackReason`](crate::orchestrator::FallbackReason))

/// Total calls sent to the chat-completion gateway (one per attempt).
///
/// Labels: `operation`, `status` ("ok" | "error").
pub const AI_REQUESTS_TOTAL: &str = "readaloud_ai_requests_total";

/// Gateway call duration in seconds.
///
/// Labels: `operation`.
pub const AI_REQUEST_DURATION_SECONDS: &str = "readaloud_ai_request_duration_seconds";

/// Total retry attempts (not counting the initial request).
///
/// Labels: `operation`.
pub const RETRIES_TOTAL: &str = "readaloud_retries_total";

/// Total results produced by a heuristic evaluator instead of the model.
///
/// Labels: `operation`, `reason`.
pub const FALLBACKS_TOTAL: &str = "readaloud_fallbacks_total";

/// Total batch items processed.
///
/// Labels: `status` ("analyzed" | "skipped" | "failed").
pub const BATCH_ITEMS_TOTAL: &str = "readaloud_batch_items_total";

/// Total best-effort writes that failed.
///
/// Labels: `target` (e.g. "page_description", "vocabulary").
pub const PERSISTENCE_FAILURES_TOTAL: &str = "readaloud_persistence_failures_total";
