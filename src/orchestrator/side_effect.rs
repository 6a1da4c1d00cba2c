//! Best-effort side effects.
//!
//! A side effect whose failure must not change the primary result (writing
//! a computed description back to storage, say) is run through
//! [`best_effort`]. The outcome comes back as a value next to the result,
//! so callers and tests can see it, and failures are logged and counted.

use std::fmt::Display;
use std::future::Future;

use serde::Serialize;
use tracing::warn;

use crate::telemetry;

/// What happened to a best-effort side effect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "error", rename_all = "snake_case")]
pub enum SideEffect {
    NotRequested,
    Applied,
    Failed(String),
}

impl SideEffect {
    pub fn is_applied(&self) -> bool {
        matches!(self, SideEffect::Applied)
    }
}

/// Await `effect`, converting its outcome into a [`SideEffect`].
///
/// `target` names what was being written, for logs and metrics.
pub async fn best_effort<Fut, T, E>(target: &'static str, effect: Fut) -> SideEffect
where
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    match effect.await {
        Ok(_) => SideEffect::Applied,
        Err(e) => {
            metrics::counter!(telemetry::PERSISTENCE_FAILURES_TOTAL, "target" => target)
                .increment(1);
            warn!(target_name = target, error = %e, "best-effort write failed; result still returned");
            SideEffect::Failed(e.to_string())
        }
    }
}
