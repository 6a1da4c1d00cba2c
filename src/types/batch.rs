//! Batch report types

use serde::{Deserialize, Serialize};

/// Outcome of one item in a batch run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchItemStatus {
    Analyzed,
    Skipped,
    Failed,
}

impl BatchItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchItemStatus::Analyzed => "analyzed",
            BatchItemStatus::Skipped => "skipped",
            BatchItemStatus::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchItemOutcome {
    pub item_id: String,
    /// Page number of the item.
    pub ordinal: i64,
    pub status: BatchItemStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

/// Aggregate of a batch run, in processing order.
///
/// Counters only change through [`record`](Self::record), which keeps
/// `analyzed + skipped + failed == total_items == details.len()`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub total_items: usize,
    pub analyzed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub details: Vec<BatchItemOutcome>,
}

impl BatchReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an outcome and bump the matching counter.
    pub fn record(&mut self, outcome: BatchItemOutcome) {
        match outcome.status {
            BatchItemStatus::Analyzed => self.analyzed += 1,
            BatchItemStatus::Skipped => self.skipped += 1,
            BatchItemStatus::Failed => self.failed += 1,
        }
        self.total_items += 1;
        self.details.push(outcome);
    }

    /// Whether the counters agree with each other and with `details`.
    pub fn is_consistent(&self) -> bool {
        self.analyzed + self.skipped + self.failed == self.total_items
            && self.details.len() == self.total_items
    }
}
