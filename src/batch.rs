//! Describing every page of a book in one run.
//!
//! Pages are handled one at a time in page order. Already-described pages
//! are skipped without a gateway call; the rest are sent to the model with
//! [`FailurePolicy::FailOnError`], so a page only gets a description when
//! the model produced one. A failing page is recorded and the run moves on.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, instrument, warn};

use crate::error::{BatchError, GatewayError};
use crate::orchestrator::{FailurePolicy, Orchestrator};
use crate::store::{RowStore, library};
use crate::telemetry;
use crate::types::{
    BatchItemOutcome, BatchItemStatus, BatchReport, ImageContext, ImageRequest, Page,
};

/// Pause between consecutive model calls.
pub const DEFAULT_ITEM_DELAY: Duration = Duration::from_millis(2000);

/// Error message for a page without an image.
pub const NO_IMAGE_MESSAGE: &str = "page has no image";

/// Runs the page-description pipeline over a whole book.
pub struct BatchRunner {
    orchestrator: Orchestrator,
    store: Arc<dyn RowStore>,
    item_delay: Duration,
}

impl BatchRunner {
    /// Image calls made by the runner use the orchestrator's batch profile.
    pub fn new(orchestrator: &Orchestrator, store: Arc<dyn RowStore>) -> Self {
        Self {
            orchestrator: orchestrator.for_batch(),
            store,
            item_delay: DEFAULT_ITEM_DELAY,
        }
    }

    pub fn item_delay(mut self, delay: Duration) -> Self {
        self.item_delay = delay;
        self
    }

    /// Describe every undescribed page of `book_id`.
    ///
    /// Only a missing book or a failed page listing abort the run; per-page
    /// problems end up in the report.
    #[instrument(skip(self))]
    pub async fn run(&self, book_id: &str) -> Result<BatchReport, BatchError> {
        if library::find_book(self.store.as_ref(), book_id)
            .await?
            .is_none()
        {
            return Err(BatchError::BookNotFound(book_id.to_string()));
        }
        let pages = library::list_pages(self.store.as_ref(), book_id).await?;
        let ai_available = self.orchestrator.availability().is_available();
        if !ai_available {
            warn!(book_id, pages = pages.len(), "AI unavailable; undescribed pages will fail");
        }

        let mut report = BatchReport::new();
        let mut calls_made = 0usize;
        for page in &pages {
            let item = if page.has_description() {
                debug!(page_id = %page.id, "already described");
                outcome(page, BatchItemStatus::Skipped, None)
            } else if !ai_available {
                outcome(
                    page,
                    BatchItemStatus::Failed,
                    Some(GatewayError::Unconfigured.to_string()),
                )
            } else if let Some(image_url) = page.image_url.as_deref() {
                if calls_made > 0 {
                    tokio::time::sleep(self.item_delay).await;
                }
                calls_made += 1;
                self.describe(page, image_url).await
            } else {
                outcome(
                    page,
                    BatchItemStatus::Failed,
                    Some(NO_IMAGE_MESSAGE.to_string()),
                )
            };
            metrics::counter!(telemetry::BATCH_ITEMS_TOTAL, "status" => item.status.as_str())
                .increment(1);
            report.record(item);
        }

        info!(
            book_id,
            total = report.total_items,
            analyzed = report.analyzed,
            skipped = report.skipped,
            failed = report.failed,
            "batch analysis finished"
        );
        Ok(report)
    }

    async fn describe(&self, page: &Page, image_url: &str) -> BatchItemOutcome {
        let request = ImageRequest::new(image_url, ImageContext::Story);
        match self
            .orchestrator
            .describe_page(
                self.store.as_ref(),
                &page.id,
                &request,
                FailurePolicy::FailOnError,
            )
            .await
        {
            Ok(_) => outcome(page, BatchItemStatus::Analyzed, None),
            Err(e) => {
                warn!(page_id = %page.id, page_number = page.page_number, error = %e, "page analysis failed");
                outcome(page, BatchItemStatus::Failed, Some(e.to_string()))
            }
        }
    }
}

fn outcome(page: &Page, status: BatchItemStatus, error_message: Option<String>) -> BatchItemOutcome {
    BatchItemOutcome {
        item_id: page.id.clone(),
        ordinal: page.page_number,
        status,
        error_message,
    }
}
