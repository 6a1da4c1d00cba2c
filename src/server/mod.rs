//! HTTP surface for the readaloud daemon.
//!
//! This module provides:
//! - The axum router and its shared state (`build_router`, [`AppState`])
//! - Route handlers (`api`)
//! - Bearer-token auth extractors (`auth`)
//! - JSON error responses (`error`)
//! - Configuration types (`config`)

pub mod api;
pub mod auth;
pub mod config;
pub mod error;

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post, put};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::batch::DEFAULT_ITEM_DELAY;
use crate::orchestrator::Orchestrator;
use crate::store::{BlobStore, RowStore};
use crate::{ReadaloudError, Result};

pub use auth::{AuthRole, TokenTable};
pub use error::ApiError;

pub const HEALTHZ_PATH: &str = "/api/healthz";

/// Largest accepted page image upload.
pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

/// State shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Orchestrator,
    pub store: Arc<dyn RowStore>,
    pub blobs: Arc<dyn BlobStore>,
    pub tokens: Arc<TokenTable>,
    /// Pause between model calls in batch runs.
    pub item_delay: Duration,
}

impl AppState {
    pub fn new(
        orchestrator: Orchestrator,
        store: Arc<dyn RowStore>,
        blobs: Arc<dyn BlobStore>,
        tokens: TokenTable,
    ) -> Self {
        Self {
            orchestrator,
            store,
            blobs,
            tokens: Arc::new(tokens),
            item_delay: DEFAULT_ITEM_DELAY,
        }
    }

    pub fn item_delay(mut self, delay: Duration) -> Self {
        self.item_delay = delay;
        self
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(HEALTHZ_PATH, get(api::healthz))
        .route(
            "/api/chat/evaluate-pronunciation",
            post(api::evaluate_pronunciation),
        )
        .route("/api/books/extract-vocabulary", post(api::extract_vocabulary))
        .route("/api/books/analyze-image", post(api::analyze_image))
        .route("/api/books/batch-analyze", post(api::batch_analyze))
        .route("/api/vocabulary", get(api::list_vocabulary))
        .route(
            "/api/books/{book_id}/pages/{page_id}/image",
            put(api::upload_page_image)
                .delete(api::delete_page_image)
                .layer(DefaultBodyLimit::max(MAX_IMAGE_BYTES)),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `address` and serve until Ctrl+C or SIGTERM.
pub async fn serve(address: &str, state: AppState) -> Result<()> {
    let addr: SocketAddr = address.trim().parse().map_err(|e| {
        ReadaloudError::Configuration(format!("invalid listen address `{address}`: {e}"))
    })?;
    let listener = TcpListener::bind(addr).await?;
    let local_addr = listener.local_addr()?;
    tracing::info!(%local_addr, "readaloudd listening");

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server shutdown complete");
    Ok(())
}

fn shutdown_signal() -> impl Future<Output = ()> + Send + 'static {
    async {
        let ctrl_c = async {
            if let Err(error) = tokio::signal::ctrl_c().await {
                tracing::warn!(%error, "failed to capture Ctrl+C signal");
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let sigterm = async {
            use tokio::signal::unix::{SignalKind, signal};

            match signal(SignalKind::terminate()) {
                Ok(mut term) => {
                    term.recv().await;
                }
                Err(error) => {
                    tracing::warn!(%error, "failed to capture SIGTERM");
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let sigterm = std::future::pending::<()>();

        tokio::select! {
            () = ctrl_c => tracing::info!("Ctrl+C received; draining connections"),
            () = sigterm => tracing::info!("SIGTERM received; draining connections"),
        }
    }
}
