//! readaloud - AI orchestration with heuristic fallbacks for a children's
//! reading tutor.
//!
//! Three operations are offered: scoring a read-aloud attempt, picking
//! vocabulary from a page description, and describing a page illustration.
//! Each one tries an OpenAI-compatible chat-completion endpoint first and
//! falls back to a deterministic heuristic when the key is missing, the call
//! fails, or the answer does not parse. [`BatchRunner`] applies the image
//! operation to every page of a book.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use readaloud::{AiConfig, EvaluationRequest, OpenAiGateway, Orchestrator};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = AiConfig::from_env();
//!     let gateway = Arc::new(OpenAiGateway::new(&config));
//!     let orchestrator = Orchestrator::new(gateway, &config);
//!
//!     let request = EvaluationRequest::new("the cat sat", "the cat sat", Some(0.9));
//!     let result = orchestrator.evaluate_pronunciation(&request).await;
//!     println!("{:?} via {:?}", result.value, result.source);
//! }
//! ```

pub mod batch;
pub mod error;
pub mod gateway;
pub mod heuristics;
pub mod orchestrator;
#[cfg(feature = "server")]
pub mod server;
pub mod store;
pub mod telemetry;
pub mod types;
pub mod version;

pub use batch::BatchRunner;
pub use error::{BatchError, GatewayError, ReadaloudError, Result, StoreError};
pub use gateway::{
    AiAvailability, AiConfig, CompletionGateway, OpenAiGateway, RetryPolicy, RetryingGateway,
};
pub use orchestrator::{
    CallProfile, CallProfiles, Described, FailurePolicy, FallbackReason, Orchestrated,
    Orchestrator, ResultSource, SideEffect,
};
pub use store::{BlobStore, MemoryBlobStore, MemoryRowStore, Query, RowStore};
pub use types::{
    BatchItemOutcome, BatchItemStatus, BatchReport, Book, DifficultyLevel, EvaluationRequest,
    EvaluationResult, ImageAnalysis, ImageContext, ImageRequest, Page, VocabularyEntry,
    VocabularyItem, VocabularyRequest,
};
