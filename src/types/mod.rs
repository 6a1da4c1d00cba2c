//! Public types for the readaloud API.

mod batch;
mod evaluation;
mod image;
mod library;
mod message;
mod options;
mod response;
mod vocabulary;

pub use batch::{BatchItemOutcome, BatchItemStatus, BatchReport};
pub use evaluation::{DEFAULT_CONFIDENCE, EvaluationRequest, EvaluationResult, clamp_score};
pub use image::{ImageAnalysis, ImageContext, ImageRequest};
pub use library::{Book, Page, VocabularyEntry};
pub use message::{ChatMessage, ContentPart, ImageUrl, MessageContent, Role};
pub use options::CompletionOptions;
pub use response::{RawCompletion, Usage};
pub use vocabulary::{
    DEFAULT_MAX_WORDS, DifficultyLevel, MAX_WORDS_LIMIT, VocabularyItem, VocabularyRequest,
};
