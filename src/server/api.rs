//! Route handlers.

use axum::Json;
use axum::body::Bytes;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use super::AppState;
use super::auth::{Admin, Caller};
use super::error::{ApiError, optional_text, require_text};
use crate::batch::BatchRunner;
use crate::error::StoreError;
use crate::orchestrator::{
    FailurePolicy, FallbackReason, Orchestrated, ResultSource, SideEffect, best_effort,
};
use crate::store::library::{self, VocabularyFilter, VocabularySaveReport};
use crate::types::{
    BatchReport, DifficultyLevel, EvaluationRequest, EvaluationResult, ImageAnalysis,
    ImageContext, ImageRequest, Page, VocabularyEntry, VocabularyItem, VocabularyRequest,
};
use crate::version::{self, BuildInfo};

/// Default page size for `GET /api/vocabulary`.
pub const DEFAULT_LIST_LIMIT: usize = 50;
/// Largest accepted `limit`.
pub const MAX_LIST_LIMIT: usize = 200;

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| ApiError::invalid_param("body", rejection.body_text()))
}

#[derive(Debug, Serialize)]
pub struct HealthzResponse {
    status: &'static str,
    ai: &'static str,
    store: String,
    build: BuildInfo,
}

pub async fn healthz(State(state): State<AppState>) -> Json<HealthzResponse> {
    let ai = if state.orchestrator.availability().is_available() {
        "available"
    } else {
        "unavailable"
    };
    Json(HealthzResponse {
        status: "ok",
        ai,
        store: state.store.name().to_string(),
        build: version::build_info(),
    })
}

/// A single-item AI result: the value's fields plus where it came from.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AiResponse<T> {
    #[serde(flatten)]
    result: T,
    source: ResultSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    fallback_reason: Option<FallbackReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    persisted: Option<SideEffect>,
}

impl<T> AiResponse<T> {
    fn new(orchestrated: Orchestrated<T>) -> Self {
        Self {
            result: orchestrated.value,
            source: orchestrated.source,
            fallback_reason: orchestrated.fallback_reason,
            persisted: None,
        }
    }

    fn persisted(mut self, side_effect: SideEffect) -> Self {
        self.persisted = Some(side_effect);
        self
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateBody {
    transcript: Option<String>,
    target_text: Option<String>,
    confidence: Option<f32>,
}

#[instrument(skip_all)]
pub async fn evaluate_pronunciation(
    State(state): State<AppState>,
    _caller: Caller,
    payload: Result<Json<EvaluateBody>, JsonRejection>,
) -> Result<Json<AiResponse<EvaluationResult>>, ApiError> {
    let body = json_body(payload)?;
    let transcript = body.transcript.ok_or_else(|| ApiError::missing("transcript"))?;
    let target_text = require_text("targetText", body.target_text)?;
    // Out-of-range confidence is clamped by `EvaluationRequest::new`.
    let request = EvaluationRequest::new(transcript, target_text, body.confidence);
    let result = state.orchestrator.evaluate_pronunciation(&request).await;
    Ok(Json(AiResponse::new(result)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VocabularyBody {
    description: Option<String>,
    difficulty_level: Option<String>,
    max_words: Option<usize>,
    book_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VocabularyResponse {
    vocabulary: Vec<VocabularyItem>,
    source: ResultSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    fallback_reason: Option<FallbackReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    persisted: Option<SideEffect>,
    #[serde(skip_serializing_if = "Option::is_none")]
    saved: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    duplicates: Option<Vec<String>>,
}

fn parse_difficulty(
    field: &str,
    value: Option<String>,
) -> Result<Option<DifficultyLevel>, ApiError> {
    optional_text(value)
        .map(|v| {
            v.parse::<DifficultyLevel>()
                .map_err(|e| ApiError::invalid_param(field, e))
        })
        .transpose()
}

#[instrument(skip_all)]
pub async fn extract_vocabulary(
    State(state): State<AppState>,
    _caller: Caller,
    payload: Result<Json<VocabularyBody>, JsonRejection>,
) -> Result<Json<VocabularyResponse>, ApiError> {
    let body = json_body(payload)?;
    let description = require_text("description", body.description)?;
    let level = parse_difficulty("difficultyLevel", body.difficulty_level)?.unwrap_or_default();
    if body.max_words == Some(0) {
        return Err(ApiError::invalid_param("maxWords", "`maxWords` must be at least 1"));
    }
    let book_id = optional_text(body.book_id);
    if let Some(id) = &book_id {
        library::find_book(state.store.as_ref(), id)
            .await?
            .ok_or_else(|| ApiError::not_found("bookId", format!("book `{id}` not found")))?;
    }

    let request = VocabularyRequest::new(description, level, body.max_words);
    let result = state.orchestrator.extract_vocabulary(&request).await;

    let mut response = VocabularyResponse {
        vocabulary: Vec::new(),
        source: result.source,
        fallback_reason: result.fallback_reason,
        persisted: None,
        saved: None,
        duplicates: None,
    };
    if let Some(id) = &book_id {
        let mut report: Option<VocabularySaveReport> = None;
        let side_effect = best_effort("vocabulary", async {
            let saved =
                library::save_vocabulary(state.store.as_ref(), &result.value, Some(id.as_str()))
                    .await?;
            report = Some(saved);
            Ok::<_, StoreError>(())
        })
        .await;
        if let Some(report) = report {
            info!(
                book_id = %id,
                saved = report.saved.len(),
                duplicates = report.duplicates.len(),
                "vocabulary saved"
            );
            response.saved = Some(report.saved);
            response.duplicates = Some(report.duplicates);
        }
        response.persisted = Some(side_effect);
    }
    response.vocabulary = result.value;
    Ok(Json(response))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageBody {
    image_url: Option<String>,
    page_id: Option<String>,
    context: Option<String>,
}

#[instrument(skip_all)]
pub async fn analyze_image(
    State(state): State<AppState>,
    _caller: Caller,
    payload: Result<Json<ImageBody>, JsonRejection>,
) -> Result<Json<AiResponse<ImageAnalysis>>, ApiError> {
    let body = json_body(payload)?;
    let image_url = require_text("imageUrl", body.image_url)?;
    let request = ImageRequest::new(image_url, ImageContext::from_tag(body.context.as_deref()));

    let Some(page_id) = optional_text(body.page_id) else {
        let result = state
            .orchestrator
            .analyze_image(&request, FailurePolicy::FallbackOnError)
            .await
            .map_err(|_| ApiError::internal())?;
        return Ok(Json(AiResponse::new(result)));
    };

    library::find_page(state.store.as_ref(), &page_id)
        .await?
        .ok_or_else(|| ApiError::not_found("pageId", format!("page `{page_id}` not found")))?;
    let described = state
        .orchestrator
        .describe_page(
            state.store.as_ref(),
            &page_id,
            &request,
            FailurePolicy::FallbackOnError,
        )
        .await
        .map_err(|_| ApiError::internal())?;
    Ok(Json(
        AiResponse::new(described.analysis).persisted(described.persistence),
    ))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchBody {
    book_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResponse {
    book_id: String,
    #[serde(flatten)]
    report: BatchReport,
}

#[instrument(skip_all)]
pub async fn batch_analyze(
    State(state): State<AppState>,
    _admin: Admin,
    payload: Result<Json<BatchBody>, JsonRejection>,
) -> Result<Json<BatchResponse>, ApiError> {
    let body = json_body(payload)?;
    let book_id = require_text("bookId", body.book_id)?;
    let report = BatchRunner::new(&state.orchestrator, state.store.clone())
        .item_delay(state.item_delay)
        .run(&book_id)
        .await?;
    Ok(Json(BatchResponse { book_id, report }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    difficulty: Option<String>,
    book_id: Option<String>,
    limit: Option<usize>,
    offset: Option<usize>,
}

/// A stored word as returned to clients.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VocabularyEntryView {
    id: String,
    word: String,
    definition: String,
    difficulty_level: DifficultyLevel,
    part_of_speech: String,
    example_sentence: String,
    book_ids: Vec<String>,
}

impl From<VocabularyEntry> for VocabularyEntryView {
    fn from(entry: VocabularyEntry) -> Self {
        Self {
            id: entry.id,
            word: entry.word,
            definition: entry.definition,
            difficulty_level: entry.difficulty_level,
            part_of_speech: entry.part_of_speech,
            example_sentence: entry.example_sentence,
            book_ids: entry.book_ids,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct VocabularyList {
    vocabulary: Vec<VocabularyEntryView>,
    offset: usize,
    limit: usize,
}

pub async fn list_vocabulary(
    State(state): State<AppState>,
    _caller: Caller,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<VocabularyList>, ApiError> {
    let Query(params) =
        params.map_err(|rejection| ApiError::invalid_param("query", rejection.body_text()))?;
    let limit = params.limit.unwrap_or(DEFAULT_LIST_LIMIT);
    if limit == 0 || limit > MAX_LIST_LIMIT {
        return Err(ApiError::invalid_param(
            "limit",
            format!("`limit` must be between 1 and {MAX_LIST_LIMIT}"),
        ));
    }
    let filter = VocabularyFilter {
        difficulty: parse_difficulty("difficulty", params.difficulty)?,
        book_id: optional_text(params.book_id),
        offset: params.offset.unwrap_or(0),
        limit,
    };
    let entries = library::list_vocabulary(state.store.as_ref(), &filter).await?;
    Ok(Json(VocabularyList {
        vocabulary: entries.into_iter().map(Into::into).collect(),
        offset: filter.offset,
        limit: filter.limit,
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageImageResponse {
    page_id: String,
    image_url: Option<String>,
}

/// Blob path of a page's image; uploads overwrite it in place.
pub fn page_image_path(book_id: &str, page_id: &str) -> String {
    format!("pages/{book_id}/{page_id}")
}

async fn page_of_book(state: &AppState, book_id: &str, page_id: &str) -> Result<Page, ApiError> {
    library::find_page(state.store.as_ref(), page_id)
        .await?
        .filter(|page| page.book_id == book_id)
        .ok_or_else(|| {
            ApiError::not_found("pageId", format!("page `{page_id}` not found in book `{book_id}`"))
        })
}

#[instrument(skip(state, headers, bytes))]
pub async fn upload_page_image(
    State(state): State<AppState>,
    _admin: Admin,
    Path((book_id, page_id)): Path<(String, String)>,
    headers: HeaderMap,
    bytes: Bytes,
) -> Result<Json<PageImageResponse>, ApiError> {
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .filter(|ct| ct.starts_with("image/"))
        .ok_or_else(|| {
            ApiError::invalid_param("Content-Type", "an image/* content type is required")
        })?
        .to_string();
    if bytes.is_empty() {
        return Err(ApiError::invalid_param("body", "image body is empty"));
    }
    page_of_book(&state, &book_id, &page_id).await?;

    let path = page_image_path(&book_id, &page_id);
    let url = state
        .blobs
        .put(&path, bytes.to_vec(), &content_type)
        .await?;
    library::update_page_image(state.store.as_ref(), &page_id, Some(&url)).await?;
    info!(%path, size = bytes.len(), "page image stored");
    Ok(Json(PageImageResponse {
        page_id,
        image_url: Some(url),
    }))
}

#[instrument(skip(state))]
pub async fn delete_page_image(
    State(state): State<AppState>,
    _admin: Admin,
    Path((book_id, page_id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    let page = page_of_book(&state, &book_id, &page_id).await?;
    if page.image_url.is_none() {
        return Ok(StatusCode::NO_CONTENT);
    }
    state
        .blobs
        .remove(&[page_image_path(&book_id, &page_id)])
        .await?;
    library::update_page_image(state.store.as_ref(), &page_id, None).await?;
    info!("page image removed");
    Ok(StatusCode::NO_CONTENT)
}
