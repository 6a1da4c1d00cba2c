//! Typed helpers for books, pages and vocabulary over a [`RowStore`].

use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use super::{BOOKS_TABLE, PAGES_TABLE, Query, Row, RowStore, VOCABULARY_TABLE};
use crate::error::StoreError;
use crate::types::{Book, DifficultyLevel, Page, VocabularyEntry, VocabularyItem};

fn decode<T: DeserializeOwned>(row: Row) -> Result<T, StoreError> {
    serde_json::from_value(Value::Object(row)).map_err(|e| StoreError::Decode(e.to_string()))
}

fn decode_all<T: DeserializeOwned>(rows: Vec<Row>) -> Result<Vec<T>, StoreError> {
    rows.into_iter().map(decode).collect()
}

fn patch(value: Value) -> Row {
    match value {
        Value::Object(map) => map,
        _ => Row::new(),
    }
}

pub async fn find_book(store: &dyn RowStore, book_id: &str) -> Result<Option<Book>, StoreError> {
    let rows = store
        .select(&Query::table(BOOKS_TABLE).eq("id", book_id).limit(1))
        .await?;
    rows.into_iter().next().map(decode).transpose()
}

pub async fn find_page(store: &dyn RowStore, page_id: &str) -> Result<Option<Page>, StoreError> {
    let rows = store
        .select(&Query::table(PAGES_TABLE).eq("id", page_id).limit(1))
        .await?;
    rows.into_iter().next().map(decode).transpose()
}

/// All pages of a book in reading order.
pub async fn list_pages(store: &dyn RowStore, book_id: &str) -> Result<Vec<Page>, StoreError> {
    let rows = store
        .select(
            &Query::table(PAGES_TABLE)
                .eq("book_id", book_id)
                .order_by("page_number", true),
        )
        .await?;
    decode_all(rows)
}

pub async fn update_page_description(
    store: &dyn RowStore,
    page_id: &str,
    description: &str,
) -> Result<(), StoreError> {
    store
        .update(PAGES_TABLE, page_id, patch(json!({ "description": description })))
        .await
        .map(|_| ())
}

pub async fn update_page_image(
    store: &dyn RowStore,
    page_id: &str,
    image_url: Option<&str>,
) -> Result<(), StoreError> {
    store
        .update(PAGES_TABLE, page_id, patch(json!({ "image_url": image_url })))
        .await
        .map(|_| ())
}

/// Stored entries whose word is one of `words` (already lowercase).
pub async fn existing_vocabulary(
    store: &dyn RowStore,
    words: &[String],
) -> Result<Vec<VocabularyEntry>, StoreError> {
    if words.is_empty() {
        return Ok(Vec::new());
    }
    let values = words.iter().map(|w| Value::String(w.clone())).collect();
    let rows = store
        .select(&Query::table(VOCABULARY_TABLE).is_in("word", values))
        .await?;
    decode_all(rows)
}

/// Outcome of [`save_vocabulary`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VocabularySaveReport {
    /// Words inserted as new entries.
    pub saved: Vec<String>,
    /// Words that already existed (their `book_ids` may have been extended).
    pub duplicates: Vec<String>,
}

/// Persist extracted words, deduplicating on the lowercase word.
///
/// New words are inserted. For words already stored, `book_id` is appended
/// to the entry's `book_ids` when missing; definitions are left alone.
pub async fn save_vocabulary(
    store: &dyn RowStore,
    items: &[VocabularyItem],
    book_id: Option<&str>,
) -> Result<VocabularySaveReport, StoreError> {
    let words: Vec<String> = items.iter().map(|i| i.word.to_lowercase()).collect();
    let mut existing = existing_vocabulary(store, &words).await?;
    let mut report = VocabularySaveReport::default();

    for (item, word) in items.iter().zip(words) {
        if report.saved.contains(&word) || report.duplicates.contains(&word) {
            continue;
        }
        if let Some(entry) = existing.iter_mut().find(|e| e.word.to_lowercase() == word) {
            if let Some(book_id) = book_id {
                if !entry.book_ids.iter().any(|b| b == book_id) {
                    entry.book_ids.push(book_id.to_string());
                    store
                        .update(
                            VOCABULARY_TABLE,
                            &entry.id,
                            patch(json!({ "book_ids": entry.book_ids })),
                        )
                        .await?;
                }
            }
            report.duplicates.push(word);
            continue;
        }

        let book_ids: Vec<&str> = book_id.into_iter().collect();
        store
            .insert(
                VOCABULARY_TABLE,
                patch(json!({
                    "word": word,
                    "definition": item.definition,
                    "difficulty_level": item.difficulty_level,
                    "part_of_speech": item.part_of_speech,
                    "example_sentence": item.example_sentence,
                    "book_ids": book_ids,
                })),
            )
            .await?;
        report.saved.push(word);
    }
    Ok(report)
}

/// Filters and paging for [`list_vocabulary`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VocabularyFilter {
    pub difficulty: Option<DifficultyLevel>,
    pub book_id: Option<String>,
    pub offset: usize,
    pub limit: usize,
}

/// Stored vocabulary, alphabetical.
pub async fn list_vocabulary(
    store: &dyn RowStore,
    filter: &VocabularyFilter,
) -> Result<Vec<VocabularyEntry>, StoreError> {
    let mut query = Query::table(VOCABULARY_TABLE)
        .order_by("word", true)
        .offset(filter.offset)
        .limit(filter.limit);
    if let Some(level) = filter.difficulty {
        query = query.eq("difficulty_level", level.as_str());
    }
    if let Some(book_id) = &filter.book_id {
        query = query.contains("book_ids", json!([book_id]));
    }
    decode_all(store.select(&query).await?)
}
