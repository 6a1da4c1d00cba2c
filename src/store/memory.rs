//! In-process row and blob stores.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use super::{BlobStore, Filter, Query, Row, RowStore};
use crate::error::StoreError;

/// Row store kept in memory, with the same filter semantics as PostgREST
/// for the primitives the crate uses.
#[derive(Default)]
pub struct MemoryRowStore {
    tables: RwLock<HashMap<String, Vec<Row>>>,
    next_id: AtomicU64,
}

impl MemoryRowStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a table. Non-object values are ignored.
    pub fn with_table(mut self, table: &str, rows: Vec<Value>) -> Self {
        let rows = rows.into_iter().filter_map(|v| match v {
            Value::Object(map) => Some(map),
            _ => None,
        });
        self.tables
            .get_mut()
            .entry(table.to_string())
            .or_default()
            .extend(rows);
        self
    }

    /// Snapshot of a table in insertion order.
    pub async fn rows(&self, table: &str) -> Vec<Row> {
        self.tables
            .read()
            .await
            .get(table)
            .cloned()
            .unwrap_or_default()
    }

    fn generate_id(&self, table: &str) -> String {
        let n = self.next_id.fetch_add(1, AtomicOrdering::Relaxed) + 1;
        format!("{table}-{n}")
    }
}

fn row_id(row: &Row) -> Option<&str> {
    row.get("id").and_then(Value::as_str)
}

fn matches(row: &Row, filter: &Filter) -> bool {
    match filter {
        Filter::Eq { column, value } => row.get(column) == Some(value),
        Filter::Contains { column, value } => {
            let Some(Value::Array(items)) = row.get(column) else {
                return false;
            };
            match value {
                Value::Array(wanted) => wanted.iter().all(|w| items.contains(w)),
                single => items.contains(single),
            }
        }
        Filter::In { column, values } => row.get(column).is_some_and(|v| values.contains(v)),
    }
}

/// Total order over JSON scalars: numbers, then strings, then everything
/// else; missing/null sorts last.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (None | Some(Value::Null), None | Some(Value::Null)) => Ordering::Equal,
        (None | Some(Value::Null), _) => Ordering::Greater,
        (_, None | Some(Value::Null)) => Ordering::Less,
        (Some(Value::Number(_)), _) => Ordering::Less,
        (_, Some(Value::Number(_))) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

#[async_trait]
impl RowStore for MemoryRowStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn select(&self, query: &Query) -> Result<Vec<Row>, StoreError> {
        let tables = self.tables.read().await;
        let mut rows: Vec<Row> = tables
            .get(&query.table)
            .map(|rows| {
                rows.iter()
                    .filter(|row| query.filters.iter().all(|f| matches(row, f)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        if let Some(order) = &query.order {
            // Stable sort keeps insertion order among equal keys.
            rows.sort_by(|a, b| {
                let ord = compare_values(a.get(&order.column), b.get(&order.column));
                if order.ascending { ord } else { ord.reverse() }
            });
        }

        let offset = query.offset.unwrap_or(0);
        let limit = query.limit.unwrap_or(usize::MAX);
        Ok(rows.into_iter().skip(offset).take(limit).collect())
    }

    async fn insert(&self, table: &str, mut row: Row) -> Result<Row, StoreError> {
        if row_id(&row).is_none() {
            row.insert("id".to_string(), Value::String(self.generate_id(table)));
        }
        let mut tables = self.tables.write().await;
        tables
            .entry(table.to_string())
            .or_default()
            .push(row.clone());
        Ok(row)
    }

    async fn update(&self, table: &str, id: &str, patch: Row) -> Result<Row, StoreError> {
        let mut tables = self.tables.write().await;
        let row = tables
            .get_mut(table)
            .and_then(|rows| rows.iter_mut().find(|r| row_id(r) == Some(id)))
            .ok_or_else(|| StoreError::NotFound {
                entity: "row",
                id: id.to_string(),
            })?;
        for (key, value) in patch {
            if key != "id" {
                row.insert(key, value);
            }
        }
        Ok(row.clone())
    }

    async fn delete(&self, table: &str, id: &str) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        if let Some(rows) = tables.get_mut(table) {
            rows.retain(|r| row_id(r) != Some(id));
        }
        Ok(())
    }
}

/// Blob store kept in memory. Public URLs use a configurable prefix.
pub struct MemoryBlobStore {
    objects: RwLock<HashMap<String, (Vec<u8>, String)>>,
    public_base: String,
}

impl Default for MemoryBlobStore {
    fn default() -> Self {
        Self::new("memory://blobs")
    }
}

impl MemoryBlobStore {
    pub fn new(public_base: impl Into<String>) -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
            public_base: public_base.into(),
        }
    }

    /// Content type recorded for `path`, if stored.
    pub async fn content_type(&self, path: &str) -> Option<String> {
        self.objects.read().await.get(path).map(|(_, ct)| ct.clone())
    }

    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn put(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StoreError> {
        self.objects
            .write()
            .await
            .insert(path.to_string(), (bytes, content_type.to_string()));
        Ok(format!(
            "{}/{}",
            self.public_base.trim_end_matches('/'),
            path.trim_start_matches('/')
        ))
    }

    async fn get(&self, path: &str) -> Result<Vec<u8>, StoreError> {
        self.objects
            .read()
            .await
            .get(path)
            .map(|(bytes, _)| bytes.clone())
            .ok_or_else(|| StoreError::NotFound {
                entity: "object",
                id: path.to_string(),
            })
    }

    async fn remove(&self, paths: &[String]) -> Result<(), StoreError> {
        let mut objects = self.objects.write().await;
        for path in paths {
            objects.remove(path);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pages() -> MemoryRowStore {
        MemoryRowStore::new().with_table(
            "book_pages",
            vec![
                json!({"id": "p3", "book_id": "b1", "page_number": 3}),
                json!({"id": "p1", "book_id": "b1", "page_number": 1}),
                json!({"id": "x1", "book_id": "b2", "page_number": 1}),
                json!({"id": "p2", "book_id": "b1", "page_number": 2}),
            ],
        )
    }

    fn ids(rows: &[Row]) -> Vec<&str> {
        rows.iter().filter_map(row_id).collect()
    }

    #[tokio::test]
    async fn select_filters_orders_and_paginates() {
        let store = pages();
        let query = Query::table("book_pages")
            .eq("book_id", "b1")
            .order_by("page_number", true);
        assert_eq!(ids(&store.select(&query).await.unwrap()), vec!["p1", "p2", "p3"]);

        let page = query.clone().offset(1).limit(1);
        assert_eq!(ids(&store.select(&page).await.unwrap()), vec!["p2"]);

        let desc = Query::table("book_pages")
            .eq("book_id", "b1")
            .order_by("page_number", false);
        assert_eq!(ids(&store.select(&desc).await.unwrap()), vec!["p3", "p2", "p1"]);
    }

    #[tokio::test]
    async fn contains_and_in_filters() {
        let store = MemoryRowStore::new().with_table(
            "vocabulary",
            vec![
                json!({"id": "v1", "word": "brave", "book_ids": ["b1", "b2"]}),
                json!({"id": "v2", "word": "lazy", "book_ids": ["b2"]}),
                json!({"id": "v3", "word": "fox"}),
            ],
        );
        let q = Query::table("vocabulary").contains("book_ids", "b1");
        assert_eq!(ids(&store.select(&q).await.unwrap()), vec!["v1"]);

        let q = Query::table("vocabulary").contains("book_ids", json!(["b1", "b2"]));
        assert_eq!(ids(&store.select(&q).await.unwrap()), vec!["v1"]);

        let q = Query::table("vocabulary").is_in("word", vec![json!("lazy"), json!("fox")]);
        assert_eq!(ids(&store.select(&q).await.unwrap()), vec!["v2", "v3"]);
    }

    #[tokio::test]
    async fn insert_assigns_id_and_update_merges() {
        let store = MemoryRowStore::new();
        let mut row = Row::new();
        row.insert("word".into(), json!("brave"));
        let stored = store.insert("vocabulary", row).await.unwrap();
        let id = row_id(&stored).unwrap().to_string();
        assert!(id.starts_with("vocabulary-"));

        let mut patch = Row::new();
        patch.insert("definition".into(), json!("full of courage"));
        let updated = store.update("vocabulary", &id, patch).await.unwrap();
        assert_eq!(updated["word"], json!("brave"));
        assert_eq!(updated["definition"], json!("full of courage"));

        let missing = store.update("vocabulary", "nope", Row::new()).await;
        assert!(matches!(missing, Err(StoreError::NotFound { .. })));

        store.delete("vocabulary", &id).await.unwrap();
        assert!(store.rows("vocabulary").await.is_empty());
    }

    #[tokio::test]
    async fn blob_put_get_remove() {
        let blobs = MemoryBlobStore::new("https://cdn.test/");
        let url = blobs
            .put("books/b1/p1.png", vec![1, 2, 3], "image/png")
            .await
            .unwrap();
        assert_eq!(url, "https://cdn.test/books/b1/p1.png");
        assert_eq!(blobs.get("books/b1/p1.png").await.unwrap(), vec![1, 2, 3]);
        assert_eq!(
            blobs.content_type("books/b1/p1.png").await.as_deref(),
            Some("image/png")
        );

        blobs
            .remove(&["books/b1/p1.png".to_string(), "missing".to_string()])
            .await
            .unwrap();
        assert!(blobs.is_empty().await);
        assert!(blobs.get("books/b1/p1.png").await.is_err());
    }
}
