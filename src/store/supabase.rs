//! Supabase backends: PostgREST for rows, Supabase Storage for blobs.
//!
//! See: <https://postgrest.org/en/stable/references/api/tables_views.html>

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde_json::Value;

use super::{BlobStore, Filter, Query, Row, RowStore};
use crate::error::StoreError;

/// Environment variables consulted when building a [`SupabaseConfig`].
pub const ENV_URL: &str = "SUPABASE_URL";
pub const ENV_BUCKET: &str = "SUPABASE_BUCKET";

/// Default bucket for page images.
pub const DEFAULT_BUCKET: &str = "book-pages";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupabaseConfig {
    /// Project URL, e.g. `https://xyz.supabase.co`.
    pub url: String,
    pub service_key: String,
    pub bucket: String,
}

fn http_client() -> Client {
    Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .expect("failed to build HTTP client")
}

fn authorize(builder: RequestBuilder, service_key: &str) -> RequestBuilder {
    builder
        .header("apikey", service_key)
        .bearer_auth(service_key)
}

/// Map non-2xx responses to `StoreError`, passing successful ones through.
async fn check(
    response: Response,
    entity: &'static str,
    id: &str,
) -> Result<Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status.as_u16() == 404 {
        return Err(StoreError::NotFound {
            entity,
            id: id.to_string(),
        });
    }
    let body = response.text().await.unwrap_or_default();
    Err(StoreError::Backend(format!("{status}: {body}")))
}

/// Row store backed by a PostgREST endpoint (`{url}/rest/v1`).
#[derive(Clone)]
pub struct SupabaseRowStore {
    http: Client,
    rest_url: String,
    service_key: String,
}

impl SupabaseRowStore {
    pub fn new(config: &SupabaseConfig) -> Self {
        Self {
            http: http_client(),
            rest_url: format!("{}/rest/v1", config.url.trim_end_matches('/')),
            service_key: config.service_key.clone(),
        }
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/{}", self.rest_url, table)
    }

    async fn rows(response: Response) -> Result<Vec<Row>, StoreError> {
        let values: Vec<Value> = response
            .json()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))?;
        values
            .into_iter()
            .map(|v| match v {
                Value::Object(map) => Ok(map),
                other => Err(StoreError::Decode(format!("expected object row, got {other}"))),
            })
            .collect()
    }
}

/// Render a scalar for a PostgREST operator argument.
fn scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

/// Render a value as a quoted element of a PostgREST list or array literal.
fn quoted(value: &Value) -> String {
    format!("\"{}\"", scalar(value).replace('\\', "\\\\").replace('"', "\\\""))
}

/// Query-string pairs for a select.
pub fn render_query(query: &Query) -> Vec<(String, String)> {
    let mut params = vec![("select".to_string(), "*".to_string())];
    for filter in &query.filters {
        let (column, expr) = match filter {
            Filter::Eq { column, value } => (column, format!("eq.{}", scalar(value))),
            Filter::Contains { column, value } => {
                let items: Vec<String> = match value {
                    Value::Array(items) => items.iter().map(quoted).collect(),
                    single => vec![quoted(single)],
                };
                (column, format!("cs.{{{}}}", items.join(",")))
            }
            Filter::In { column, values } => {
                let items: Vec<String> = values.iter().map(quoted).collect();
                (column, format!("in.({})", items.join(",")))
            }
        };
        params.push((column.clone(), expr));
    }
    if let Some(order) = &query.order {
        let direction = if order.ascending { "asc" } else { "desc" };
        params.push(("order".to_string(), format!("{}.{direction}", order.column)));
    }
    if let Some(offset) = query.offset {
        params.push(("offset".to_string(), offset.to_string()));
    }
    if let Some(limit) = query.limit {
        params.push(("limit".to_string(), limit.to_string()));
    }
    params
}

#[async_trait]
impl RowStore for SupabaseRowStore {
    fn name(&self) -> &str {
        "supabase"
    }

    async fn select(&self, query: &Query) -> Result<Vec<Row>, StoreError> {
        let request = self
            .http
            .get(self.table_url(&query.table))
            .query(&render_query(query));
        let response = authorize(request, &self.service_key).send().await?;
        let response = check(response, "table", &query.table).await?;
        Self::rows(response).await
    }

    async fn insert(&self, table: &str, row: Row) -> Result<Row, StoreError> {
        let request = self
            .http
            .post(self.table_url(table))
            .header("Prefer", "return=representation")
            .json(&Value::Object(row));
        let response = authorize(request, &self.service_key).send().await?;
        let response = check(response, "table", table).await?;
        Self::rows(response)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::Backend("insert returned no row".to_string()))
    }

    async fn update(&self, table: &str, id: &str, patch: Row) -> Result<Row, StoreError> {
        let request = self
            .http
            .patch(self.table_url(table))
            .query(&[("id", format!("eq.{id}"))])
            .header("Prefer", "return=representation")
            .json(&Value::Object(patch));
        let response = authorize(request, &self.service_key).send().await?;
        let response = check(response, "row", id).await?;
        Self::rows(response)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::NotFound {
                entity: "row",
                id: id.to_string(),
            })
    }

    async fn delete(&self, table: &str, id: &str) -> Result<(), StoreError> {
        let request = self
            .http
            .delete(self.table_url(table))
            .query(&[("id", format!("eq.{id}"))]);
        let response = authorize(request, &self.service_key).send().await?;
        check(response, "row", id).await.map(|_| ())
    }
}

/// Blob store backed by a Supabase Storage bucket.
#[derive(Clone)]
pub struct SupabaseBlobStore {
    http: Client,
    storage_url: String,
    service_key: String,
    bucket: String,
}

impl SupabaseBlobStore {
    pub fn new(config: &SupabaseConfig) -> Self {
        Self {
            http: http_client(),
            storage_url: format!("{}/storage/v1", config.url.trim_end_matches('/')),
            service_key: config.service_key.clone(),
            bucket: config.bucket.clone(),
        }
    }

    fn object_url(&self, path: &str) -> String {
        format!(
            "{}/object/{}/{}",
            self.storage_url,
            self.bucket,
            path.trim_start_matches('/')
        )
    }

    pub fn public_url(&self, path: &str) -> String {
        format!(
            "{}/object/public/{}/{}",
            self.storage_url,
            self.bucket,
            path.trim_start_matches('/')
        )
    }
}

#[async_trait]
impl BlobStore for SupabaseBlobStore {
    fn name(&self) -> &str {
        "supabase"
    }

    async fn put(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StoreError> {
        let request = self
            .http
            .post(self.object_url(path))
            .header("Content-Type", content_type)
            .header("x-upsert", "true")
            .body(bytes);
        let response = authorize(request, &self.service_key).send().await?;
        check(response, "bucket", &self.bucket).await?;
        Ok(self.public_url(path))
    }

    async fn get(&self, path: &str) -> Result<Vec<u8>, StoreError> {
        let request = self.http.get(self.object_url(path));
        let response = authorize(request, &self.service_key).send().await?;
        let response = check(response, "object", path).await?;
        Ok(response.bytes().await?.to_vec())
    }

    async fn remove(&self, paths: &[String]) -> Result<(), StoreError> {
        if paths.is_empty() {
            return Ok(());
        }
        let request = self
            .http
            .delete(format!("{}/object/{}", self.storage_url, self.bucket))
            .json(&serde_json::json!({ "prefixes": paths }));
        let response = authorize(request, &self.service_key).send().await?;
        check(response, "bucket", &self.bucket).await.map(|_| ())
    }
}
