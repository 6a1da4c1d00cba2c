//! Storage collaborators: a row store and a blob store.
//!
//! The core never talks SQL. It sees tables of JSON rows reachable through
//! a handful of primitives (filter, order, paginate, single-row writes
//! keyed by `id`) and a blob store addressed by path. [`library`] layers
//! typed helpers for books, pages and vocabulary on top.
//!
//! Backends:
//! - [`memory`]: process-local, used for development and tests
//! - `supabase` (feature `supabase`): PostgREST and Supabase Storage over HTTP

pub mod library;
pub mod memory;
#[cfg(feature = "supabase")]
pub mod supabase;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::StoreError;

pub use memory::{MemoryBlobStore, MemoryRowStore};
#[cfg(feature = "supabase")]
pub use supabase::{SupabaseBlobStore, SupabaseConfig, SupabaseRowStore};

/// A stored row as a JSON object.
pub type Row = serde_json::Map<String, Value>;

/// Table names used by the library helpers.
pub const BOOKS_TABLE: &str = "books";
pub const PAGES_TABLE: &str = "book_pages";
pub const VOCABULARY_TABLE: &str = "vocabulary";

/// Row predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// `column == value`
    Eq { column: String, value: Value },
    /// Array `column` holds `value` (or every element of `value` if it is an array).
    Contains { column: String, value: Value },
    /// `column` equals one of `values`.
    In { column: String, values: Vec<Value> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub column: String,
    pub ascending: bool,
}

/// A select over one table.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub table: String,
    pub filters: Vec<Filter>,
    pub order: Option<Order>,
    pub offset: Option<usize>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn table(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            filters: Vec::new(),
            order: None,
            offset: None,
            limit: None,
        }
    }

    pub fn eq(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::Eq {
            column: column.into(),
            value: value.into(),
        });
        self
    }

    pub fn contains(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::Contains {
            column: column.into(),
            value: value.into(),
        });
        self
    }

    pub fn is_in(mut self, column: impl Into<String>, values: Vec<Value>) -> Self {
        self.filters.push(Filter::In {
            column: column.into(),
            values,
        });
        self
    }

    pub fn order_by(mut self, column: impl Into<String>, ascending: bool) -> Self {
        self.order = Some(Order {
            column: column.into(),
            ascending,
        });
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Row-oriented document store.
#[async_trait]
pub trait RowStore: Send + Sync {
    /// Store name for logging/debugging.
    fn name(&self) -> &str;

    async fn select(&self, query: &Query) -> Result<Vec<Row>, StoreError>;

    /// Insert a row and return it as stored (with its `id`).
    async fn insert(&self, table: &str, row: Row) -> Result<Row, StoreError>;

    /// Merge `patch` into the row with this `id` and return the result.
    ///
    /// Returns `StoreError::NotFound` when no row matches.
    async fn update(&self, table: &str, id: &str, patch: Row) -> Result<Row, StoreError>;

    async fn delete(&self, table: &str, id: &str) -> Result<(), StoreError>;
}

/// Path-addressed binary storage.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store name for logging/debugging.
    fn name(&self) -> &str;

    /// Store `bytes` at `path`, replacing any existing object, and return its
    /// public URL.
    async fn put(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StoreError>;

    async fn get(&self, path: &str) -> Result<Vec<u8>, StoreError>;

    /// Remove objects; missing paths are ignored.
    async fn remove(&self, paths: &[String]) -> Result<(), StoreError>;
}
