pub mod memory;
pub mod rest;

pub use memory::{ForeignKey, InMemoryClient, TableSchema};
pub use rest::{ClientBuildError, RestClient};

use async_trait::async_trait;
use serde_json::Value;

/// Equality filter on a single column (`column = value`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub column: String,
    pub value: String,
}

impl Filter {
    pub fn eq(column: impl Into<String>, value: impl ToString) -> Self {
        Self {
            column: column.into(),
            value: value.to_string(),
        }
    }
}

/// Ordering applied to a select
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub column: String,
    pub ascending: bool,
}

/// Table-scoped read request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Select {
    pub table: String,
    pub filters: Vec<Filter>,
    pub order: Option<Order>,
    /// Expect exactly one row and return it as an object instead of an array
    pub single: bool,
}

impl Select {
    pub fn from(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            filters: Vec::new(),
            order: None,
            single: false,
        }
    }

    pub fn eq(mut self, column: impl Into<String>, value: impl ToString) -> Self {
        self.filters.push(Filter::eq(column, value));
        self
    }

    pub fn order(mut self, column: impl Into<String>, ascending: bool) -> Self {
        self.order = Some(Order {
            column: column.into(),
            ascending,
        });
        self
    }

    pub fn single(mut self) -> Self {
        self.single = true;
        self
    }
}

/// Failure reported by a persistence client
#[derive(Debug, thiserror::Error)]
pub enum DatastoreError {
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Datastore responded with {status}: {message}")]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
        details: Option<String>,
        hint: Option<String>,
    },

    #[error("Expected a single row, found {rows}")]
    NotSingle { rows: usize },

    #[error("Invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
}

impl DatastoreError {
    /// Convenience constructor for API failures without details
    pub fn api(status: u16, code: &str, message: impl Into<String>) -> Self {
        DatastoreError::Api {
            status,
            code: Some(code.to_string()),
            message: message.into(),
            details: None,
            hint: None,
        }
    }
}

/// Opaque datastore capability consumed by the repositories.
///
/// Every method is one round trip. Rows travel as JSON objects keyed by
/// column name; the repositories own the mapping to typed entities.
#[async_trait]
pub trait PersistenceClient: Send + Sync {
    /// Read rows. `None` means the store returned no data at all.
    async fn select(&self, query: Select) -> Result<Option<Value>, DatastoreError>;

    /// Insert one row and return it as stored
    async fn insert(&self, table: &str, row: Value) -> Result<Value, DatastoreError>;

    /// Apply a partial object to the single row matching `filter` and return it
    async fn update(
        &self,
        table: &str,
        filter: Filter,
        patch: Value,
    ) -> Result<Value, DatastoreError>;

    /// Delete every row matching `filter`
    async fn delete(&self, table: &str, filter: Filter) -> Result<(), DatastoreError>;
}
