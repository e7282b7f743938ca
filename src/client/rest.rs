use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::{Client, Method, RequestBuilder, Url};
use serde::Deserialize;
use serde_json::Value;

use crate::client::{DatastoreError, Filter, PersistenceClient, Select};

/// Media type asking PostgREST for exactly one row as a bare object
const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";

/// PostgREST error code for "JSON object requested, multiple (or no) rows returned"
const SINGLE_ROW_VIOLATION: &str = "PGRST116";

/// PostgREST client for a hosted datastore (`{url}/rest/v1/{table}`)
#[derive(Clone)]
pub struct RestClient {
    http: Client,
    base: Url,
}

/// Error body returned by PostgREST
#[derive(Debug, Deserialize)]
struct ErrorBody {
    code: Option<String>,
    message: Option<String>,
    details: Option<String>,
    hint: Option<String>,
}

impl RestClient {
    /// Create a client for the project at `url`, authenticating with `api_key`
    pub fn new(url: &str, api_key: &str, timeout: Duration) -> Result<Self, ClientBuildError> {
        let mut base = Url::parse(url).map_err(|e| ClientBuildError::InvalidUrl(e.to_string()))?;
        base.path_segments_mut()
            .map_err(|_| ClientBuildError::InvalidUrl(url.to_string()))?
            .pop_if_empty()
            .push("rest")
            .push("v1");
        base.set_query(None);

        let mut api_key_header =
            HeaderValue::from_str(api_key).map_err(|_| ClientBuildError::InvalidKey)?;
        api_key_header.set_sensitive(true);
        let mut bearer = HeaderValue::from_str(&format!("Bearer {}", api_key))
            .map_err(|_| ClientBuildError::InvalidKey)?;
        bearer.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(HeaderName::from_static("apikey"), api_key_header);
        headers.insert(AUTHORIZATION, bearer);

        let http = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self { http, base })
    }

    /// Build the endpoint URL for a table
    fn endpoint(&self, table: &str) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.push(table);
        }
        url
    }

    fn filtered(&self, table: &str, filter: &Filter) -> Url {
        let mut url = self.endpoint(table);
        url.query_pairs_mut()
            .append_pair(&filter.column, &format!("eq.{}", filter.value));
        url
    }

    fn select_url(&self, query: &Select) -> Url {
        let mut url = self.endpoint(&query.table);
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("select", "*");
            for filter in &query.filters {
                pairs.append_pair(&filter.column, &format!("eq.{}", filter.value));
            }
            if let Some(order) = &query.order {
                let direction = if order.ascending { "asc" } else { "desc" };
                pairs.append_pair("order", &format!("{}.{}", order.column, direction));
            }
        }
        url
    }

    /// Send a request and return the decoded body, `None` when the body is empty or null
    async fn execute(
        &self,
        request: RequestBuilder,
        method: Method,
        table: &str,
    ) -> Result<Option<Value>, DatastoreError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        tracing::debug!(
            method = %method,
            table = table,
            status = status.as_u16(),
            "Datastore request completed"
        );

        if !status.is_success() {
            return Err(parse_error(status.as_u16(), &body));
        }

        if body.trim().is_empty() {
            return Ok(None);
        }

        let value: Value = serde_json::from_str(&body)?;
        Ok((!value.is_null()).then_some(value))
    }
}

#[async_trait]
impl PersistenceClient for RestClient {
    async fn select(&self, query: Select) -> Result<Option<Value>, DatastoreError> {
        let mut request = self.http.get(self.select_url(&query));
        if query.single {
            request = request.header(ACCEPT, SINGLE_OBJECT);
        }

        self.execute(request, Method::GET, &query.table).await
    }

    async fn insert(&self, table: &str, row: Value) -> Result<Value, DatastoreError> {
        let mut url = self.endpoint(table);
        url.query_pairs_mut().append_pair("select", "*");

        let request = self
            .http
            .post(url)
            .header("Prefer", "return=representation")
            .header(ACCEPT, SINGLE_OBJECT)
            .json(&Value::Array(vec![row]));

        self.execute(request, Method::POST, table)
            .await?
            .ok_or(DatastoreError::NotSingle { rows: 0 })
    }

    async fn update(
        &self,
        table: &str,
        filter: Filter,
        patch: Value,
    ) -> Result<Value, DatastoreError> {
        let mut url = self.filtered(table, &filter);
        url.query_pairs_mut().append_pair("select", "*");

        let request = self
            .http
            .patch(url)
            .header("Prefer", "return=representation")
            .header(ACCEPT, SINGLE_OBJECT)
            .json(&patch);

        self.execute(request, Method::PATCH, table)
            .await?
            .ok_or(DatastoreError::NotSingle { rows: 0 })
    }

    async fn delete(&self, table: &str, filter: Filter) -> Result<(), DatastoreError> {
        let request = self
            .http
            .delete(self.filtered(table, &filter))
            .header("Prefer", "return=minimal");

        self.execute(request, Method::DELETE, table).await?;
        Ok(())
    }
}

/// Map a non-2xx response body to a datastore error
fn parse_error(status: u16, body: &str) -> DatastoreError {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(err) if err.code.as_deref() == Some(SINGLE_ROW_VIOLATION) => DatastoreError::NotSingle {
            rows: err.details.as_deref().and_then(row_count).unwrap_or(0),
        },
        Ok(err) => DatastoreError::Api {
            status,
            code: err.code,
            message: err.message.unwrap_or_else(|| body.to_string()),
            details: err.details,
            hint: err.hint,
        },
        Err(_) => DatastoreError::Api {
            status,
            code: None,
            message: body.to_string(),
            details: None,
            hint: None,
        },
    }
}

/// First number in a PGRST116 details string ("The result contains 0 rows")
fn row_count(details: &str) -> Option<usize> {
    details
        .split(|c: char| !c.is_ascii_digit())
        .find(|part| !part.is_empty())
        .and_then(|part| part.parse().ok())
}

#[derive(Debug, thiserror::Error)]
pub enum ClientBuildError {
    #[error("Invalid datastore URL: {0}")]
    InvalidUrl(String),

    #[error("Datastore key is not a valid header value")]
    InvalidKey,

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}
