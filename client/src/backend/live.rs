//! HTTP provider for the hosted feed API.

use super::Page;
use crate::config::EngineConfig;
use crate::error::{ClientError, Result};
use serde_json::Value;
use tradewire_engine::{normalize_item, normalize_items, FeedFilters, NormalizedDraft};

/// Header carrying the publish idempotency key.
const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";

/// Provider backed by the hosted REST API.
#[derive(Debug)]
pub struct LiveBackend {
    http: reqwest::Client,
    base_url: String,
}

impl LiveBackend {
    /// Build the HTTP client with the configured request timeout.
    pub fn new(config: &EngineConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// `GET {base}?cursor&<filters>` returning one page. The page size is
    /// the server's choice under the cursor protocol.
    pub async fn fetch_page(
        &self,
        filters: &FeedFilters,
        cursor: Option<&str>,
    ) -> Result<Page> {
        let query = page_query(filters, cursor);
        let response = self.http.get(&self.base_url).query(&query).send().await?;
        let body = read_json(response).await?;
        let (data, cursor) = unwrap_envelope(body);
        let items = normalize_items(data)?;
        tracing::debug!(count = items.len(), has_more = cursor.is_some(), "page fetched");
        Ok(Page { items, cursor })
    }

    /// `GET {base}/{id}` returning a single item.
    pub async fn fetch_by_id(&self, id: &str) -> Result<tradewire_engine::FeedItem> {
        let url = format!("{}/{id}", self.base_url);
        let response = self.http.get(&url).send().await?;
        let body = read_json(response).await?;
        let (data, _) = unwrap_envelope(body);
        Ok(normalize_item(data)?)
    }

    /// `POST {base}` with the idempotency key header. The server echoes
    /// the created item back with its canonical id.
    pub async fn publish(
        &self,
        draft: &NormalizedDraft,
        key: &str,
    ) -> Result<tradewire_engine::FeedItem> {
        let response = self
            .http
            .post(&self.base_url)
            .header(IDEMPOTENCY_HEADER, key)
            .json(draft)
            .send()
            .await?;
        let body = read_json(response).await?;
        let (data, _) = unwrap_envelope(body);
        Ok(normalize_item(data)?)
    }
}

/// Wire query for a collection fetch: the filter parameters plus the
/// cursor when present.
fn page_query(filters: &FeedFilters, cursor: Option<&str>) -> Vec<(&'static str, String)> {
    let mut query = filters.to_query_pairs();
    if let Some(cursor) = cursor {
        query.push(("cursor", cursor.to_string()));
    }
    query
}

/// Read a response body as JSON, converting non-2xx statuses into
/// [`ClientError::Request`] with the server's message when present.
async fn read_json(response: reqwest::Response) -> Result<Value> {
    let status = response.status();
    let text = response.text().await?;
    if !status.is_success() {
        return Err(ClientError::from_response(status.as_u16(), &text));
    }
    serde_json::from_str(&text).map_err(|e| ClientError::Decode(e.to_string()))
}

/// Split the `{data, cursor}` envelope. Bare payloads pass through so the
/// client tolerates endpoints that skip the envelope.
fn unwrap_envelope(body: Value) -> (Value, Option<String>) {
    match body {
        Value::Object(mut map) if map.contains_key("data") => {
            let cursor = map
                .get("cursor")
                .and_then(Value::as_str)
                .map(str::to_string);
            let data = map.remove("data").unwrap_or(Value::Null);
            (data, cursor)
        }
        other => (other, None),
    }
}
