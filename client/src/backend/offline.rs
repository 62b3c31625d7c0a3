//! Fixture-backed provider for offline and demo use.
//!
//! Serves the bundled dataset through the same filter and sort semantics
//! the live API applies, with a plain offset cursor. Publishes are applied
//! locally and confirmed immediately.

use super::Page;
use crate::error::{ClientError, Result};
use serde_json::Value;
use std::sync::{Mutex, PoisonError};
use tradewire_engine::{
    normalize_items, Error as EngineError, FeedFilters, FeedItem, ItemStatus, NormalizedDraft,
};
use uuid::Uuid;

const FIXTURE: &str = include_str!("../../fixtures/feed.json");

/// Provider serving the bundled fixture dataset from memory.
#[derive(Debug)]
pub struct OfflineBackend {
    items: Mutex<Vec<FeedItem>>,
    page_size: usize,
}

impl OfflineBackend {
    /// Load and normalize the bundled fixture.
    pub fn new(page_size: usize) -> Result<Self> {
        Self::from_str(FIXTURE, page_size)
    }

    /// Load a fixture from a file instead of the bundled dataset.
    pub fn from_path(path: &std::path::Path, page_size: usize) -> Result<Self> {
        let body = std::fs::read_to_string(path)
            .map_err(|e| ClientError::FixtureMissing(format!("{}: {e}", path.display())))?;
        Self::from_str(&body, page_size)
    }

    fn from_str(body: &str, page_size: usize) -> Result<Self> {
        let body: Value =
            serde_json::from_str(body).map_err(|e| ClientError::FixtureMissing(e.to_string()))?;
        let raw = body
            .get("feedItems")
            .cloned()
            .ok_or_else(|| ClientError::FixtureMissing("feedItems key absent".to_string()))?;
        let items = normalize_items(raw)?;
        Ok(Self {
            items: Mutex::new(items),
            page_size,
        })
    }

    /// Page through the fixture with an integer offset cursor.
    pub async fn fetch_page(
        &self,
        filters: &FeedFilters,
        cursor: Option<&str>,
    ) -> Result<Page> {
        let offset: usize = match cursor {
            None => 0,
            Some(raw) => raw
                .parse()
                .map_err(|_| EngineError::InvalidCursor(raw.to_string()))?,
        };

        let mut matched: Vec<FeedItem> = self
            .cache()
            .iter()
            .filter(|item| filters.matches(item))
            .cloned()
            .collect();
        filters.sort_items(&mut matched);

        let total = matched.len();
        let items: Vec<FeedItem> = matched
            .into_iter()
            .skip(offset)
            .take(self.page_size)
            .collect();
        let next = offset + items.len();
        let cursor = (next < total).then(|| next.to_string());
        Ok(Page { items, cursor })
    }

    pub async fn fetch_by_id(&self, id: &str) -> Result<FeedItem> {
        self.cache()
            .iter()
            .find(|item| item.id == id)
            .cloned()
            .ok_or_else(|| ClientError::NotFound(id.to_string()))
    }

    /// Apply a publish locally: synthesize an id, mark it confirmed and
    /// prepend it to the dataset.
    pub async fn publish(&self, draft: &NormalizedDraft, key: &str) -> Result<FeedItem> {
        let mut item = draft.into_pending_item(key, chrono::Utc::now());
        item.id = format!("local-{}", Uuid::new_v4());
        item.status = Some(ItemStatus::Confirmed);
        // Keys accompany pending items only; a confirmed record sheds it.
        item.idempotency_key = None;
        self.cache().insert(0, item.clone());
        Ok(item)
    }

    fn cache(&self) -> std::sync::MutexGuard<'_, Vec<FeedItem>> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
