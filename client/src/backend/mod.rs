//! Data providers behind the session.
//!
//! The session talks to a [`Backend`] and never learns which provider is
//! live. Enum dispatch keeps async methods out of trait objects; both
//! variants return records through the same normalization boundary, so a
//! page from the fixture is indistinguishable from a page off the wire.

mod live;
mod offline;

pub use live::LiveBackend;
pub use offline::OfflineBackend;

use crate::config::EngineConfig;
use crate::error::Result;
use tradewire_engine::{FeedFilters, FeedItem, NormalizedDraft};

/// One page of feed items plus the opaque cursor for the next page.
///
/// `cursor: None` means the collection is exhausted.
#[derive(Debug, Clone, Default)]
pub struct Page {
    pub items: Vec<FeedItem>,
    pub cursor: Option<String>,
}

/// Provider selection, resolved once at session construction.
#[derive(Debug)]
pub enum Backend {
    Live(LiveBackend),
    Offline(OfflineBackend),
}

impl Backend {
    /// Build the provider the configuration asks for.
    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        if config.offline {
            Ok(Backend::Offline(OfflineBackend::new(config.page_size)?))
        } else {
            Ok(Backend::Live(LiveBackend::new(config)?))
        }
    }

    /// Fetch one page of the collection under the given filters.
    pub async fn fetch_page(
        &self,
        filters: &FeedFilters,
        cursor: Option<&str>,
    ) -> Result<Page> {
        match self {
            Backend::Live(live) => live.fetch_page(filters, cursor).await,
            Backend::Offline(offline) => offline.fetch_page(filters, cursor).await,
        }
    }

    /// Fetch a single item by id.
    pub async fn fetch_by_id(&self, id: &str) -> Result<FeedItem> {
        match self {
            Backend::Live(live) => live.fetch_by_id(id).await,
            Backend::Offline(offline) => offline.fetch_by_id(id).await,
        }
    }

    /// Publish a validated draft under an idempotency key and return the
    /// server-confirmed item.
    pub async fn publish(&self, draft: &NormalizedDraft, key: &str) -> Result<FeedItem> {
        match self {
            Backend::Live(live) => live.publish(draft, key).await,
            Backend::Offline(offline) => offline.publish(draft, key).await,
        }
    }

    pub fn is_offline(&self) -> bool {
        matches!(self, Backend::Offline(_))
    }
}
