//! # Tradewire Engine
//!
//! Deterministic feed state logic for the Tradewire realtime sync client.
//!
//! This crate holds everything about the feed that can be expressed as a
//! pure function of its inputs: the ordered merge store, the wire
//! normalization boundary, filter semantics, draft validation, delivery
//! deduplication, and the reducer that ties them together. IO, timers and
//! transports live in `tradewire-client`.
//!
//! ## Design Principles
//!
//! - **No IO**: the engine has no knowledge of sockets, HTTP, or clocks
//! - **Deterministic**: the same actions in the same order always produce
//!   the same state
//! - **Testable**: pure logic, no mocks needed
//!
//! ## Core Concepts
//!
//! ### Ordered merge store
//!
//! [`OrderedItems`] keeps the feed newest-first by `created_at` with
//! stable ties, plus an id-to-position index. Conflicting writes of the
//! same id are arbitrated by `updated_at` freshness: an incoming version
//! with no `updated_at` never overwrites, and stale updates are rejected.
//!
//! ### Normalization boundary
//!
//! [`normalize_item`] is the single place wire payloads become canonical
//! [`FeedItem`] records. Every ingestion path (stream push, page fetch,
//! offline fixture) runs through it, so downstream code never sees a
//! half-populated record.
//!
//! ### Reducer
//!
//! [`FeedState`] mutates only through [`reduce`] with a [`FeedAction`].
//! The `revision` counter bumps exactly when something changed, which is
//! what subscribers key off.
//!
//! ## Quick Start
//!
//! ```rust
//! use tradewire_engine::{normalize_item, FeedAction, FeedState, reduce};
//! use serde_json::json;
//!
//! let mut state = FeedState::default();
//!
//! let item = normalize_item(json!({
//!     "id": "offer-1",
//!     "createdAt": "2026-01-15T09:00:00Z",
//!     "type": "OFFER",
//!     "title": "Cotton surplus",
//! }))
//! .unwrap();
//!
//! assert!(reduce(&mut state, FeedAction::ItemUpserted(item)));
//! assert_eq!(state.items.len(), 1);
//! assert_eq!(state.revision, 1);
//!
//! // Replaying the identical payload changes nothing.
//! let same = normalize_item(json!({
//!     "id": "offer-1",
//!     "createdAt": "2026-01-15T09:00:00Z",
//!     "type": "OFFER",
//!     "title": "Cotton surplus",
//! }))
//! .unwrap();
//! assert!(!reduce(&mut state, FeedAction::ItemUpserted(same)));
//! assert_eq!(state.revision, 1);
//! ```

pub mod backoff;
pub mod dedup;
pub mod draft;
pub mod envelope;
pub mod error;
pub mod filter;
pub mod item;
pub mod state;
pub mod store;

// Re-export main types at crate root
pub use backoff::BackoffSchedule;
pub use dedup::{DeliveryWindow, DEFAULT_DEDUP_CAP};
pub use draft::{
    optimistic_id, FeedDraft, NormalizedDraft, ValidationCode, ValidationReport,
    ValidationWarning, OPTIMISTIC_ID_PREFIX,
};
pub use envelope::{normalize_item, normalize_items, EnvelopeKind, FeedEnvelope, DEFAULT_SECTOR};
pub use error::Error;
pub use filter::{FeedFilters, SortOrder};
pub use item::{FeedItem, ItemKind, ItemStatus, Quantity, Source, TradeMode};
pub use state::{
    reduce, ConnectionStatus, FeedAction, FeedSnapshot, FeedState, UNSEEN_CAP,
};
pub use store::OrderedItems;

/// Type aliases for clarity
pub type ItemId = String;
pub type EventId = String;
pub type Timestamp = chrono::DateTime<chrono::Utc>;
