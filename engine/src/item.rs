//! Feed item types.

use crate::{ItemId, Timestamp};
use serde::{Deserialize, Serialize};

/// Kind of feed item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemKind {
    Offer,
    Request,
    Alert,
    Tender,
    Capacity,
    Indicator,
}

/// Trade direction of an item or filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeMode {
    Export,
    Import,
    #[default]
    Both,
}

/// Lifecycle status of a client-originated item.
///
/// Server-sourced items carry no status at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    /// Acknowledged by the server.
    Confirmed,
    /// Optimistically inserted, write still in flight.
    Pending,
    /// The write failed; the item is retained for retry.
    Failed,
}

/// A quantity with its unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quantity {
    pub value: f64,
    pub unit: String,
}

/// Provenance of an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    /// Source category, e.g. "official", "media", "community".
    pub kind: String,
    /// Human-readable label.
    pub label: String,
}

impl Default for Source {
    fn default() -> Self {
        Self {
            kind: "unknown".to_string(),
            label: String::new(),
        }
    }
}

/// A single feed record.
///
/// Immutable by convention: the store replaces whole items rather than
/// mutating fields in place (the only exception is the client-local
/// `status` flag during publish reconciliation).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedItem {
    /// Globally unique identifier.
    pub id: ItemId,
    /// Creation time; the feed's total order key (descending).
    pub created_at: Timestamp,
    /// Last modification time; the freshness discriminator for
    /// conflicting writes of the same id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<Timestamp>,
    /// Enumerated variant.
    #[serde(rename = "type")]
    pub kind: ItemKind,
    pub sector_id: String,
    /// Nullable geography.
    pub from_province_id: Option<String>,
    pub to_province_id: Option<String>,
    pub mode: TradeMode,
    pub title: String,
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<Quantity>,
    /// 1..=3 when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub urgency: Option<u8>,
    /// 1..=3 when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credibility: Option<u8>,
    /// Ordered list.
    pub tags: Vec<String>,
    pub source: Source,
    /// Present only on client-originated items.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ItemStatus>,
    /// Present only while a publish is pending.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idempotency_key: Option<String>,
}

impl FeedItem {
    /// Whether this item was synthesized locally and not yet confirmed.
    pub fn is_pending(&self) -> bool {
        self.status == Some(ItemStatus::Pending)
    }

    /// Whether a publish of this item failed and awaits a retry.
    pub fn is_failed(&self) -> bool {
        self.status == Some(ItemStatus::Failed)
    }
}
