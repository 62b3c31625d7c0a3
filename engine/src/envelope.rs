//! Push envelope and the wire normalization boundary.
//!
//! Every ingestion path (stream push, page fetch, offline fixture) goes
//! through [`normalize_item`], so downstream code can assume fully
//! populated records.

use crate::{
    error::Result, Error, EventId, FeedItem, ItemKind, ItemStatus, Quantity, Source, Timestamp,
    TradeMode,
};
use serde::{Deserialize, Serialize};

/// Kind of a push-delivered notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnvelopeKind {
    #[serde(rename = "item.created")]
    Created,
    #[serde(rename = "item.updated")]
    Updated,
    #[serde(rename = "item.deleted")]
    Deleted,
}

/// A single push-delivered transport message.
///
/// `payload` stays raw until normalization; producers are not trusted to
/// send fully populated records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedEnvelope {
    /// Delivery id, used for at-most-once application.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<EventId>,
    #[serde(rename = "type")]
    pub kind: EnvelopeKind,
    pub payload: serde_json::Value,
    /// Optional pagination cursor advance.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
}

/// Loosely typed wire shape; every field the producer may omit is optional.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireItem {
    id: Option<String>,
    created_at: Option<Timestamp>,
    updated_at: Option<Timestamp>,
    #[serde(rename = "type")]
    kind: Option<ItemKind>,
    sector_id: Option<String>,
    from_province_id: Option<String>,
    to_province_id: Option<String>,
    mode: Option<TradeMode>,
    title: Option<String>,
    summary: Option<String>,
    quantity: Option<Quantity>,
    urgency: Option<i64>,
    credibility: Option<i64>,
    tags: Option<Vec<String>>,
    source: Option<Source>,
    status: Option<ItemStatus>,
    idempotency_key: Option<String>,
}

/// Sector assigned when the wire record carries none.
pub const DEFAULT_SECTOR: &str = "general";

fn clamp_rating(value: Option<i64>) -> Option<u8> {
    value.map(|v| v.clamp(1, 3) as u8)
}

/// Parse and validate a wire payload into a canonical [`FeedItem`].
///
/// `id`, `createdAt` and `type` are required; everything else is filled
/// with defaults. Strings are trimmed, ratings clamped to 1..=3.
pub fn normalize_item(value: serde_json::Value) -> Result<FeedItem> {
    let wire: WireItem =
        serde_json::from_value(value).map_err(|e| Error::InvalidPayload(e.to_string()))?;

    let id = match wire.id {
        Some(id) if !id.trim().is_empty() => id.trim().to_string(),
        _ => return Err(Error::MissingField("id")),
    };
    let created_at = wire.created_at.ok_or(Error::MissingField("createdAt"))?;
    let kind = wire.kind.ok_or(Error::MissingField("type"))?;

    let tags = wire
        .tags
        .unwrap_or_default()
        .into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();

    Ok(FeedItem {
        id,
        created_at,
        updated_at: wire.updated_at,
        kind,
        sector_id: wire
            .sector_id
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_SECTOR.to_string()),
        from_province_id: wire.from_province_id.filter(|s| !s.is_empty()),
        to_province_id: wire.to_province_id.filter(|s| !s.is_empty()),
        mode: wire.mode.unwrap_or_default(),
        title: wire.title.map(|s| s.trim().to_string()).unwrap_or_default(),
        summary: wire
            .summary
            .map(|s| s.trim().to_string())
            .unwrap_or_default(),
        quantity: wire.quantity,
        urgency: clamp_rating(wire.urgency),
        credibility: clamp_rating(wire.credibility),
        tags,
        source: wire.source.unwrap_or_default(),
        status: wire.status,
        idempotency_key: wire.idempotency_key,
    })
}

/// Normalize a wire value that is either a bare record, a list of records,
/// or absent. Used for the `{ data: item | items }` pull response shape.
pub fn normalize_items(value: serde_json::Value) -> Result<Vec<FeedItem>> {
    match value {
        serde_json::Value::Array(values) => values.into_iter().map(normalize_item).collect(),
        serde_json::Value::Null => Ok(Vec::new()),
        other => Ok(vec![normalize_item(other)?]),
    }
}
