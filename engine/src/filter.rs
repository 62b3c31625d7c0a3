//! Filter state and the in-memory predicate.
//!
//! `FeedFilters` is an immutable value object; structural equality is what
//! gates refetches. The predicate implements the same semantics the live
//! backend applies server-side, so the offline provider behaves
//! identically.

use crate::{FeedItem, ItemKind, TradeMode};
use serde::{Deserialize, Serialize};

/// Sort order for the feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Newest,
    Oldest,
}

/// The full filter state driving fetches.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedFilters {
    pub from_province: Option<String>,
    pub to_province: Option<String>,
    pub sector: Option<String>,
    pub kind: Option<ItemKind>,
    /// `None` means both directions.
    pub mode: Option<TradeMode>,
    pub sort: SortOrder,
    /// Free-text search.
    pub query: Option<String>,
}

impl FeedFilters {
    /// Whether an item passes this filter.
    ///
    /// Province/sector/kind are equality checks; mode `BOTH` (on either
    /// side) matches everything; the query is a case-insensitive substring
    /// search across title, summary, source label and tags.
    pub fn matches(&self, item: &FeedItem) -> bool {
        if let Some(province) = &self.from_province {
            if item.from_province_id.as_deref() != Some(province.as_str()) {
                return false;
            }
        }
        if let Some(province) = &self.to_province {
            if item.to_province_id.as_deref() != Some(province.as_str()) {
                return false;
            }
        }
        if let Some(sector) = &self.sector {
            if &item.sector_id != sector {
                return false;
            }
        }
        if let Some(kind) = self.kind {
            if item.kind != kind {
                return false;
            }
        }
        if let Some(mode) = self.mode {
            if mode != TradeMode::Both
                && item.mode != TradeMode::Both
                && item.mode != mode
            {
                return false;
            }
        }
        if let Some(query) = &self.query {
            let needle = query.trim().to_lowercase();
            if !needle.is_empty() && !self.query_matches(item, &needle) {
                return false;
            }
        }
        true
    }

    fn query_matches(&self, item: &FeedItem, needle: &str) -> bool {
        item.title.to_lowercase().contains(needle)
            || item.summary.to_lowercase().contains(needle)
            || item.source.label.to_lowercase().contains(needle)
            || item.tags.iter().any(|t| t.to_lowercase().contains(needle))
    }

    /// Sort a slice of items according to the filter's sort order.
    pub fn sort_items(&self, items: &mut [FeedItem]) {
        match self.sort {
            SortOrder::Newest => items.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
            SortOrder::Oldest => items.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
        }
    }

    /// Wire query parameters for the collection fetch.
    ///
    /// An absent `mode` parameter means "both directions", so `BOTH` is
    /// never sent. Empty fields are omitted entirely.
    pub fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(p) = &self.from_province {
            pairs.push(("fromProvince", p.clone()));
        }
        if let Some(p) = &self.to_province {
            pairs.push(("toProvince", p.clone()));
        }
        if let Some(s) = &self.sector {
            pairs.push(("sector", s.clone()));
        }
        if let Some(kind) = self.kind {
            pairs.push(("type", wire_name(&kind)));
        }
        match self.mode {
            Some(TradeMode::Both) | None => {}
            Some(mode) => pairs.push(("mode", wire_name(&mode))),
        }
        if self.sort != SortOrder::default() {
            pairs.push(("sort", wire_name(&self.sort)));
        }
        if let Some(q) = &self.query {
            let q = q.trim();
            if !q.is_empty() {
                pairs.push(("q", q.to_string()));
            }
        }
        pairs
    }
}

/// Serialize an enum to its bare wire name (no quotes).
fn wire_name<T: Serialize>(value: &T) -> String {
    match serde_json::to_value(value) {
        Ok(serde_json::Value::String(s)) => s,
        _ => String::new(),
    }
}
