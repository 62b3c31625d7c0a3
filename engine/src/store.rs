//! Ordered merge store - the authoritative in-memory feed sequence.
//!
//! Items are kept newest-first by `created_at`, ties broken by insertion
//! order (stable). An id-to-position index is kept consistent with the
//! sequence at all times.

use crate::{FeedItem, ItemId, ItemStatus};
use std::collections::HashMap;

/// The ordered feed sequence plus its id index.
#[derive(Debug, Clone, Default)]
pub struct OrderedItems {
    items: Vec<FeedItem>,
    index: HashMap<ItemId, usize>,
}

/// Whether `incoming` should replace `existing` for the same id.
///
/// `updated_at` is the freshness discriminator. An incoming item with no
/// `updated_at` never overwrites an existing record; creation-only events
/// must not clobber later updates.
fn should_replace(existing: &FeedItem, incoming: &FeedItem) -> bool {
    match (incoming.updated_at, existing.updated_at) {
        (None, _) => false,
        (Some(_), None) => true,
        (Some(inc), Some(ex)) => inc > ex,
    }
}

impl OrderedItems {
    /// Create an empty sequence.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a sequence from a batch, applying the usual merge rules.
    pub fn from_batch(incoming: Vec<FeedItem>) -> Self {
        let mut items = Self::new();
        items.apply_batch(incoming);
        items
    }

    /// Merge a batch of incoming items into the sequence.
    ///
    /// Returns `true` iff anything changed; callers use this as the cheap
    /// "did anything change" signal.
    pub fn apply_batch(&mut self, incoming: Vec<FeedItem>) -> bool {
        // Dedup the batch by id first. A later duplicate wins only if it
        // would replace the earlier one under the freshness rule.
        let mut deduped: Vec<FeedItem> = Vec::with_capacity(incoming.len());
        let mut batch_index: HashMap<ItemId, usize> = HashMap::new();
        for item in incoming {
            match batch_index.get(&item.id) {
                Some(&pos) => {
                    if should_replace(&deduped[pos], &item) {
                        deduped[pos] = item;
                    }
                }
                None => {
                    batch_index.insert(item.id.clone(), deduped.len());
                    deduped.push(item);
                }
            }
        }

        let mut changed = false;
        let mut structural = false;

        for item in deduped {
            match self.index.get(&item.id).copied() {
                None => {
                    let at = self.insert_position(&item);
                    self.items.insert(at, item);
                    changed = true;
                    structural = true;
                }
                Some(pos) => {
                    if !should_replace(&self.items[pos], &item) {
                        continue;
                    }
                    if self.items[pos].created_at == item.created_at {
                        self.items[pos] = item;
                    } else {
                        // The order key moved; remove then reinsert.
                        self.items.remove(pos);
                        self.rebuild_index();
                        let at = self.insert_position(&item);
                        self.items.insert(at, item);
                        structural = true;
                    }
                    changed = true;
                }
            }
            if structural {
                self.rebuild_index();
                structural = false;
            }
        }

        changed
    }

    /// Remove an item by id. Returns `true` if it was present.
    pub fn remove(&mut self, id: &str) -> bool {
        match self.index.get(id).copied() {
            Some(pos) => {
                self.items.remove(pos);
                self.rebuild_index();
                true
            }
            None => false,
        }
    }

    /// Replace `old_id` with `item` unconditionally, ignoring freshness.
    ///
    /// Used for optimistic publish reconciliation, which is a local
    /// bookkeeping step rather than a remote update. Repositions when the
    /// order key differs. Returns `false` when `old_id` is absent.
    pub fn replace_unconditional(&mut self, old_id: &str, item: FeedItem) -> bool {
        let Some(pos) = self.index.get(old_id).copied() else {
            return false;
        };
        if self.items[pos].created_at == item.created_at {
            self.items[pos] = item;
            self.rebuild_index();
        } else {
            self.items.remove(pos);
            self.rebuild_index();
            let at = self.insert_position(&item);
            self.items.insert(at, item);
            self.rebuild_index();
        }
        true
    }

    /// Set the client-local status flag of an item in place.
    ///
    /// The order key is untouched, so the index stays valid.
    pub fn set_status(&mut self, id: &str, status: ItemStatus) -> bool {
        match self.index.get(id).copied() {
            Some(pos) => {
                self.items[pos].status = Some(status);
                true
            }
            None => false,
        }
    }

    /// Get an item by id.
    pub fn get(&self, id: &str) -> Option<&FeedItem> {
        self.index.get(id).map(|&pos| &self.items[pos])
    }

    /// Current position of an item.
    pub fn position(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    /// Whether an id is present.
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// The ordered sequence, newest-first.
    pub fn items(&self) -> &[FeedItem] {
        &self.items
    }

    /// Iterate the sequence in order.
    pub fn iter(&self) -> impl Iterator<Item = &FeedItem> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Insertion point maintaining descending `created_at` with stable
    /// ties: a new item lands after the existing run of equal keys.
    fn insert_position(&self, item: &FeedItem) -> usize {
        self.items
            .partition_point(|existing| existing.created_at >= item.created_at)
    }

    fn rebuild_index(&mut self) {
        self.index.clear();
        for (pos, item) in self.items.iter().enumerate() {
            self.index.insert(item.id.clone(), pos);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ItemKind, Source, TradeMode};
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn ts(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 15, hour, 0, 0).unwrap()
    }

    fn item(id: &str, created: DateTime<Utc>, updated: Option<DateTime<Utc>>) -> FeedItem {
        FeedItem {
            id: id.into(),
            created_at: created,
            updated_at: updated,
            kind: ItemKind::Offer,
            sector_id: "general".into(),
            from_province_id: None,
            to_province_id: None,
            mode: TradeMode::Both,
            title: format!("title {id}"),
            summary: format!("summary {id}"),
            quantity: None,
            urgency: None,
            credibility: None,
            tags: Vec::new(),
            source: Source::default(),
            status: None,
            idempotency_key: None,
        }
    }

    fn ids(store: &OrderedItems) -> Vec<&str> {
        store.iter().map(|i| i.id.as_str()).collect()
    }

    fn assert_index_consistent(store: &OrderedItems) {
        for (pos, it) in store.items().iter().enumerate() {
            assert_eq!(store.position(&it.id), Some(pos), "index drift for {}", it.id);
        }
        assert_eq!(store.len(), store.items().len());
    }

    #[test]
    fn inserts_newest_first() {
        let mut store = OrderedItems::new();
        assert!(store.apply_batch(vec![
            item("a", ts(9), None),
            item("b", ts(11), None),
            item("c", ts(10), None),
        ]));

        assert_eq!(ids(&store), vec!["b", "c", "a"]);
        assert_index_consistent(&store);
    }

    #[test]
    fn equal_created_at_is_stable() {
        let mut store = OrderedItems::new();
        store.apply_batch(vec![item("first", ts(10), None)]);
        store.apply_batch(vec![item("second", ts(10), None)]);
        store.apply_batch(vec![item("third", ts(10), None)]);

        assert_eq!(ids(&store), vec!["first", "second", "third"]);
        assert_index_consistent(&store);
    }

    #[test]
    fn freshness_guard_rejects_stale_and_equal() {
        let mut store = OrderedItems::new();
        let t = ts(10);
        let mut original = item("a", ts(9), Some(t));
        original.title = "current".into();
        store.apply_batch(vec![original]);

        // Equal updated_at: rejected.
        let mut equal = item("a", ts(9), Some(t));
        equal.title = "equal".into();
        assert!(!store.apply_batch(vec![equal]));
        assert_eq!(store.get("a").unwrap().title, "current");

        // Older updated_at: rejected.
        let mut older = item("a", ts(9), Some(t - Duration::hours(1)));
        older.title = "older".into();
        assert!(!store.apply_batch(vec![older]));
        assert_eq!(store.get("a").unwrap().title, "current");

        // Newer updated_at: accepted.
        let mut newer = item("a", ts(9), Some(t + Duration::hours(1)));
        newer.title = "newer".into();
        assert!(store.apply_batch(vec![newer]));
        assert_eq!(store.get("a").unwrap().title, "newer");
    }

    #[test]
    fn missing_updated_at_never_overwrites() {
        let mut store = OrderedItems::new();
        store.apply_batch(vec![item("a", ts(9), Some(ts(10)))]);

        let mut create_event = item("a", ts(9), None);
        create_event.title = "stale create".into();
        assert!(!store.apply_batch(vec![create_event]));
        assert_eq!(store.get("a").unwrap().title, "title a");

        // But it does overwrite a record that never had updated_at.
        let mut store2 = OrderedItems::new();
        store2.apply_batch(vec![item("b", ts(9), None)]);
        let with_update = item("b", ts(9), Some(ts(10)));
        assert!(store2.apply_batch(vec![with_update]));
    }

    #[test]
    fn changed_created_at_repositions() {
        let mut store = OrderedItems::new();
        store.apply_batch(vec![
            item("a", ts(9), Some(ts(9))),
            item("b", ts(11), None),
        ]);
        assert_eq!(ids(&store), vec!["b", "a"]);

        // a moves to the top: newer created_at, fresher updated_at.
        let moved = item("a", ts(12), Some(ts(12)));
        assert!(store.apply_batch(vec![moved]));
        assert_eq!(ids(&store), vec!["a", "b"]);
        assert_index_consistent(&store);
    }

    #[test]
    fn batch_internal_dedup_keeps_freshest() {
        let mut store = OrderedItems::new();
        let mut stale = item("a", ts(9), Some(ts(9)));
        stale.title = "stale".into();
        let mut fresh = item("a", ts(9), Some(ts(10)));
        fresh.title = "fresh".into();

        store.apply_batch(vec![stale, fresh]);
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("a").unwrap().title, "fresh");
    }

    #[test]
    fn batch_internal_dedup_keeps_first_when_later_is_stale() {
        let mut store = OrderedItems::new();
        let mut first = item("a", ts(9), Some(ts(10)));
        first.title = "first".into();
        let mut later = item("a", ts(9), None);
        later.title = "later".into();

        store.apply_batch(vec![first, later]);
        assert_eq!(store.get("a").unwrap().title, "first");
    }

    #[test]
    fn unchanged_batch_reports_no_change() {
        let mut store = OrderedItems::new();
        store.apply_batch(vec![item("a", ts(9), Some(ts(9)))]);

        let same = item("a", ts(9), Some(ts(9)));
        assert!(!store.apply_batch(vec![same]));
        assert!(!store.apply_batch(Vec::new()));
    }

    #[test]
    fn remove_rebuilds_index() {
        let mut store = OrderedItems::new();
        store.apply_batch(vec![
            item("a", ts(9), None),
            item("b", ts(10), None),
            item("c", ts(11), None),
        ]);

        assert!(store.remove("b"));
        assert!(!store.remove("b"));
        assert_eq!(ids(&store), vec!["c", "a"]);
        assert!(!store.contains("b"));
        assert_index_consistent(&store);
    }

    #[test]
    fn replace_unconditional_ignores_freshness() {
        let mut store = OrderedItems::new();
        store.apply_batch(vec![item("optimistic-1", ts(10), Some(ts(10)))]);

        // Server-confirmed item has no updated_at but must still win.
        let confirmed = item("srv-1", ts(10), None);
        assert!(store.replace_unconditional("optimistic-1", confirmed));
        assert!(!store.contains("optimistic-1"));
        assert_eq!(store.get("srv-1").unwrap().id, "srv-1");
        assert_index_consistent(&store);
    }

    #[test]
    fn replace_unconditional_repositions_on_new_key() {
        let mut store = OrderedItems::new();
        store.apply_batch(vec![
            item("a", ts(9), None),
            item("temp", ts(10), None),
            item("c", ts(11), None),
        ]);

        let confirmed = item("srv", ts(12), None);
        store.replace_unconditional("temp", confirmed);
        assert_eq!(ids(&store), vec!["srv", "c", "a"]);
        assert_index_consistent(&store);
    }

    #[test]
    fn replace_unconditional_missing_id() {
        let mut store = OrderedItems::new();
        assert!(!store.replace_unconditional("ghost", item("a", ts(9), None)));
    }

    #[test]
    fn set_status_in_place() {
        let mut store = OrderedItems::new();
        store.apply_batch(vec![item("a", ts(9), None)]);

        assert!(store.set_status("a", ItemStatus::Failed));
        assert!(store.get("a").unwrap().is_failed());
        assert!(!store.set_status("ghost", ItemStatus::Failed));
        assert_index_consistent(&store);
    }

    #[test]
    fn load_then_push_update_scenario() {
        // Load [a@T1, b@T2], then a push-update for a arrives with T1+1h.
        let mut store = OrderedItems::new();
        store.apply_batch(vec![
            item("a", ts(9), Some(ts(9))),
            item("b", ts(10), None),
        ]);

        let mut update = item("a", ts(9), Some(ts(10)));
        update.title = "updated a".into();
        assert!(store.apply_batch(vec![update]));

        assert_eq!(ids(&store), vec!["b", "a"]);
        assert_eq!(store.get("a").unwrap().title, "updated a");
        assert_index_consistent(&store);
    }
}
