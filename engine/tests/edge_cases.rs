//! Edge case and property tests for tradewire-engine.
//!
//! Covers the merge ordering invariant, idempotent envelope application,
//! the freshness guard, and the combined load-then-push scenario.

use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;
use serde_json::json;
use tradewire_engine::{
    reduce, DeliveryWindow, FeedAction, FeedEnvelope, FeedItem, FeedState, ItemKind, OrderedItems,
    Source, TradeMode,
};

fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 15, 0, 0, 0).unwrap()
}

fn item(id: &str, created_min: i64, updated_min: Option<i64>) -> FeedItem {
    FeedItem {
        id: id.into(),
        created_at: base_time() + Duration::minutes(created_min),
        updated_at: updated_min.map(|m| base_time() + Duration::minutes(m)),
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

fn assert_invariants(store: &OrderedItems) {
    let items = store.items();
    for pair in items.windows(2) {
        assert!(
            pair[0].created_at >= pair[1].created_at,
            "order violated between {} and {}",
            pair[0].id,
            pair[1].id
        );
    }
    for (pos, it) in items.iter().enumerate() {
        assert_eq!(store.position(&it.id), Some(pos), "index drift for {}", it.id);
    }
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn dedup_across_load_and_push() {
    // Load [a@T1 updated T1, b@T2], then push-update a with T1+1h.
    let mut store = OrderedItems::new();
    store.apply_batch(vec![item("a", 0, Some(0)), item("b", 60, None)]);

    let mut update = item("a", 0, Some(60));
    update.summary = "updated content".into();
    assert!(store.apply_batch(vec![update]));

    let ids: Vec<_> = store.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, vec!["b", "a"]);
    assert_eq!(store.get("a").unwrap().summary, "updated content");
    assert_invariants(&store);
}

#[test]
fn same_event_id_applies_exactly_once() {
    let mut state = FeedState::default();
    let mut window = DeliveryWindow::default();

    let envelope = FeedEnvelope {
        event_id: Some("ev-1".into()),
        kind: tradewire_engine::EnvelopeKind::Created,
        payload: json!({
            "id": "a",
            "createdAt": "2026-01-15T09:00:00Z",
            "type": "OFFER"
        }),
        cursor: None,
    };

    for _ in 0..2 {
        let delivery = FeedAction::delivery_id(&envelope, None);
        let fresh = delivery
            .map(|id| window.observe(&id))
            .unwrap_or(true);
        if fresh {
            let action = FeedAction::from_envelope(envelope.clone()).unwrap();
            reduce(&mut state, action);
        }
    }

    assert_eq!(state.items.len(), 1);
    assert_eq!(state.revision, 1);
}

#[test]
fn freshness_guard_rejects_old_updates() {
    let mut store = OrderedItems::new();
    store.apply_batch(vec![item("a", 0, Some(30))]);

    // Older and equal updated_at are both rejected.
    assert!(!store.apply_batch(vec![item("a", 0, Some(10))]));
    assert!(!store.apply_batch(vec![item("a", 0, Some(30))]));
    // A strictly newer one wins.
    assert!(store.apply_batch(vec![item("a", 0, Some(31))]));
}

#[test]
fn interleaved_pages_and_pushes_keep_invariants() {
    let mut state = FeedState::default();

    reduce(
        &mut state,
        FeedAction::PageLoaded {
            items: vec![item("a", 100, None), item("b", 90, None)],
            cursor: Some("c-1".into()),
            append: false,
        },
    );

    // Push arrives between pages and also appears in page two.
    reduce(&mut state, FeedAction::ItemUpserted(item("c", 95, Some(95))));
    reduce(
        &mut state,
        FeedAction::PageLoaded {
            items: vec![item("c", 95, None), item("d", 80, None)],
            cursor: None,
            append: true,
        },
    );

    assert_eq!(state.items.len(), 4);
    let ids: Vec<_> = state.items.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "c", "b", "d"]);
    assert_invariants(&state.items);
}

// ============================================================================
// Properties
// ============================================================================

prop_compose! {
    fn arb_item()(
        id in 0usize..12,
        created in 0i64..240,
        updated in proptest::option::of(0i64..240),
    ) -> FeedItem {
        item(&format!("item-{id}"), created, updated)
    }
}

proptest! {
    #[test]
    fn merge_preserves_order_and_index(batches in prop::collection::vec(
        prop::collection::vec(arb_item(), 0..8),
        0..12,
    )) {
        let mut store = OrderedItems::new();
        for batch in batches {
            store.apply_batch(batch);
            assert_invariants(&store);
        }
    }

    #[test]
    fn apply_batch_is_idempotent(batch in prop::collection::vec(arb_item(), 0..10)) {
        let mut store = OrderedItems::new();
        store.apply_batch(batch.clone());
        let snapshot: Vec<_> = store.items().to_vec();

        // Replaying the exact same batch must be a no-op.
        let changed = store.apply_batch(batch);
        prop_assert!(!changed);
        prop_assert_eq!(store.items(), snapshot.as_slice());
    }

    #[test]
    fn removal_keeps_index_consistent(
        batch in prop::collection::vec(arb_item(), 1..10),
        victim in 0usize..12,
    ) {
        let mut store = OrderedItems::new();
        store.apply_batch(batch);
        store.remove(&format!("item-{victim}"));
        assert_invariants(&store);
    }
}
