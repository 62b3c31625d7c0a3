//! Feed state container and reducer.
//!
//! All mutation goes through [`reduce`] with a [`FeedAction`]; dispatch is
//! serialized by the caller. The `revision` counter is bumped only when an
//! action actually changed something, which is the change-detection signal
//! consumers subscribe to.

use crate::{
    normalize_item, EnvelopeKind, Error, EventId, FeedEnvelope, FeedFilters, FeedItem, ItemId,
    ItemStatus, OrderedItems,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

/// Cap on the unseen-ids list.
pub const UNSEEN_CAP: usize = 200;

/// Connection lifecycle state.
///
/// The feed surface cares about the Connected / Reconnecting / Offline
/// subset; the transitional states are reported rather than hidden.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
    /// Terminal when the engine runs in offline/mock mode.
    Offline,
}

/// Snapshot used to hydrate a freshly created state, e.g. from
/// server-side rendering.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedSnapshot {
    pub items: Vec<FeedItem>,
    pub cursor: Option<String>,
    #[serde(default)]
    pub filters: FeedFilters,
}

/// The whole feed state for one client session.
#[derive(Debug, Clone, Default)]
pub struct FeedState {
    /// Ordered sequence plus id index.
    pub items: OrderedItems,
    pub loading: bool,
    pub error: Option<String>,
    /// Opaque pagination token; `None` after a load means exhausted.
    pub cursor: Option<String>,
    pub filters: FeedFilters,
    pub connection: ConnectionStatus,
    /// Temp id -> idempotency key for in-flight publishes.
    pub optimistic: HashMap<ItemId, String>,
    pub onboarding_seen: bool,
    /// Push-inserted ids not yet seen by the user, most-recent-first.
    pub unseen: VecDeque<ItemId>,
    /// Bumped on every effective change.
    pub revision: u64,
}

/// An action dispatched into the reducer.
#[derive(Debug, Clone)]
pub enum FeedAction {
    /// A page fetch started.
    LoadStarted,
    /// A page fetch completed. `append: false` replaces the whole list.
    PageLoaded {
        items: Vec<FeedItem>,
        cursor: Option<String>,
        append: bool,
    },
    /// A page fetch failed.
    LoadFailed(String),
    /// A push-delivered item creation or update.
    ItemUpserted(FeedItem),
    /// A push-delivered deletion.
    ItemDeleted(ItemId),
    /// A push envelope advanced the pagination cursor.
    CursorAdvanced(String),
    /// The filter state changed.
    FiltersChanged(FeedFilters),
    ConnectionChanged(ConnectionStatus),
    /// An optimistic item was inserted ahead of the write request.
    PublishPending(FeedItem),
    /// The server confirmed a publish; the temp item is replaced in place.
    PublishConfirmed { temp_id: ItemId, item: FeedItem },
    /// The publish failed; the temp item is retained as failed.
    PublishFailed { temp_id: ItemId },
    MarkAllSeen,
    OnboardingSeen,
    /// Seed state from a server-rendered snapshot.
    Hydrated(FeedSnapshot),
}

impl FeedAction {
    /// Convert a push envelope into an action, normalizing the payload.
    ///
    /// Deletions only need the id; creations and updates go through the
    /// full normalizer.
    pub fn from_envelope(envelope: FeedEnvelope) -> crate::error::Result<Self> {
        match envelope.kind {
            EnvelopeKind::Created | EnvelopeKind::Updated => {
                Ok(FeedAction::ItemUpserted(normalize_item(envelope.payload)?))
            }
            EnvelopeKind::Deleted => {
                let id = envelope
                    .payload
                    .get("id")
                    .and_then(|v| v.as_str())
                    .filter(|s| !s.is_empty())
                    .ok_or(Error::MissingField("id"))?;
                Ok(FeedAction::ItemDeleted(id.to_string()))
            }
        }
    }

    /// The delivery id carried by an envelope, preferring the envelope's
    /// own `eventId` over the transport-level id.
    pub fn delivery_id(envelope: &FeedEnvelope, transport_id: Option<&str>) -> Option<EventId> {
        envelope
            .event_id
            .clone()
            .or_else(|| transport_id.map(str::to_string))
    }
}

/// Apply an action to the state. Returns `true` iff anything changed;
/// `revision` is bumped accordingly.
pub fn reduce(state: &mut FeedState, action: FeedAction) -> bool {
    let changed = match action {
        FeedAction::LoadStarted => {
            let changed = !state.loading || state.error.is_some();
            state.loading = true;
            state.error = None;
            changed
        }
        FeedAction::PageLoaded {
            items,
            cursor,
            append,
        } => {
            state.loading = false;
            state.error = None;
            if append {
                // Push events may already have inserted some of these ids;
                // merge rather than concatenate.
                let merged = state.items.apply_batch(items);
                let cursor_moved = state.cursor != cursor;
                state.cursor = cursor;
                merged || cursor_moved
            } else {
                state.items = OrderedItems::from_batch(items);
                state.cursor = cursor;
                state.unseen.clear();
                true
            }
        }
        FeedAction::LoadFailed(message) => {
            state.loading = false;
            state.error = Some(message);
            true
        }
        FeedAction::ItemUpserted(item) => {
            let id = item.id.clone();
            let was_present = state.items.contains(&id);
            let changed = state.items.apply_batch(vec![item]);
            if changed && !was_present {
                push_unseen(state, id);
            }
            changed
        }
        FeedAction::ItemDeleted(id) => {
            let removed = state.items.remove(&id);
            if removed {
                state.unseen.retain(|unseen| unseen != &id);
            }
            removed
        }
        FeedAction::CursorAdvanced(cursor) => {
            if state.cursor.as_deref() == Some(cursor.as_str()) {
                false
            } else {
                state.cursor = Some(cursor);
                true
            }
        }
        FeedAction::FiltersChanged(filters) => {
            if state.filters == filters {
                false
            } else {
                state.filters = filters;
                state.cursor = None;
                true
            }
        }
        FeedAction::ConnectionChanged(status) => {
            if state.connection == status {
                false
            } else {
                state.connection = status;
                true
            }
        }
        FeedAction::PublishPending(item) => {
            if let Some(key) = &item.idempotency_key {
                state.optimistic.insert(item.id.clone(), key.clone());
            }
            state.items.apply_batch(vec![item])
        }
        FeedAction::PublishConfirmed { temp_id, item } => {
            let mut item = item;
            item.status = Some(ItemStatus::Confirmed);
            item.idempotency_key = None;
            let replaced = state.items.replace_unconditional(&temp_id, item);
            state.optimistic.remove(&temp_id);
            replaced
        }
        FeedAction::PublishFailed { temp_id } => {
            let marked = state.items.set_status(&temp_id, ItemStatus::Failed);
            state.optimistic.remove(&temp_id);
            marked
        }
        FeedAction::MarkAllSeen => {
            if state.unseen.is_empty() {
                false
            } else {
                state.unseen.clear();
                true
            }
        }
        FeedAction::OnboardingSeen => {
            let changed = !state.onboarding_seen;
            state.onboarding_seen = true;
            changed
        }
        FeedAction::Hydrated(snapshot) => {
            state.items = OrderedItems::from_batch(snapshot.items);
            state.cursor = snapshot.cursor;
            state.filters = snapshot.filters;
            true
        }
    };

    if changed {
        state.revision += 1;
    }
    changed
}

fn push_unseen(state: &mut FeedState, id: ItemId) {
    state.unseen.retain(|unseen| unseen != &id);
    state.unseen.push_front(id);
    state.unseen.truncate(UNSEEN_CAP);
}
