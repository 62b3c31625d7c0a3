//! The feed session: one user-facing handle over state, providers and
//! the stream connection.
//!
//! State mutates only through the engine reducer; the session serializes
//! dispatch behind a mutex and publishes the revision counter through a
//! watch channel. Locks are never held across awaits.

use crate::analytics::{AnalyticsSink, NoopSink};
use crate::backend::{Backend, OfflineBackend};
use crate::config::EngineConfig;
use crate::connection::{ConnectionManager, StreamEvent};
use crate::error::Result;
use serde_json::json;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{mpsc, watch};
use tradewire_engine::{
    reduce, ConnectionStatus, FeedAction, FeedDraft, FeedFilters, FeedItem, FeedSnapshot,
    FeedState, ItemId, ItemStatus, ValidationReport,
};
use uuid::Uuid;

/// Result of a publish attempt.
#[derive(Debug)]
pub enum PublishOutcome {
    /// Validation failed locally; nothing was dispatched or sent.
    Invalid(ValidationReport),
    /// The server (or offline provider) confirmed the item.
    Published(FeedItem),
    /// The write failed; the optimistic item is retained as failed
    /// under `temp_id`.
    Failed { temp_id: ItemId, message: String },
}

/// A live feed session.
///
/// Cheap to share behind an [`Arc`]; all methods take `&self`.
pub struct FeedSession {
    config: EngineConfig,
    state: Mutex<FeedState>,
    revision: watch::Sender<u64>,
    backend: Backend,
    /// Fixture provider used for direct-lookup fallback.
    fallback: OfflineBackend,
    analytics: Box<dyn AnalyticsSink>,
    /// Bumped on filter changes to invalidate in-flight page loads.
    generation: AtomicU64,
    cancelled: AtomicBool,
    connection: Mutex<Option<ConnectionManager>>,
}

impl FeedSession {
    pub fn new(config: EngineConfig) -> Result<Self> {
        Self::with_analytics(config, Box::new(NoopSink))
    }

    pub fn with_analytics(
        config: EngineConfig,
        analytics: Box<dyn AnalyticsSink>,
    ) -> Result<Self> {
        let backend = Backend::from_config(&config)?;
        let fallback = OfflineBackend::new(config.page_size)?;
        let (revision, _) = watch::channel(0);
        Ok(Self {
            config,
            state: Mutex::new(FeedState::default()),
            revision,
            backend,
            fallback,
            analytics,
            generation: AtomicU64::new(0),
            cancelled: AtomicBool::new(false),
            connection: Mutex::new(None),
        })
    }

    /// Read the current state under the lock.
    pub fn with_state<T>(&self, f: impl FnOnce(&FeedState) -> T) -> T {
        f(&self.lock_state())
    }

    /// Subscribe to the revision counter; it moves exactly when state
    /// changes.
    pub fn revision(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    /// Dispatch an action through the reducer. Returns `true` iff the
    /// state changed.
    pub fn dispatch(&self, action: FeedAction) -> bool {
        let revision = {
            let mut state = self.lock_state();
            if !reduce(&mut state, action) {
                return false;
            }
            state.revision
        };
        self.revision.send_replace(revision);
        true
    }

    /// Load the first page for the current filters, replacing the list.
    pub async fn load_initial(&self) -> Result<()> {
        let generation = self.generation.load(Ordering::SeqCst);
        let filters = self.with_state(|s| s.filters.clone());
        self.dispatch(FeedAction::LoadStarted);

        match self.backend.fetch_page(&filters, None).await {
            Ok(page) => {
                if self.is_stale(generation) {
                    return Ok(());
                }
                let count = page.items.len();
                self.dispatch(FeedAction::PageLoaded {
                    items: page.items,
                    cursor: page.cursor,
                    append: false,
                });
                self.analytics
                    .emit("feed_page_loaded", json!({"count": count, "append": false}));
                Ok(())
            }
            Err(e) => {
                if !self.is_stale(generation) {
                    self.dispatch(FeedAction::LoadFailed(e.user_message()));
                }
                Err(e)
            }
        }
    }

    /// Load the next page. Returns `Ok(false)` without fetching when the
    /// collection is exhausted or a load is already in flight.
    pub async fn load_more(&self) -> Result<bool> {
        let generation = self.generation.load(Ordering::SeqCst);
        let (filters, cursor, loading) =
            self.with_state(|s| (s.filters.clone(), s.cursor.clone(), s.loading));
        let Some(cursor) = cursor else {
            return Ok(false);
        };
        if loading {
            return Ok(false);
        }
        self.dispatch(FeedAction::LoadStarted);

        match self.backend.fetch_page(&filters, Some(&cursor)).await {
            Ok(page) => {
                if self.is_stale(generation) {
                    return Ok(false);
                }
                let count = page.items.len();
                self.dispatch(FeedAction::PageLoaded {
                    items: page.items,
                    cursor: page.cursor,
                    append: true,
                });
                self.analytics
                    .emit("feed_page_loaded", json!({"count": count, "append": true}));
                Ok(true)
            }
            Err(e) => {
                if !self.is_stale(generation) {
                    self.dispatch(FeedAction::LoadFailed(e.user_message()));
                }
                Err(e)
            }
        }
    }

    /// Replace the filters and refetch from the first page.
    ///
    /// Structurally equal filters are a no-op: no dispatch, no fetch.
    pub async fn set_filters(&self, filters: FeedFilters) -> Result<()> {
        if !self.dispatch(FeedAction::FiltersChanged(filters)) {
            return Ok(());
        }
        self.analytics.emit("feed_filters_changed", json!({}));
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.load_initial().await
    }

    /// Validate and publish a draft with optimistic insertion.
    pub async fn publish(&self, draft: &FeedDraft) -> PublishOutcome {
        let normalized = match draft.validate() {
            Ok(normalized) => normalized,
            Err(report) => return PublishOutcome::Invalid(report),
        };

        let key = Uuid::new_v4().to_string();
        let pending = normalized.into_pending_item(&key, chrono::Utc::now());
        let temp_id = pending.id.clone();
        self.dispatch(FeedAction::PublishPending(pending));

        match self.backend.publish(&normalized, &key).await {
            Ok(item) => {
                // Mirror the reducer's reconciliation so the caller sees
                // the same shape the store holds.
                let mut published = item.clone();
                published.status = Some(ItemStatus::Confirmed);
                published.idempotency_key = None;
                self.dispatch(FeedAction::PublishConfirmed { temp_id, item });
                self.analytics
                    .emit("feed_publish_confirmed", json!({"id": published.id}));
                PublishOutcome::Published(published)
            }
            Err(e) => {
                self.dispatch(FeedAction::PublishFailed {
                    temp_id: temp_id.clone(),
                });
                self.analytics
                    .emit("feed_publish_failed", json!({"tempId": temp_id}));
                PublishOutcome::Failed {
                    temp_id,
                    message: e.user_message(),
                }
            }
        }
    }

    /// Look an item up: store first, then the provider, then the offline
    /// fixture when the provider is unreachable or denies access.
    pub async fn find_by_id(&self, id: &str) -> Result<FeedItem> {
        if let Some(item) = self.with_state(|s| s.items.get(id).cloned()) {
            return Ok(item);
        }
        match self.backend.fetch_by_id(id).await {
            Ok(item) => Ok(item),
            Err(e) if e.is_fallback_eligible() && !self.backend.is_offline() => {
                tracing::debug!(error = %e, id, "direct lookup failed, trying fixture");
                self.fallback.fetch_by_id(id).await
            }
            Err(e) => Err(e),
        }
    }

    /// Apply a push envelope to the state. Returns `true` iff it changed
    /// anything; malformed payloads surface as engine errors.
    ///
    /// An envelope carrying a cursor also advances the pagination cursor.
    pub fn ingest_envelope(&self, envelope: tradewire_engine::FeedEnvelope) -> Result<bool> {
        let cursor = envelope.cursor.clone();
        let action = FeedAction::from_envelope(envelope)?;
        let mut changed = self.dispatch(action);
        if let Some(cursor) = cursor {
            changed |= self.dispatch(FeedAction::CursorAdvanced(cursor));
        }
        Ok(changed)
    }

    /// Seed state from a pre-rendered snapshot.
    pub fn hydrate(&self, snapshot: FeedSnapshot) {
        self.dispatch(FeedAction::Hydrated(snapshot));
    }

    pub fn mark_all_seen(&self) {
        self.dispatch(FeedAction::MarkAllSeen);
    }

    pub fn mark_onboarding_seen(&self) {
        self.dispatch(FeedAction::OnboardingSeen);
    }

    /// Start the stream connection. Idempotent.
    pub fn connect(self: &Arc<Self>) {
        let mut guard = self.lock_connection();
        if guard.is_some() {
            return;
        }
        let (tx, rx) = mpsc::unbounded_channel();
        let manager = ConnectionManager::spawn(self.config.clone(), tx);
        tokio::spawn(Self::track_status(Arc::clone(self), manager.status()));
        tokio::spawn(Self::ingest(Arc::clone(self), rx));
        *guard = Some(manager);
    }

    /// Ask the connection to reconnect now, skipping backoff. Called when
    /// the host signals regained network access.
    pub fn refresh_connection(&self) {
        if let Some(manager) = self.lock_connection().as_ref() {
            manager.refresh();
        }
    }

    /// Stop the session: the connection task is aborted and late
    /// responses from in-flight loads are discarded.
    pub fn shutdown(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        if let Some(manager) = self.lock_connection().take() {
            manager.shutdown();
        }
    }

    /// Mirror connection status changes into the state.
    async fn track_status(session: Arc<Self>, mut status: watch::Receiver<ConnectionStatus>) {
        loop {
            let current = *status.borrow_and_update();
            session.dispatch(FeedAction::ConnectionChanged(current));
            if status.changed().await.is_err() {
                break;
            }
        }
    }

    /// Apply stream events to the state. A `Restored` heals the gap the
    /// outage left by refetching the first page.
    async fn ingest(session: Arc<Self>, mut events: mpsc::UnboundedReceiver<StreamEvent>) {
        while let Some(event) = events.recv().await {
            if session.cancelled.load(Ordering::SeqCst) {
                break;
            }
            match event {
                StreamEvent::Envelope(envelope) => {
                    if let Err(e) = session.ingest_envelope(envelope) {
                        tracing::warn!(error = %e, "dropping invalid envelope");
                    }
                }
                StreamEvent::Lost => {
                    // Status mirroring covers the user-visible side.
                }
                StreamEvent::Restored => {
                    if let Err(e) = session.load_initial().await {
                        tracing::warn!(error = %e, "catch-up refetch failed");
                    }
                }
            }
        }
    }

    fn is_stale(&self, generation: u64) -> bool {
        self.cancelled.load(Ordering::SeqCst)
            || generation != self.generation.load(Ordering::SeqCst)
    }

    fn lock_state(&self) -> MutexGuard<'_, FeedState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_connection(&self) -> MutexGuard<'_, Option<ConnectionManager>> {
        self.connection
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for FeedSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedSession")
            .field("offline", &self.backend.is_offline())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tradewire_engine::EnvelopeKind;

    fn offline_session() -> FeedSession {
        FeedSession::new(EngineConfig::offline()).unwrap()
    }

    #[tokio::test]
    async fn revision_watch_moves_with_dispatch() {
        let session = offline_session();
        let rx = session.revision();
        assert_eq!(*rx.borrow(), 0);

        session.load_initial().await.unwrap();
        assert!(*rx.borrow() > 0);
        assert!(session.with_state(|s| !s.items.is_empty()));
    }

    #[tokio::test]
    async fn push_envelope_flows_through_dispatch() {
        let session = offline_session();
        let envelope = serde_json::from_value::<tradewire_engine::FeedEnvelope>(
            serde_json::json!({
                "eventId": "ev-1",
                "type": "item.created",
                "payload": {
                    "id": "pushed-1",
                    "createdAt": "2026-02-11T09:00:00Z",
                    "type": "ALERT",
                    "title": "Pushed alert",
                },
                "cursor": "push-c-1",
            }),
        )
        .unwrap();
        assert_eq!(envelope.kind, EnvelopeKind::Created);

        assert!(session.ingest_envelope(envelope).unwrap());
        assert!(session.with_state(|s| s.items.contains("pushed-1")));
        // The envelope's cursor advanced the pagination cursor.
        assert_eq!(
            session.with_state(|s| s.cursor.clone()).as_deref(),
            Some("push-c-1")
        );
        assert_eq!(session.with_state(|s| s.unseen.clone()), vec!["pushed-1"]);

        session.mark_all_seen();
        assert!(session.with_state(|s| s.unseen.is_empty()));
    }

    #[tokio::test]
    async fn hydrate_then_load_merges() {
        let session = offline_session();
        session.load_initial().await.unwrap();
        let snapshot = session.with_state(|s| FeedSnapshot {
            items: s.items.items().to_vec(),
            cursor: s.cursor.clone(),
            filters: s.filters.clone(),
        });

        let restored = offline_session();
        restored.hydrate(snapshot);
        assert_eq!(
            restored.with_state(|s| s.items.len()),
            session.with_state(|s| s.items.len())
        );
    }
}
