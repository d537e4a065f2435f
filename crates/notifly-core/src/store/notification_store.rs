// ── Notification store ──
//
// Listens on the EventBus and keeps the bounded cache current. The cache is
// published through a `watch` channel: readers borrow or subscribe, and the
// store is its only writer.

use std::sync::{Arc, Mutex, PoisonError, Weak};

use tokio::sync::watch;

use crate::bus::{EventBus, ListenerId};
use crate::model::{Notification, NotificationId};
use crate::stream::Subscription;

use super::cache::CacheSnapshot;

/// Client-side cache of recent notifications.
///
/// Cheaply cloneable; clones share state.
#[derive(Clone)]
pub struct NotificationStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    state: watch::Sender<CacheSnapshot>,
    bus: EventBus,
    listener: Mutex<Option<ListenerId>>,
}

impl Drop for StoreInner {
    fn drop(&mut self) {
        let slot = self.listener.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(id) = slot.take() {
            self.bus.unsubscribe(id);
        }
    }
}

impl std::fmt::Debug for NotificationStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.borrow();
        f.debug_struct("NotificationStore")
            .field("len", &state.len())
            .field("unread", &state.unread_count())
            .finish_non_exhaustive()
    }
}

impl NotificationStore {
    /// Create a store and subscribe it to `bus`.
    pub fn new(bus: &EventBus) -> Self {
        let (state, _) = watch::channel(CacheSnapshot::default());
        let inner = Arc::new(StoreInner {
            state,
            bus: bus.clone(),
            listener: Mutex::new(None),
        });

        let weak: Weak<StoreInner> = Arc::downgrade(&inner);
        let id = bus.subscribe(move |frame| {
            if let Some(inner) = weak.upgrade() {
                inner.state.send_if_modified(|cache| match cache.push(frame) {
                    Some(n) => {
                        tracing::debug!(id = %n.id, kind = %n.kind, "notification cached");
                        true
                    }
                    None => false,
                });
            }
            Ok(())
        });
        *inner.listener.lock().unwrap_or_else(PoisonError::into_inner) = Some(id);

        Self { inner }
    }

    /// Stop listening to the bus. Cached state is kept.
    pub fn detach(&self) {
        let taken = self
            .inner
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(id) = taken {
            self.inner.bus.unsubscribe(id);
        }
    }

    /// Whether the store still receives frames.
    pub fn is_attached(&self) -> bool {
        self.inner
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    // ── Mutations ────────────────────────────────────────────────────

    /// Mark one cached entry read. Unknown or already-read ids are a no-op.
    pub fn mark_read(&self, id: NotificationId) -> bool {
        self.inner.state.send_if_modified(|cache| cache.mark_read(id))
    }

    pub fn mark_all_read(&self) {
        self.inner
            .state
            .send_if_modified(|cache| cache.mark_all_read() > 0);
    }

    pub fn clear_all(&self) {
        self.inner.state.send_if_modified(CacheSnapshot::clear);
    }

    /// Mark cached entries read after the history store confirmed it.
    pub fn apply_server_read(&self, ids: &[u64]) -> usize {
        let mut changed = 0;
        self.inner.state.send_if_modified(|cache| {
            changed = cache.mark_read_server(ids);
            changed > 0
        });
        changed
    }

    /// Record the authoritative unread total.
    pub fn set_server_unread(&self, count: u64) {
        self.inner
            .state
            .send_if_modified(|cache| cache.set_server_unread(Some(count)));
    }

    // ── Reads ────────────────────────────────────────────────────────

    pub fn snapshot(&self) -> CacheSnapshot {
        self.inner.state.borrow().clone()
    }

    /// Cached entries, most recent first.
    pub fn notifications(&self) -> Vec<Arc<Notification>> {
        self.inner.state.borrow().to_vec()
    }

    pub fn get(&self, id: NotificationId) -> Option<Arc<Notification>> {
        self.inner.state.borrow().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.state.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.state.borrow().is_empty()
    }

    pub fn unread_count(&self) -> usize {
        self.inner.state.borrow().unread_count()
    }

    pub fn server_unread(&self) -> Option<u64> {
        self.inner.state.borrow().server_unread()
    }

    pub fn subscribe(&self) -> watch::Receiver<CacheSnapshot> {
        self.inner.state.subscribe()
    }

    /// Snapshot-plus-changes subscription.
    pub fn changes(&self) -> Subscription<CacheSnapshot> {
        Subscription::new(self.inner.state.subscribe())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::{NotificationKind, Origin};
    use futures_util::StreamExt;
    use notifly_api::PushFrame;
    use notifly_api::push::ConnectionStatus;
    use pretty_assertions::assert_eq;

    fn repo_assigned() -> PushFrame {
        PushFrame::parse(
            r#"{"type":"notification","notification_type":"repo_assigned","title":"X","message":"Y"}"#,
        )
        .unwrap()
    }

    #[test]
    fn push_frame_lands_in_cache() {
        let bus = EventBus::new();
        let store = NotificationStore::new(&bus);

        bus.publish(&repo_assigned());

        assert_eq!(store.len(), 1);
        assert_eq!(store.unread_count(), 1);
        let head = store.notifications().remove(0);
        assert_eq!(head.kind, NotificationKind::RepoAssigned);
        assert_eq!(head.title, "X");
        assert_eq!(head.message, "Y");
        assert_eq!(head.origin, Origin::Push);
        assert!(!head.is_read);
    }

    #[test]
    fn connection_frames_do_not_touch_cache() {
        let bus = EventBus::new();
        let store = NotificationStore::new(&bus);
        bus.publish(&PushFrame::connection(ConnectionStatus::Connected));
        assert!(store.is_empty());
    }

    #[test]
    fn mark_read_idempotent_and_clear_all() {
        let bus = EventBus::new();
        let store = NotificationStore::new(&bus);
        bus.publish(&repo_assigned());
        bus.publish(&repo_assigned());

        let id = store.notifications()[0].id;
        assert!(store.mark_read(id));
        assert!(!store.mark_read(id));
        assert_eq!(store.unread_count(), 1);

        store.clear_all();
        assert_eq!(store.len(), 0);
        assert_eq!(store.unread_count(), 0);
    }

    #[test]
    fn detach_stops_ingest() {
        let bus = EventBus::new();
        let store = NotificationStore::new(&bus);
        assert_eq!(bus.listener_count(), 1);

        store.detach();
        bus.publish(&repo_assigned());
        assert!(store.is_empty());
        assert!(!store.is_attached());
        assert_eq!(bus.listener_count(), 0);
    }

    #[test]
    fn dropping_last_handle_unsubscribes() {
        let bus = EventBus::new();
        let store = NotificationStore::new(&bus);
        drop(store);
        assert_eq!(bus.listener_count(), 0);
    }

    #[test]
    fn server_unread_kept_separately() {
        let bus = EventBus::new();
        let store = NotificationStore::new(&bus);
        bus.publish(&repo_assigned());
        store.set_server_unread(40);
        assert_eq!(store.unread_count(), 1);
        assert_eq!(store.server_unread(), Some(40));
    }

    #[tokio::test]
    async fn changes_yield_snapshots() {
        let bus = EventBus::new();
        let store = NotificationStore::new(&bus);
        let mut changes = store.changes().into_stream();

        let first = changes.next().await.unwrap();
        assert!(first.is_empty());

        bus.publish(&repo_assigned());
        let next = changes.next().await.unwrap();
        assert_eq!(next.len(), 1);
    }
}
