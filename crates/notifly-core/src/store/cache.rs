// ── Bounded notification cache ──
//
// Pure state: no channels, no locking. `NotificationStore` owns one inside a
// `watch::Sender` and every mutation goes through it.

use std::collections::VecDeque;
use std::sync::Arc;

use notifly_api::PushFrame;

use crate::convert;
use crate::model::{Notification, NotificationId};

/// Maximum number of cached notifications.
pub const CACHE_CAPACITY: usize = 50;

/// The recent-notification cache, most recent first.
///
/// `unread_count()` always equals the number of unread entries currently
/// cached: evicting an unread entry lowers it too. The authoritative
/// server-side total lives separately in `server_unread()`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheSnapshot {
    items: VecDeque<Arc<Notification>>,
    unread: usize,
    next_local_id: u64,
    server_unread: Option<u64>,
}

impl CacheSnapshot {
    // ── Reads ────────────────────────────────────────────────────────

    /// Entries, most recent first.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Notification>> {
        self.items.iter()
    }

    pub fn to_vec(&self) -> Vec<Arc<Notification>> {
        self.items.iter().cloned().collect()
    }

    pub fn get(&self, id: NotificationId) -> Option<&Arc<Notification>> {
        self.items.iter().find(|n| n.id == id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Unread entries in the cache.
    pub fn unread_count(&self) -> usize {
        self.unread
    }

    /// Last total reported by the history store, if any.
    pub fn server_unread(&self) -> Option<u64> {
        self.server_unread
    }

    // ── Mutations ────────────────────────────────────────────────────

    /// Ingest a push frame. Returns the new entry, or `None` when the frame
    /// is not a notification or duplicates a cached server id.
    pub(crate) fn push(&mut self, frame: &PushFrame) -> Option<Arc<Notification>> {
        if !frame.is_notification() {
            return None;
        }

        let id = match frame.server_id() {
            Some(server_id) => {
                let id = NotificationId::Server(server_id);
                if self.get(id).is_some() {
                    tracing::debug!(%id, "duplicate push notification dropped");
                    return None;
                }
                id
            }
            None => {
                self.next_local_id += 1;
                NotificationId::Local(self.next_local_id)
            }
        };

        let notification = Arc::new(convert::from_push(frame, id));
        self.items.push_front(Arc::clone(&notification));
        self.unread += 1;

        while self.items.len() > CACHE_CAPACITY {
            if let Some(evicted) = self.items.pop_back() {
                if !evicted.is_read {
                    self.unread = self.unread.saturating_sub(1);
                }
                tracing::trace!(id = %evicted.id, "evicted from cache");
            }
        }

        Some(notification)
    }

    /// Mark one entry read. Returns `false` if unknown or already read.
    pub(crate) fn mark_read(&mut self, id: NotificationId) -> bool {
        let Some(slot) = self.items.iter_mut().find(|n| n.id == id) else {
            return false;
        };
        if slot.is_read {
            return false;
        }
        Arc::make_mut(slot).is_read = true;
        self.unread = self.unread.saturating_sub(1);
        true
    }

    /// Mark every cached entry carrying one of these server ids read.
    /// Returns how many entries changed.
    pub(crate) fn mark_read_server(&mut self, ids: &[u64]) -> usize {
        ids.iter()
            .filter(|&&id| self.mark_read(NotificationId::Server(id)))
            .count()
    }

    /// Returns how many entries changed.
    pub(crate) fn mark_all_read(&mut self) -> usize {
        let mut changed = 0;
        for slot in self.items.iter_mut().filter(|n| !n.is_read) {
            Arc::make_mut(slot).is_read = true;
            changed += 1;
        }
        self.unread = 0;
        changed
    }

    /// Drop every entry. The local id counter keeps running.
    pub(crate) fn clear(&mut self) -> bool {
        let had_state = !self.items.is_empty() || self.server_unread.is_some();
        self.items.clear();
        self.unread = 0;
        self.server_unread = None;
        had_state
    }

    pub(crate) fn set_server_unread(&mut self, count: Option<u64>) -> bool {
        let changed = self.server_unread != count;
        self.server_unread = count;
        changed
    }
}
