// ── Event bus ──
//
// In-process fan-out of push frames. Listeners are held in an ordered
// registry behind an `ArcSwap`, so `publish` iterates a stable snapshot:
// a listener may subscribe or unsubscribe (itself included) while a frame
// is being delivered, and the change applies from the next publish on.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use arc_swap::ArcSwap;
use indexmap::IndexMap;
use tokio::sync::mpsc;

use notifly_api::PushFrame;

/// Error a listener may return. Logged and otherwise ignored.
pub type ListenerError = Box<dyn std::error::Error + Send + Sync>;

/// A registered callback.
pub type Listener = Arc<dyn Fn(&PushFrame) -> Result<(), ListenerError> + Send + Sync>;

/// Handle returned by [`EventBus::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

type Registry = IndexMap<ListenerId, Listener>;

/// Publish/subscribe dispatcher for push frames.
///
/// Cheaply cloneable; clones share the same registry.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

struct BusInner {
    listeners: ArcSwap<Registry>,
    next_id: AtomicU64,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(BusInner {
                listeners: ArcSwap::from_pointee(IndexMap::new()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Register a listener. Listeners are invoked in registration order.
    pub fn subscribe<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&PushFrame) -> Result<(), ListenerError> + Send + Sync + 'static,
    {
        let id = ListenerId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        let listener: Listener = Arc::new(listener);
        self.inner.listeners.rcu(|current| {
            let mut next = Registry::clone(current);
            next.insert(id, Arc::clone(&listener));
            next
        });
        tracing::trace!(?id, "listener subscribed");
        id
    }

    /// Remove a listener. Returns `false` if it was not registered.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut removed = false;
        self.inner.listeners.rcu(|current| {
            let mut next = Registry::clone(current);
            removed = next.shift_remove(&id).is_some();
            next
        });
        removed
    }

    /// Deliver `frame` to every listener registered when the call began.
    ///
    /// A listener that errors or panics is logged and skipped; the rest
    /// still receive the frame.
    pub fn publish(&self, frame: &PushFrame) {
        let snapshot = self.inner.listeners.load_full();
        for (id, listener) in snapshot.iter() {
            match catch_unwind(AssertUnwindSafe(|| listener(frame))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    tracing::warn!(?id, error = %e, "listener failed");
                }
                Err(_) => {
                    tracing::error!(?id, "listener panicked");
                }
            }
        }
    }

    pub fn listener_count(&self) -> usize {
        self.inner.listeners.load().len()
    }

    /// Subscribe with an unbounded channel instead of a callback.
    ///
    /// After the receiver is dropped every publish logs a failure for this
    /// listener; unsubscribe with the returned id.
    pub fn subscribe_channel(&self) -> (ListenerId, mpsc::UnboundedReceiver<Arc<PushFrame>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.subscribe(move |frame| {
            tx.send(Arc::new(frame.clone()))
                .map_err(|_| ListenerError::from("receiver dropped"))
        });
        (id, rx)
    }
}
