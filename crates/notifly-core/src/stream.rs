// ── Reactive state subscriptions ──
//
// Snapshot-plus-changes access to state published through a `watch`
// channel (the notification cache, history page views).

use std::pin::Pin;
use std::task::{Context, Poll};

use futures_core::Stream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

/// A subscription to a piece of watched state.
///
/// Holds the value seen at creation time and waits for later values via
/// [`changed`](Self::changed) or by converting into a `Stream`.
pub struct Subscription<T: Clone + Send + Sync + 'static> {
    current: T,
    receiver: watch::Receiver<T>,
}

impl<T: Clone + Send + Sync + 'static> Subscription<T> {
    pub(crate) fn new(mut receiver: watch::Receiver<T>) -> Self {
        let current = receiver.borrow_and_update().clone();
        Self { current, receiver }
    }

    /// The value captured at creation or at the last `changed()`.
    pub fn current(&self) -> &T {
        &self.current
    }

    /// The newest value, which may be ahead of `current()`.
    pub fn latest(&self) -> T {
        self.receiver.borrow().clone()
    }

    /// Wait for the next change.
    /// Returns `None` once the publisher has been dropped.
    pub async fn changed(&mut self) -> Option<T> {
        self.receiver.changed().await.ok()?;
        let next = self.receiver.borrow_and_update().clone();
        self.current = next.clone();
        Some(next)
    }

    /// Convert into a `Stream` yielding the current value, then each change.
    pub fn into_stream(self) -> SubscriptionStream<T> {
        SubscriptionStream {
            inner: WatchStream::new(self.receiver),
        }
    }
}

/// `Stream` adapter over a [`Subscription`].
pub struct SubscriptionStream<T: Clone + Send + Sync + 'static> {
    inner: WatchStream<T>,
}

impl<T: Clone + Send + Sync + 'static> Stream for SubscriptionStream<T> {
    type Item = T;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}
