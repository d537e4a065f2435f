// ── Displayed history page ──

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, DropGuard};

use super::controller::{HistoryPage, SyncController};

/// A history page while it is on screen.
///
/// Dropping or [`close`](Self::close)-ing the view before the view delay
/// elapses cancels the pending auto mark-read: no request is sent and
/// nothing changes.
#[derive(Debug)]
pub struct PageView {
    page: watch::Receiver<HistoryPage>,
    _guard: DropGuard,
    task: Option<JoinHandle<()>>,
}

impl PageView {
    pub(crate) fn new(
        page: watch::Receiver<HistoryPage>,
        cancel: CancellationToken,
        task: Option<JoinHandle<()>>,
    ) -> Self {
        Self {
            page,
            _guard: cancel.drop_guard(),
            task,
        }
    }

    /// Current contents; items flip to read once the auto mark-read lands.
    pub fn page(&self) -> HistoryPage {
        self.page.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<HistoryPage> {
        self.page.clone()
    }

    /// Whether an auto mark-read is still pending or in flight.
    pub fn is_pending(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Tear the view down.
    pub fn close(self) {
        if self.is_pending() {
            tracing::debug!("page view closed with auto mark-read pending");
        }
    }

    /// Keep the view open until its auto mark-read has completed, then
    /// return the final page.
    pub async fn finish(self) -> HistoryPage {
        let Self { page, _guard, task } = self;
        if let Some(task) = task {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "auto mark-read task failed");
            }
        }
        page.borrow().clone()
    }
}

/// Wait `delay`, then mark `ids` read in one request and reflect the
/// result on the view.
pub(crate) async fn auto_mark_read(
    sync: SyncController,
    ids: Vec<u64>,
    view: watch::Sender<HistoryPage>,
    delay: Duration,
    cancel: CancellationToken,
) {
    tokio::select! {
        biased;
        () = cancel.cancelled() => {
            tracing::debug!(count = ids.len(), "page closed before auto mark-read");
            return;
        }
        () = tokio::time::sleep(delay) => {}
    }

    match sync.mark_read(&ids).await {
        Ok(()) => {
            view.send_modify(|page| {
                for item in &mut page.items {
                    if item.id.server_id().is_some_and(|id| ids.contains(&id)) {
                        item.is_read = true;
                    }
                }
            });
        }
        Err(e) => tracing::warn!(error = %e, count = ids.len(), "auto mark-read failed"),
    }
}
