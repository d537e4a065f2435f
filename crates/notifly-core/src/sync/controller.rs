// ── History synchronization ──
//
// Pull side of the subsystem: paginated history queries and the mutations
// that go through the history store. Successful mutations are mirrored
// into the `NotificationStore`; failed ones leave it untouched.

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwapOption;
use secrecy::SecretString;
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use url::Url;

use notifly_api::HistoryClient;
use notifly_api::history::HistoryQuery;
use notifly_api::transport::TransportConfig;

use crate::config::{HistoryConfig, NotiflyConfig};
use crate::error::CoreError;
use crate::model::Notification;
use crate::store::NotificationStore;

use super::confirm::Confirm;
use super::page_view::{self, PageView};

const CLEAR_ALL_PROMPT: &str = "Clear all notifications? This cannot be undone.";

/// History list filters. `None` means "don't filter".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryFilters {
    pub is_read: Option<bool>,
    /// Wire `notification_type`, e.g. `critical_finding`.
    pub kind: Option<String>,
}

/// One page of history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryPage {
    pub items: Vec<Notification>,
    /// 1-based.
    pub page: u32,
    /// `ceil(count / page_size)`.
    pub total_pages: u32,
    /// Matching items across all pages.
    pub count: u64,
}

impl HistoryPage {
    /// Server ids of the unread items on this page.
    pub fn unread_ids(&self) -> Vec<u64> {
        self.items
            .iter()
            .filter(|n| !n.is_read)
            .filter_map(|n| n.id.server_id())
            .collect()
    }
}

/// Queries and mutates the notification history.
///
/// Cheaply cloneable. Requests fail with [`CoreError::NotAuthenticated`]
/// until [`authorize`](Self::authorize) has been called.
#[derive(Clone)]
pub struct SyncController {
    inner: Arc<SyncInner>,
}

struct SyncInner {
    api_url: Url,
    transport: TransportConfig,
    policy: HistoryConfig,
    client: ArcSwapOption<HistoryClient>,
    store: NotificationStore,
    confirm: Arc<dyn Confirm>,
}

impl std::fmt::Debug for SyncController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncController")
            .field("api_url", &self.inner.api_url.as_str())
            .field("authorized", &self.is_authorized())
            .finish_non_exhaustive()
    }
}

impl SyncController {
    pub fn new(config: &NotiflyConfig, store: NotificationStore, confirm: Arc<dyn Confirm>) -> Self {
        Self {
            inner: Arc::new(SyncInner {
                api_url: config.api_url.clone(),
                transport: config.transport(),
                policy: config.history.clone(),
                client: ArcSwapOption::empty(),
                store,
                confirm,
            }),
        }
    }

    /// Controller that starts authorized with a pre-built client.
    pub fn with_client(
        client: HistoryClient,
        policy: HistoryConfig,
        store: NotificationStore,
        confirm: Arc<dyn Confirm>,
    ) -> Self {
        Self {
            inner: Arc::new(SyncInner {
                api_url: client.base_url().clone(),
                transport: TransportConfig::default(),
                policy,
                client: ArcSwapOption::from_pointee(client),
                store,
                confirm,
            }),
        }
    }

    // ── Session ──────────────────────────────────────────────────────

    /// Build the history client for `token`.
    pub fn authorize(&self, token: &SecretString) -> Result<(), CoreError> {
        let client = HistoryClient::new(self.inner.api_url.clone(), token, &self.inner.transport)?;
        self.inner.client.store(Some(Arc::new(client)));
        tracing::debug!(api = %self.inner.api_url, "history client authorized");
        Ok(())
    }

    /// Drop the history client. Later requests fail with `NotAuthenticated`.
    pub fn revoke(&self) {
        self.inner.client.store(None);
    }

    pub fn is_authorized(&self) -> bool {
        self.inner.client.load().is_some()
    }

    fn client(&self) -> Result<Arc<HistoryClient>, CoreError> {
        self.inner.client.load_full().ok_or(CoreError::NotAuthenticated)
    }

    pub fn store(&self) -> &NotificationStore {
        &self.inner.store
    }

    pub fn policy(&self) -> &HistoryConfig {
        &self.inner.policy
    }

    // ── Queries ──────────────────────────────────────────────────────

    /// Fetch one page of history. Pages are 1-based; `0` is treated as `1`.
    pub async fn list(&self, filters: &HistoryFilters, page: u32) -> Result<HistoryPage, CoreError> {
        let client = self.client()?;
        let page = page.max(1);
        let page_size = self.inner.policy.page_size.max(1);
        let query = HistoryQuery {
            page,
            page_size,
            is_read: filters.is_read,
            notification_type: filters.kind.clone(),
        };

        let raw = client.list_notifications(&query).await?;
        let total_pages = u32::try_from(raw.count.div_ceil(u64::from(page_size))).unwrap_or(u32::MAX);

        Ok(HistoryPage {
            items: raw.results.into_iter().map(Notification::from).collect(),
            page,
            total_pages,
            count: raw.count,
        })
    }

    pub async fn get(&self, id: u64) -> Result<Notification, CoreError> {
        let client = self.client()?;
        let record = client.get_notification(id).await?;
        Ok(Notification::from(record))
    }

    /// Ask the history store for the authoritative unread total and record
    /// it on the cache.
    pub async fn unread_count(&self) -> Result<u64, CoreError> {
        let client = self.client()?;
        let count = client.unread_count().await?;
        self.inner.store.set_server_unread(count);
        Ok(count)
    }

    // ── Mutations ────────────────────────────────────────────────────

    /// Mark `ids` read in a single request. An empty slice sends nothing.
    pub async fn mark_read(&self, ids: &[u64]) -> Result<(), CoreError> {
        if ids.is_empty() {
            return Ok(());
        }
        let client = self.client()?;
        client.mark_read(ids).await?;
        let changed = self.inner.store.apply_server_read(ids);
        tracing::debug!(requested = ids.len(), cached = changed, "notifications marked read");
        Ok(())
    }

    pub async fn mark_all_read(&self) -> Result<(), CoreError> {
        let client = self.client()?;
        client.mark_all_read().await?;
        self.inner.store.mark_all_read();
        self.inner.store.set_server_unread(0);
        Ok(())
    }

    /// Delete every notification after confirmation.
    ///
    /// Returns `Ok(false)` when declined; nothing is sent and the cache is
    /// untouched.
    pub async fn clear_all(&self) -> Result<bool, CoreError> {
        let client = self.client()?;
        if !self.inner.confirm.confirm(CLEAR_ALL_PROMPT) {
            tracing::debug!("clear-all declined");
            return Ok(false);
        }
        client.clear_all().await?;
        self.inner.store.clear_all();
        tracing::info!("notification history cleared");
        Ok(true)
    }

    // ── Background work ──────────────────────────────────────────────

    /// Resync the unread total every `interval` until `cancel` fires.
    ///
    /// Returns `None` (and spawns nothing) for a zero interval.
    pub fn spawn_unread_poll(
        &self,
        interval: Duration,
        cancel: CancellationToken,
    ) -> Option<JoinHandle<()>> {
        if interval.is_zero() {
            return None;
        }
        let sync = self.clone();
        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    _ = ticker.tick() => {}
                }
                match sync.unread_count().await {
                    Ok(count) => tracing::trace!(count, "unread count resynced"),
                    Err(CoreError::NotAuthenticated) => {}
                    Err(e) => tracing::warn!(error = %e, "unread count resync failed"),
                }
            }
            tracing::debug!("unread poll stopped");
        }))
    }

    /// Fetch a page and display it: unread items on it are marked read in
    /// one request once the view has stayed open for `view_delay`.
    pub async fn open_page(&self, filters: &HistoryFilters, page: u32) -> Result<PageView, CoreError> {
        let fetched = self.list(filters, page).await?;
        let unread = fetched.unread_ids();
        let (view_tx, view_rx) = watch::channel(fetched);
        let cancel = CancellationToken::new();

        let task = if unread.is_empty() {
            None
        } else {
            Some(tokio::spawn(page_view::auto_mark_read(
                self.clone(),
                unread,
                view_tx,
                self.inner.policy.view_delay,
                cancel.clone(),
            )))
        };

        Ok(PageView::new(view_rx, cancel, task))
    }
}
