// ── Notification service ──
//
// Composition root. One `NotificationService` owns one bus, one push
// channel, one cache and one history controller. Nothing is global: tests
// and embedders build as many independent instances as they need, and
// `dispose()` tears one down completely.

use std::sync::{Arc, Mutex, PoisonError};

use secrecy::SecretString;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use notifly_api::Connector;

use crate::bus::EventBus;
use crate::config::NotiflyConfig;
use crate::connection::ConnectionManager;
use crate::session::SessionBinding;
use crate::store::NotificationStore;
use crate::sync::{Confirm, SyncController};

/// The notification subsystem, wired together.
///
/// Cheaply cloneable; clones share the same instance.
#[derive(Clone)]
pub struct NotificationService {
    inner: Arc<ServiceInner>,
}

struct ServiceInner {
    config: NotiflyConfig,
    bus: EventBus,
    manager: ConnectionManager,
    store: NotificationStore,
    sync: SyncController,
    cancel: CancellationToken,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl std::fmt::Debug for NotificationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationService")
            .field("api_url", &self.inner.config.api_url.as_str())
            .field("state", &self.inner.manager.state())
            .field("cached", &self.inner.store.len())
            .finish_non_exhaustive()
    }
}

impl NotificationService {
    pub fn new(
        config: NotiflyConfig,
        connector: Arc<dyn Connector>,
        confirm: Arc<dyn Confirm>,
    ) -> Self {
        let bus = EventBus::new();
        let manager = ConnectionManager::new(
            config.channel.clone(),
            config.ws_url.clone(),
            bus.clone(),
            connector,
        );
        let store = NotificationStore::new(&bus);
        let sync = SyncController::new(&config, store.clone(), confirm);

        Self {
            inner: Arc::new(ServiceInner {
                config,
                bus,
                manager,
                store,
                sync,
                cancel: CancellationToken::new(),
                tasks: Mutex::new(Vec::new()),
            }),
        }
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn config(&self) -> &NotiflyConfig {
        &self.inner.config
    }

    pub fn bus(&self) -> &EventBus {
        &self.inner.bus
    }

    pub fn connection(&self) -> &ConnectionManager {
        &self.inner.manager
    }

    pub fn store(&self) -> &NotificationStore {
        &self.inner.store
    }

    pub fn sync(&self) -> &SyncController {
        &self.inner.sync
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.cancel.is_cancelled()
    }

    // ── Session ──────────────────────────────────────────────────────

    /// Follow a session signal for the lifetime of the service.
    ///
    /// Also starts the periodic unread resync when one is configured.
    pub fn bind_session(&self, session: watch::Receiver<Option<SecretString>>) {
        let binding = SessionBinding::new(
            self.inner.manager.clone(),
            self.inner.store.clone(),
            self.inner.sync.clone(),
        );
        let mut tasks = self.inner.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        tasks.push(binding.spawn(session, self.inner.cancel.child_token()));

        let interval = self.inner.config.history.unread_poll_interval;
        if let Some(poll) = self
            .inner
            .sync
            .spawn_unread_poll(interval, self.inner.cancel.child_token())
        {
            tasks.push(poll);
        }
    }

    /// Authorize history requests and open the push channel for one
    /// fixed token, without a session signal.
    pub async fn start(&self, token: &SecretString) -> Result<(), crate::CoreError> {
        self.inner.sync.authorize(token)?;
        self.inner.manager.connect(token).await;
        Ok(())
    }

    /// Stop background work, close the channel and detach the cache.
    ///
    /// Idempotent. Cached notifications stay readable afterwards.
    pub async fn dispose(&self) {
        if self.inner.cancel.is_cancelled() {
            return;
        }
        self.inner.cancel.cancel();

        let tasks: Vec<_> = self
            .inner
            .tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();
        for task in tasks {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "background task ended abnormally");
            }
        }

        self.inner.manager.dispose().await;
        self.inner.store.detach();
        self.inner.sync.revoke();
        tracing::info!("notification service disposed");
    }
}
