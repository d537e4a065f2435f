// ── Session binding ──
//
// Follows the host's auth state: login opens the push channel, logout
// closes it and purges the cache, and a token rotation reconnects with the
// new credential.

use secrecy::{ExposeSecret, SecretString};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::connection::ConnectionManager;
use crate::store::NotificationStore;
use crate::sync::SyncController;

/// Drives the push channel and history client from a session signal.
pub struct SessionBinding {
    manager: ConnectionManager,
    store: NotificationStore,
    sync: SyncController,
    current: Option<SecretString>,
}

impl SessionBinding {
    pub fn new(manager: ConnectionManager, store: NotificationStore, sync: SyncController) -> Self {
        Self {
            manager,
            store,
            sync,
            current: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.current.is_some()
    }

    /// React to the session becoming `next`.
    ///
    /// | current | next      | action                                   |
    /// |---------|-----------|------------------------------------------|
    /// | none    | some(t)   | authorize, connect(t)                    |
    /// | some    | none      | disconnect, purge cache, revoke          |
    /// | some(a) | some(b≠a) | disconnect, authorize, connect(b)        |
    pub async fn apply(&mut self, next: Option<SecretString>) {
        match (self.current.take(), next) {
            (None, None) => {}
            (None, Some(token)) => {
                tracing::info!("session started");
                self.authorize(&token);
                self.manager.connect(&token).await;
                self.current = Some(token);
            }
            (Some(_), None) => {
                tracing::info!("session ended");
                self.manager.disconnect().await;
                self.store.clear_all();
                self.sync.revoke();
            }
            (Some(old), Some(token)) => {
                if old.expose_secret() == token.expose_secret() {
                    self.current = Some(old);
                    return;
                }
                tracing::info!("session token rotated");
                self.manager.disconnect().await;
                self.authorize(&token);
                self.manager.connect(&token).await;
                self.current = Some(token);
            }
        }
    }

    fn authorize(&self, token: &SecretString) {
        if let Err(e) = self.sync.authorize(token) {
            tracing::warn!(error = %e, "history client unavailable for this session");
        }
    }

    /// Follow `session` until `cancel` fires.
    ///
    /// The current value is applied immediately. A dropped sender counts
    /// as logout.
    pub fn spawn(
        mut self,
        mut session: watch::Receiver<Option<SecretString>>,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let initial = session.borrow_and_update().clone();
            self.apply(initial).await;

            loop {
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    changed = session.changed() => {
                        if changed.is_err() {
                            tracing::debug!("session source dropped");
                            self.apply(None).await;
                            break;
                        }
                        let next = session.borrow_and_update().clone();
                        self.apply(next).await;
                    }
                }
            }
        })
    }
}
