// ── Push channel lifecycle ──
//
// `ConnectionManager` owns the socket and the reconnect state machine. One
// driver task runs per connect cycle; it is the only writer of
// `ConnectionState` and `RetryState`. A cycle ends on a normal close, on
// retry exhaustion, or when the driver is cancelled by `connect()` /
// `disconnect()`. Cancelling the driver also cancels its pending retry
// sleep, so at most one reconnect is ever scheduled.

use std::sync::Arc;

use arc_swap::ArcSwapOption;
use secrecy::SecretString;
use serde::Serialize;
use tokio::sync::{Mutex, mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use url::Url;

use notifly_api::PushFrame;
use notifly_api::push::{self, CLOSE_ABNORMAL, CLOSE_NORMAL, ConnectionStatus, Connector, Inbound};

use crate::bus::EventBus;
use crate::config::ChannelConfig;
use crate::model::{ConnectionState, RetryState};

/// Owns the push channel and its reconnection policy.
///
/// Cheaply cloneable; clones control the same channel.
#[derive(Clone)]
pub struct ConnectionManager {
    inner: Arc<ManagerInner>,
}

struct ManagerInner {
    policy: ChannelConfig,
    host: Url,
    bus: EventBus,
    connector: Arc<dyn Connector>,
    state: watch::Sender<ConnectionState>,
    retry: watch::Sender<RetryState>,
    outbound: ArcSwapOption<mpsc::Sender<String>>,
    driver: Mutex<Option<Driver>>,
}

/// The running connect cycle.
struct Driver {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl Driver {
    async fn stop(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            tracing::warn!(error = %e, "push channel driver ended abnormally");
        }
    }
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("host", &self.inner.host.as_str())
            .field("state", &*self.inner.state.borrow())
            .field("retry", &*self.inner.retry.borrow())
            .finish_non_exhaustive()
    }
}

impl ConnectionManager {
    pub fn new(
        policy: ChannelConfig,
        host: Url,
        bus: EventBus,
        connector: Arc<dyn Connector>,
    ) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        let (retry, _) = watch::channel(RetryState::default());
        Self {
            inner: Arc::new(ManagerInner {
                policy,
                host,
                bus,
                connector,
                state,
                retry,
                outbound: ArcSwapOption::empty(),
                driver: Mutex::new(None),
            }),
        }
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Open the push channel with `token`.
    ///
    /// No-op while `Open` or `Connecting`. From `Reconnecting` or
    /// `Disconnected` the pending retry (if any) is cancelled and a fresh
    /// cycle starts with `attempt = 0`. Failures surface as bus frames.
    pub async fn connect(&self, token: &SecretString) {
        let mut driver = self.inner.driver.lock().await;

        let state = *self.inner.state.borrow();
        if matches!(state, ConnectionState::Open | ConnectionState::Connecting) {
            tracing::debug!(%state, "connect ignored");
            return;
        }

        if let Some(previous) = driver.take() {
            previous.stop().await;
        }

        let url = match push::push_url(&self.inner.host, token) {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!(error = %e, "invalid push channel address");
                self.inner
                    .bus
                    .publish(&PushFrame::error(format!("invalid push channel address: {e}")));
                return;
            }
        };

        self.inner.retry.send_replace(RetryState::default());
        self.inner.set_state(ConnectionState::Connecting);

        let cancel = CancellationToken::new();
        let task = tokio::spawn(run_channel(
            Arc::clone(&self.inner),
            url,
            cancel.clone(),
        ));
        *driver = Some(Driver { cancel, task });
    }

    /// Close the channel deliberately (code 1000) and cancel any pending
    /// reconnect. Leaves the manager `Closed`.
    pub async fn disconnect(&self) {
        let mut driver = self.inner.driver.lock().await;
        let previous = *self.inner.state.borrow();

        self.inner.outbound.store(None);
        if let Some(running) = driver.take() {
            running.stop().await;
        }

        self.inner.retry.send_replace(RetryState::default());
        self.inner.set_state(ConnectionState::Closed);

        if previous != ConnectionState::Closed {
            tracing::info!(from = %previous, "push channel closed");
            self.inner
                .bus
                .publish(&PushFrame::connection(ConnectionStatus::Closed));
        }
    }

    /// Tear down the channel for good. Equivalent to `disconnect()`.
    pub async fn dispose(&self) {
        self.disconnect().await;
    }

    /// Serialize and queue `frame` for the server.
    ///
    /// Best-effort: returns `false` without side effects unless `Open`.
    pub fn send<T: Serialize + ?Sized>(&self, frame: &T) -> bool {
        if *self.inner.state.borrow() != ConnectionState::Open {
            return false;
        }
        let guard = self.inner.outbound.load();
        let Some(tx) = guard.as_ref() else {
            return false;
        };
        match serde_json::to_string(frame) {
            Ok(text) => tx.try_send(text).is_ok(),
            Err(e) => {
                tracing::warn!(error = %e, "outbound frame not serializable");
                false
            }
        }
    }

    // ── Observation ──────────────────────────────────────────────────

    pub fn state(&self) -> ConnectionState {
        *self.inner.state.borrow()
    }

    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state.subscribe()
    }

    pub fn retry_state(&self) -> RetryState {
        *self.inner.retry.borrow()
    }

    pub fn watch_retry(&self) -> watch::Receiver<RetryState> {
        self.inner.retry.subscribe()
    }
}

impl ManagerInner {
    fn set_state(&self, next: ConnectionState) {
        self.state.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            tracing::debug!(from = %current, to = %next, "connection state");
            *current = next;
            true
        });
    }

    fn publish_status(&self, status: ConnectionStatus) {
        self.bus.publish(&PushFrame::connection(status));
    }
}

// ── Driver ───────────────────────────────────────────────────────────

/// One connect cycle: sessions separated by linear backoff.
async fn run_channel(inner: Arc<ManagerInner>, url: Url, cancel: CancellationToken) {
    loop {
        let code = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                inner.outbound.store(None);
                return;
            }
            code = run_session(&inner, &url) => code,
        };

        if code == CLOSE_NORMAL {
            tracing::info!("push channel closed by server");
            inner.set_state(ConnectionState::Disconnected);
            inner.publish_status(ConnectionStatus::Disconnected);
            return;
        }

        inner.set_state(ConnectionState::Reconnecting);
        inner.publish_status(ConnectionStatus::Disconnected);

        let attempt = inner.retry.borrow().attempt;
        if attempt >= inner.policy.max_attempts {
            tracing::warn!(attempts = attempt, "reconnection attempts exhausted");
            inner.retry.send_modify(|retry| retry.pending = None);
            inner.set_state(ConnectionState::Disconnected);
            inner.bus.publish(&PushFrame::error(format!(
                "reconnection attempts exhausted after {attempt} retries"
            )));
            return;
        }

        let delay = inner.policy.backoff(attempt);
        inner.retry.send_replace(RetryState {
            attempt: attempt + 1,
            pending: Some(delay),
        });
        tracing::info!(
            code,
            attempt = attempt + 1,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            "scheduling reconnect"
        );

        tokio::select! {
            biased;
            () = cancel.cancelled() => return,
            () = tokio::time::sleep(delay) => {}
        }

        inner.retry.send_modify(|retry| retry.pending = None);
        inner.set_state(ConnectionState::Connecting);
    }
}

/// Open one socket and pump it until it closes. Returns the close code.
async fn run_session(inner: &ManagerInner, url: &Url) -> u16 {
    let mut channel = match inner.connector.open(url.clone()).await {
        Ok(channel) => channel,
        Err(e) => {
            tracing::warn!(url = %push::redacted(url), error = %e, "push channel handshake failed");
            inner.bus.publish(&PushFrame::error(e.to_string()));
            return CLOSE_ABNORMAL;
        }
    };

    inner.retry.send_replace(RetryState::default());
    inner
        .outbound
        .store(Some(Arc::new(channel.outbound.clone())));
    inner.set_state(ConnectionState::Open);
    tracing::info!(url = %push::redacted(url), "push channel open");
    inner.publish_status(ConnectionStatus::Connected);

    let code = loop {
        match channel.inbound.recv().await {
            Some(Inbound::Text(text)) => match PushFrame::parse(&text) {
                Ok(frame) => {
                    tracing::trace!(frame_type = ?frame.frame_type, "push frame");
                    inner.bus.publish(&frame);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "malformed push frame");
                    inner
                        .bus
                        .publish(&PushFrame::error(format!("malformed push frame: {e}")));
                }
            },
            Some(Inbound::Closed { code, reason }) => {
                tracing::info!(code, reason = %reason, "push channel closed");
                break code;
            }
            Some(Inbound::Failed(reason)) => {
                tracing::warn!(reason = %reason, "push channel failed");
                inner.bus.publish(&PushFrame::error(reason));
                break CLOSE_ABNORMAL;
            }
            None => break CLOSE_ABNORMAL,
        }
    };

    inner.outbound.store(None);
    code
}
