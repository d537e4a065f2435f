// ── Runtime configuration ──
//
// These types describe *where* the notification service lives and how the
// push channel and history sync behave. They never touch disk: the binary
// (via `notifly-config`) constructs a `NotiflyConfig` and hands it in.

use std::time::Duration;

use url::Url;

use notifly_api::transport::{TlsMode, TransportConfig};

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(std::path::PathBuf),
    /// Skip verification (local development backends).
    DangerAcceptInvalid,
}

/// Push channel reconnection policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelConfig {
    /// Automatic reconnects after an abnormal closure before giving up.
    pub max_attempts: u32,
    /// Linear backoff unit: the n-th retry waits `base_delay * n`.
    pub base_delay: Duration,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(3000),
        }
    }
}

impl ChannelConfig {
    /// Delay before the reconnect scheduled while `attempt` retries have
    /// already been made: `base_delay * (attempt + 1)`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt.saturating_add(1))
    }
}

/// History pagination and reconciliation policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryConfig {
    pub page_size: u32,
    /// How long a page must stay displayed before its unread items are
    /// marked read.
    pub view_delay: Duration,
    /// Period of the `unread-count` resync. `Duration::ZERO` disables it.
    pub unread_poll_interval: Duration,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            page_size: 20,
            view_delay: Duration::from_millis(500),
            unread_poll_interval: Duration::ZERO,
        }
    }
}

/// Everything the notification subsystem needs to run.
///
/// Built by the CLI, passed to `NotificationService`.
#[derive(Debug, Clone)]
pub struct NotiflyConfig {
    /// History API root (e.g., `https://console.example.com/api/`).
    pub api_url: Url,
    /// Push channel host (e.g., `wss://console.example.com`).
    pub ws_url: Url,
    /// TLS verification strategy for the history API.
    pub tls: TlsVerification,
    /// Request timeout.
    pub timeout: Duration,
    pub channel: ChannelConfig,
    pub history: HistoryConfig,
}

impl NotiflyConfig {
    /// Config with default policies for the given endpoints.
    pub fn new(api_url: Url, ws_url: Url) -> Self {
        Self {
            api_url,
            ws_url,
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(30),
            channel: ChannelConfig::default(),
            history: HistoryConfig::default(),
        }
    }

    /// Build the API-level [`TransportConfig`].
    pub fn transport(&self) -> TransportConfig {
        TransportConfig {
            tls: match &self.tls {
                TlsVerification::SystemDefaults => TlsMode::System,
                TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
                TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
            },
            timeout: self.timeout,
        }
    }
}
