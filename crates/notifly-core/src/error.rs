// ── Core error types ──
//
// Errors returned by the notification subsystem. Consumers never see HTTP
// status codes or JSON parse failures directly: the `From<notifly_api::Error>`
// impl translates transport-layer errors into subsystem variants.
//
// Push channel failures never appear here. They surface as `error` frames
// on the EventBus instead.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot reach notification service at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("No active session")]
    NotAuthenticated,

    #[error("Notification service timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    // ── History errors ───────────────────────────────────────────────
    #[error("Notification not found: {identifier}")]
    NotFound { identifier: String },

    /// A history request failed. The local cache is left unchanged.
    #[error("History request failed: {message}")]
    HistoryFetch {
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Whether retrying the same call later can succeed without user action.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::ConnectionFailed { .. } | Self::Timeout { .. } => true,
            Self::HistoryFetch { status, .. } => status.is_none_or(|s| s >= 500 || s == 429),
            _ => false,
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<notifly_api::Error> for CoreError {
    fn from(err: notifly_api::Error) -> Self {
        match err {
            notifly_api::Error::Authentication { message } => {
                CoreError::AuthenticationFailed { message }
            }
            notifly_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout { timeout_secs: 0 }
                } else if e.is_connect() {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map_or_else(|| "<unknown>".into(), ToString::to_string),
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::HistoryFetch {
                        message: e.to_string(),
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            notifly_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            notifly_api::Error::Timeout { timeout_secs } => CoreError::Timeout { timeout_secs },
            notifly_api::Error::Tls(msg) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("TLS error: {msg}"),
            },
            notifly_api::Error::Api { status: 404, message } => {
                CoreError::NotFound { identifier: message }
            }
            notifly_api::Error::Api { status, message } => CoreError::HistoryFetch {
                message,
                status: Some(status),
            },
            notifly_api::Error::WebSocketConnect(reason) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("Push channel connection failed: {reason}"),
            },
            notifly_api::Error::Deserialization { message, body: _ } => CoreError::HistoryFetch {
                message: format!("Unexpected response: {message}"),
                status: None,
            },
        }
    }
}
