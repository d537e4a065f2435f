// ── Push channel state types ──
//
// Owned and mutated exclusively by `ConnectionManager`; everything else
// observes them through `watch` receivers.

use std::time::Duration;

use strum::Display;

/// Lifecycle of the push channel.
///
/// ```text
/// Disconnected ──connect──▶ Connecting ──▶ Open
///                              ▲             │ abnormal close
///                              └─ Reconnecting ◀┘
/// any ──disconnect──▶ Closed   (terminal until the next connect)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Open,
    Reconnecting,
    Closed,
}

/// Reconnection bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RetryState {
    /// Reconnects scheduled since the channel was last `Open`.
    pub attempt: u32,
    /// Delay of the currently pending reconnect, if one is scheduled.
    pub pending: Option<Duration>,
}
