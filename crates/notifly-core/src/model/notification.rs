// ── Notification domain type ──

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

/// Identifier of a notification, tagged with who assigned it.
///
/// Server ids are stable across sessions. Local ids are synthesized for
/// push frames that carry no server id; they are monotonic and unique only
/// within the current session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "origin", content = "value", rename_all = "snake_case")]
pub enum NotificationId {
    Local(u64),
    Server(u64),
}

impl NotificationId {
    /// The history-store id, if this notification has one.
    pub fn server_id(self) -> Option<u64> {
        match self {
            Self::Server(id) => Some(id),
            Self::Local(_) => None,
        }
    }
}

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local(id) => write!(f, "local-{id}"),
            Self::Server(id) => write!(f, "{id}"),
        }
    }
}

/// What a notification is about.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NotificationKind {
    RepoAssigned,
    RepoUnassigned,
    MemberJoined,
    AccessRequest,
    ScanComplete,
    CriticalFinding,
    #[serde(other)]
    Other,
}

impl NotificationKind {
    /// Parse a wire `notification_type`, mapping unknown values to `Other`.
    pub fn from_wire(raw: &str) -> Self {
        raw.parse().unwrap_or(Self::Other)
    }
}

/// How the client learned about a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    /// Delivered live over the push channel.
    Push,
    /// Fetched from the paginated history.
    Pull,
}

/// A notification, from either source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    /// Kind-specific data (repository, finding, requester, ...).
    pub payload: serde_json::Value,
    pub created_at: Option<DateTime<Utc>>,
    pub is_read: bool,
    pub origin: Origin,
}
