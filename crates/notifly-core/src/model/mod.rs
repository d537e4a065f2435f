// ── Domain model ──

pub mod connection;
pub mod notification;

pub use connection::{ConnectionState, RetryState};
pub use notification::{Notification, NotificationId, NotificationKind, Origin};
