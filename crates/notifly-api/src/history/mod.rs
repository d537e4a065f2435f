// History API client modules
//
// Hand-written client for the notification history REST endpoints:
// paginated listing, single lookup, mark-read, mark-all-read, clear-all
// and the unread counter.

pub mod client;
pub mod models;
pub mod notifications;

pub use client::HistoryClient;
pub use models::{HistoryQuery, NotificationPage, NotificationRecord, UnreadCount};
