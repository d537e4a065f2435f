// ── Notification cache ──

mod cache;
mod notification_store;

pub use cache::{CACHE_CAPACITY, CacheSnapshot};
pub use notification_store::NotificationStore;
