// notifly-core: Real-time notification delivery and history sync on top of notifly-api.
//
// Frames from the push channel fan out over the `EventBus` into the bounded
// `NotificationStore`; the `SyncController` reconciles that cache against
// the paginated history. `NotificationService` wires one instance together.

pub mod bus;
pub mod config;
pub mod connection;
pub mod convert;
pub mod error;
pub mod model;
pub mod service;
pub mod session;
pub mod store;
pub mod stream;
pub mod sync;

// ── Primary re-exports ──────────────────────────────────────────────
pub use bus::{EventBus, ListenerError, ListenerId};
pub use config::{ChannelConfig, HistoryConfig, NotiflyConfig, TlsVerification};
pub use connection::ConnectionManager;
pub use error::CoreError;
pub use service::NotificationService;
pub use session::SessionBinding;
pub use store::{CACHE_CAPACITY, CacheSnapshot, NotificationStore};
pub use stream::{Subscription, SubscriptionStream};
pub use sync::{AssumeYes, Confirm, HistoryFilters, HistoryPage, PageView, SyncController};

pub use model::{ConnectionState, Notification, NotificationId, NotificationKind, Origin, RetryState};

// Wire types consumers need alongside the core API.
pub use notifly_api::PushFrame;
pub use notifly_api::push::{ConnectionStatus, Connector, FrameType, WsConnector};
