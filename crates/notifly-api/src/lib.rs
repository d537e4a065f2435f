// notifly-api: Async Rust client for the notification history API and push channel

pub mod error;
pub mod history;
pub mod push;
pub mod transport;

pub use error::Error;
pub use history::HistoryClient;
pub use push::{Connector, PushChannel, PushFrame, WsConnector};
