//! Push channel transport.
//!
//! Opens the notification WebSocket (`/ws/notifications/?token=...`) and
//! bridges it onto a pair of `mpsc` channels so the reconnection state
//! machine in `notifly-core` never touches the socket directly. Frames are
//! delivered as raw text; [`PushFrame`] is the typed view of one frame.
//!
//! # Example
//!
//! ```rust,ignore
//! use notifly_api::push::{push_url, Connector, Inbound, WsConnector};
//!
//! let url = push_url(&"wss://console.example.com".parse()?, &token)?;
//! let mut channel = WsConnector.open(url).await?;
//!
//! while let Some(Inbound::Text(text)) = channel.inbound.recv().await {
//!     println!("{}", PushFrame::parse(&text)?.title.unwrap_or_default());
//! }
//! ```

use futures_util::future::BoxFuture;
use futures_util::{SinkExt, StreamExt};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::{self, Message, Utf8Bytes};
use url::Url;

use crate::error::Error;

// ── Close codes ──────────────────────────────────────────────────────

/// Close code for a deliberate, orderly shutdown.
pub const CLOSE_NORMAL: u16 = 1000;

/// Close code used when the peer sent a close frame without a status.
pub const CLOSE_NO_STATUS: u16 = 1005;

/// Close code used when the connection dropped without a close frame.
pub const CLOSE_ABNORMAL: u16 = 1006;

const CHANNEL_CAPACITY: usize = 256;

const PUSH_PATH: &str = "ws/notifications/";

// ── PushFrame ────────────────────────────────────────────────────────

/// Discriminator of a push frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameType {
    Notification,
    Connection,
    Error,
    #[serde(other)]
    Unknown,
}

/// Status carried by `connection` frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    Connected,
    Disconnected,
    /// Deliberate client-side close. Never eligible for reconnection.
    Closed,
    #[serde(other)]
    Unknown,
}

/// One JSON frame on the push channel.
///
/// Only `type` is strict. The remaining core fields are read leniently: a
/// value of an unexpected JSON type reads as `None` instead of rejecting
/// the frame. `id` and `timestamp` are kept as raw JSON so they survive
/// re-serialization unchanged, and `#[serde(flatten)]` captures every
/// field beyond the core set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushFrame {
    #[serde(rename = "type")]
    pub frame_type: FrameType,

    /// Server-assigned notification id, as sent. See [`server_id`](Self::server_id).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<serde_json::Value>,

    /// `repo_assigned`, `scan_complete`, ...
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub notification_type: Option<String>,

    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,

    /// ISO-8601 string or epoch seconds, as sent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<serde_json::Value>,

    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub status: Option<ConnectionStatus>,

    /// All remaining fields the server sends.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Read an optional field, mapping a value of the wrong shape to `None`.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw.and_then(|value| serde_json::from_value(value).ok()))
}

impl PushFrame {
    /// Parse one text frame.
    pub fn parse(text: &str) -> Result<Self, Error> {
        serde_json::from_str(text).map_err(|e| Error::Deserialization {
            message: e.to_string(),
            body: text.to_owned(),
        })
    }

    /// A locally synthesized `{type: connection, status}` frame.
    pub fn connection(status: ConnectionStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::empty(FrameType::Connection)
        }
    }

    /// A locally synthesized `{type: error, message}` frame.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::empty(FrameType::Error)
        }
    }

    fn empty(frame_type: FrameType) -> Self {
        Self {
            frame_type,
            id: None,
            notification_type: None,
            title: None,
            message: None,
            data: None,
            timestamp: None,
            status: None,
            extra: serde_json::Map::new(),
        }
    }

    pub fn is_notification(&self) -> bool {
        self.frame_type == FrameType::Notification
    }

    /// The stable history-store id, when the frame carries an integer one.
    pub fn server_id(&self) -> Option<u64> {
        self.id.as_ref().and_then(serde_json::Value::as_u64)
    }
}

// ── Addressing ───────────────────────────────────────────────────────

/// Build the push channel address: `{host}/ws/notifications/?token=<bearer>`.
pub fn push_url(host: &Url, token: &SecretString) -> Result<Url, Error> {
    let mut base = host.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    let mut url = base.join(PUSH_PATH)?;
    url.query_pairs_mut()
        .clear()
        .append_pair("token", token.expose_secret());
    Ok(url)
}

/// The address with the credential stripped, for logging.
pub fn redacted(url: &Url) -> String {
    let mut shown = url.clone();
    shown.set_query(None);
    shown.to_string()
}

// ── Channel abstraction ──────────────────────────────────────────────

/// Something read off the socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// A text frame, verbatim.
    Text(String),
    /// The peer closed the channel with this code.
    Closed { code: u16, reason: String },
    /// The socket failed; the channel is dead.
    Failed(String),
}

/// An open push channel.
///
/// Dropping `outbound` closes the socket with [`CLOSE_NORMAL`].
#[derive(Debug)]
pub struct PushChannel {
    pub inbound: mpsc::Receiver<Inbound>,
    pub outbound: mpsc::Sender<String>,
}

impl PushChannel {
    /// Create a channel pair. The returned [`PushPeer`] is the socket side.
    pub fn pair() -> (Self, PushPeer) {
        let (inbound_tx, inbound_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (outbound_tx, outbound_rx) = mpsc::channel(CHANNEL_CAPACITY);
        (
            Self {
                inbound: inbound_rx,
                outbound: outbound_tx,
            },
            PushPeer {
                inbound: inbound_tx,
                outbound: outbound_rx,
            },
        )
    }
}

/// The socket side of a [`PushChannel`].
#[derive(Debug)]
pub struct PushPeer {
    pub inbound: mpsc::Sender<Inbound>,
    pub outbound: mpsc::Receiver<String>,
}

/// Opens push channels.
///
/// The production implementation is [`WsConnector`]; tests substitute
/// scripted connectors.
pub trait Connector: Send + Sync + 'static {
    fn open(&self, url: Url) -> BoxFuture<'static, Result<PushChannel, Error>>;
}

// ── WebSocket connector ──────────────────────────────────────────────

/// Connector backed by `tokio-tungstenite`.
#[derive(Debug, Clone, Copy, Default)]
pub struct WsConnector;

impl Connector for WsConnector {
    fn open(&self, url: Url) -> BoxFuture<'static, Result<PushChannel, Error>> {
        Box::pin(async move {
            tracing::info!(url = %redacted(&url), "Connecting to push channel");

            let uri: tungstenite::http::Uri = url.as_str().parse().map_err(
                |e: tungstenite::http::uri::InvalidUri| Error::WebSocketConnect(e.to_string()),
            )?;

            let (ws_stream, _response) = tokio_tungstenite::connect_async(uri)
                .await
                .map_err(|e| Error::WebSocketConnect(e.to_string()))?;

            tracing::info!("Push channel connected");

            let (channel, peer) = PushChannel::pair();
            tokio::spawn(pump(ws_stream, peer));
            Ok(channel)
        })
    }
}

/// Shuttle frames between the socket and the channel pair until either
/// side goes away.
async fn pump<S>(ws_stream: tokio_tungstenite::WebSocketStream<S>, mut peer: PushPeer)
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
{
    let (mut write, mut read) = ws_stream.split();

    loop {
        tokio::select! {
            outgoing = peer.outbound.recv() => {
                let Some(text) = outgoing else {
                    // Owner dropped the channel: deliberate close.
                    let frame = CloseFrame {
                        code: CloseCode::Normal,
                        reason: Utf8Bytes::from_static("client disconnect"),
                    };
                    if let Err(e) = write.send(Message::Close(Some(frame))).await {
                        tracing::debug!(error = %e, "Close frame not delivered");
                    }
                    break;
                };
                if let Err(e) = write.send(Message::Text(text.into())).await {
                    let _ = peer.inbound.send(Inbound::Failed(e.to_string())).await;
                    break;
                }
            }
            frame = read.next() => {
                let event = match frame {
                    Some(Ok(Message::Text(text))) => Inbound::Text(text.as_str().to_owned()),
                    Some(Ok(Message::Close(frame))) => {
                        let (code, reason) = frame.map_or_else(
                            || (CLOSE_NO_STATUS, String::new()),
                            |cf| (u16::from(cf.code), cf.reason.as_str().to_owned()),
                        );
                        tracing::info!(code, reason = %reason, "Push channel close frame received");
                        let _ = peer.inbound.send(Inbound::Closed { code, reason }).await;
                        break;
                    }
                    Some(Ok(Message::Ping(_))) => {
                        // tungstenite handles pong replies automatically
                        tracing::trace!("Push channel ping");
                        continue;
                    }
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => {
                        let _ = peer.inbound.send(Inbound::Failed(e.to_string())).await;
                        break;
                    }
                    None => {
                        tracing::info!("Push channel stream ended");
                        let _ = peer
                            .inbound
                            .send(Inbound::Closed {
                                code: CLOSE_ABNORMAL,
                                reason: "stream ended".into(),
                            })
                            .await;
                        break;
                    }
                };
                if peer.inbound.send(event).await.is_err() {
                    // Owner gone; the outbound branch will observe it next.
                    tracing::debug!("Push channel owner dropped inbound receiver");
                }
            }
        }
    }

    tracing::debug!("Push channel pump exiting");
}

// ── Tests ────────────────────────────────────────────────────────────
