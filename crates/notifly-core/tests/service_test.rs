#![allow(clippy::unwrap_used)]
// End-to-end tests for `NotificationService` with an in-memory push channel.

use std::sync::Arc;

use futures_util::future::BoxFuture;
use pretty_assertions::assert_eq;
use secrecy::SecretString;
use tokio::sync::{mpsc, watch};
use url::Url;

use notifly_api::push::{Inbound, PushChannel, PushPeer};
use notifly_core::{
    AssumeYes, ConnectionState, ConnectionStatus, Connector, FrameType, NotificationKind,
    NotificationService, NotiflyConfig, Origin,
};

/// Accepts every connection and hands the socket side to the test.
struct LoopbackConnector {
    peers: mpsc::UnboundedSender<PushPeer>,
}

impl Connector for LoopbackConnector {
    fn open(&self, _url: Url) -> BoxFuture<'static, Result<PushChannel, notifly_api::Error>> {
        let (channel, peer) = PushChannel::pair();
        self.peers.send(peer).unwrap();
        Box::pin(async move { Ok(channel) })
    }
}

fn service() -> (NotificationService, mpsc::UnboundedReceiver<PushPeer>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let config = NotiflyConfig::new(
        Url::parse("https://console.example.com/api/").unwrap(),
        Url::parse("wss://console.example.com").unwrap(),
    );
    let service = NotificationService::new(
        config,
        Arc::new(LoopbackConnector { peers: tx }),
        Arc::new(AssumeYes),
    );
    (service, rx)
}

async fn wait_for(service: &NotificationService, target: ConnectionState) {
    service
        .connection()
        .watch_state()
        .wait_for(|s| *s == target)
        .await
        .unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_repo_assigned_push_reaches_store_and_listeners() {
    let (service, mut peers) = service();
    let (_id, mut frames) = service.bus().subscribe_channel();
    let (session_tx, session_rx) = watch::channel(None);
    service.bind_session(session_rx);

    session_tx
        .send(Some(SecretString::from("tok".to_string())))
        .unwrap();
    let peer = peers.recv().await.unwrap();
    wait_for(&service, ConnectionState::Open).await;

    let connected = frames.recv().await.unwrap();
    assert_eq!(connected.status, Some(ConnectionStatus::Connected));

    peer.inbound
        .send(Inbound::Text(
            r#"{"type":"notification","notification_type":"repo_assigned","title":"X","message":"Y","data":{"repository":"api"}}"#
                .into(),
        ))
        .await
        .unwrap();

    let frame = frames.recv().await.unwrap();
    assert_eq!(frame.frame_type, FrameType::Notification);

    let cached = service.store().notifications();
    assert_eq!(cached.len(), 1);
    assert_eq!(cached[0].kind, NotificationKind::RepoAssigned);
    assert_eq!(cached[0].title, "X");
    assert_eq!(cached[0].message, "Y");
    assert_eq!(cached[0].payload["repository"], "api");
    assert_eq!(cached[0].origin, Origin::Push);
    assert!(!cached[0].is_read);
    assert_eq!(service.store().unread_count(), 1);

    service.dispose().await;
}

#[tokio::test(start_paused = true)]
async fn test_logout_purges_and_dispose_is_final() {
    let (service, mut peers) = service();
    let (session_tx, session_rx) = watch::channel(None);
    service.bind_session(session_rx);

    session_tx
        .send(Some(SecretString::from("tok".to_string())))
        .unwrap();
    let peer = peers.recv().await.unwrap();
    wait_for(&service, ConnectionState::Open).await;

    peer.inbound
        .send(Inbound::Text(r#"{"type":"notification"}"#.into()))
        .await
        .unwrap();
    service
        .store()
        .subscribe()
        .wait_for(|c| c.len() == 1)
        .await
        .unwrap();

    session_tx.send(None).unwrap();
    wait_for(&service, ConnectionState::Closed).await;
    service
        .store()
        .subscribe()
        .wait_for(|c| c.is_empty())
        .await
        .unwrap();
    assert!(!service.sync().is_authorized());

    service.dispose().await;
    assert!(service.is_disposed());
    assert!(!service.store().is_attached());
    assert_eq!(service.connection().state(), ConnectionState::Closed);

    // Disposing twice is harmless.
    service.dispose().await;
}

#[tokio::test(start_paused = true)]
async fn test_independent_instances_do_not_share_state() {
    let (first, mut first_peers) = service();
    let (second, _second_peers) = service();

    first
        .start(&SecretString::from("tok".to_string()))
        .await
        .unwrap();
    let peer = first_peers.recv().await.unwrap();
    wait_for(&first, ConnectionState::Open).await;
    peer.inbound
        .send(Inbound::Text(r#"{"type":"notification"}"#.into()))
        .await
        .unwrap();
    first
        .store()
        .subscribe()
        .wait_for(|c| c.len() == 1)
        .await
        .unwrap();

    assert_eq!(second.store().len(), 0);
    assert_eq!(second.connection().state(), ConnectionState::Disconnected);

    first.dispose().await;
    second.dispose().await;
}
