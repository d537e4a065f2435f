#![allow(clippy::unwrap_used)]
// Integration tests for `SyncController` against a wiremock history API.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::json;
use url::Url;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use notifly_api::HistoryClient;
use notifly_core::{
    AssumeYes, Confirm, CoreError, EventBus, HistoryConfig, HistoryFilters, NotificationId,
    NotificationStore, PushFrame, SyncController,
};

// ── Helpers ─────────────────────────────────────────────────────────

struct Fixture {
    server: MockServer,
    bus: EventBus,
    store: NotificationStore,
    sync: SyncController,
}

async fn setup(confirm: Arc<dyn Confirm>) -> Fixture {
    let server = MockServer::start().await;
    let base_url = Url::parse(&format!("{}/api/", server.uri())).unwrap();
    let client = HistoryClient::with_client(reqwest::Client::new(), base_url);
    let bus = EventBus::new();
    let store = NotificationStore::new(&bus);
    let sync = SyncController::with_client(client, HistoryConfig::default(), store.clone(), confirm);
    Fixture {
        server,
        bus,
        store,
        sync,
    }
}

fn record(id: u64, is_read: bool) -> serde_json::Value {
    json!({
        "id": id,
        "notification_type": "critical_finding",
        "title": format!("Finding {id}"),
        "message": "CVE detected",
        "data": {"severity": "critical"},
        "created_at": "2026-10-01T12:00:00Z",
        "is_read": is_read
    })
}

/// Push `count` notifications carrying server ids `1..=count`.
fn push_server_notifications(bus: &EventBus, count: u64) {
    for id in 1..=count {
        let frame = PushFrame::parse(&format!(
            r#"{{"type":"notification","id":{id},"notification_type":"critical_finding"}}"#
        ))
        .unwrap();
        bus.publish(&frame);
    }
}

async fn mount_first_page_of_25_unread(server: &MockServer) {
    let results: Vec<_> = (1..=20).map(|id| record(id, false)).collect();
    Mock::given(method("GET"))
        .and(path("/api/notifications/"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": results,
            "count": 25
        })))
        .mount(server)
        .await;
}

// ── Listing ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_list_read_page_two() {
    let f = setup(Arc::new(AssumeYes)).await;

    Mock::given(method("GET"))
        .and(path("/api/notifications/"))
        .and(query_param("page", "2"))
        .and(query_param("page_size", "20"))
        .and(query_param("is_read", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [record(21, true), record(22, true)],
            "count": 42
        })))
        .expect(1)
        .mount(&f.server)
        .await;

    let filters = HistoryFilters {
        is_read: Some(true),
        kind: None,
    };
    let page = f.sync.list(&filters, 2).await.unwrap();

    assert_eq!(page.page, 2);
    assert_eq!(page.total_pages, 3);
    assert_eq!(page.count, 42);
    assert_eq!(page.items.len(), 2);
    assert_eq!(page.items[0].id, NotificationId::Server(21));
    assert!(page.items.iter().all(|n| n.is_read));
}

#[tokio::test]
async fn test_kind_filter_is_forwarded() {
    let f = setup(Arc::new(AssumeYes)).await;

    Mock::given(method("GET"))
        .and(path("/api/notifications/"))
        .and(query_param("notification_type", "critical_finding"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [],
            "count": 0
        })))
        .expect(1)
        .mount(&f.server)
        .await;

    let filters = HistoryFilters {
        is_read: None,
        kind: Some("critical_finding".into()),
    };
    let page = f.sync.list(&filters, 1).await.unwrap();
    assert_eq!(page.total_pages, 0);
    assert!(page.items.is_empty());
}

#[tokio::test]
async fn test_unauthorized_controller_refuses_requests() {
    let config = notifly_core::NotiflyConfig::new(
        Url::parse("http://127.0.0.1:9/api/").unwrap(),
        Url::parse("ws://127.0.0.1:9").unwrap(),
    );
    let bus = EventBus::new();
    let sync = SyncController::new(&config, NotificationStore::new(&bus), Arc::new(AssumeYes));

    let err = sync.list(&HistoryFilters::default(), 1).await.unwrap_err();
    assert!(matches!(err, CoreError::NotAuthenticated));
}

// ── Auto mark-read ──────────────────────────────────────────────────

#[tokio::test]
async fn test_view_closed_before_delay_sends_nothing() {
    let f = setup(Arc::new(AssumeYes)).await;
    push_server_notifications(&f.bus, 25);
    mount_first_page_of_25_unread(&f.server).await;

    Mock::given(method("POST"))
        .and(path("/api/notifications/mark-read/"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&f.server)
        .await;

    let view = f
        .sync
        .open_page(&HistoryFilters::default(), 1)
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    drop(view);
    tokio::time::sleep(Duration::from_millis(700)).await;

    assert_eq!(f.store.unread_count(), 25);
}

#[tokio::test]
async fn test_view_marks_page_read_in_one_batch() {
    let f = setup(Arc::new(AssumeYes)).await;
    push_server_notifications(&f.bus, 25);
    mount_first_page_of_25_unread(&f.server).await;

    let ids: Vec<u64> = (1..=20).collect();
    Mock::given(method("POST"))
        .and(path("/api/notifications/mark-read/"))
        .and(body_json(json!({ "notification_ids": ids })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&f.server)
        .await;

    let view = f
        .sync
        .open_page(&HistoryFilters::default(), 1)
        .await
        .unwrap();
    assert!(view.page().items.iter().all(|n| !n.is_read));

    let page = view.finish().await;
    assert!(page.items.iter().all(|n| n.is_read));
    assert_eq!(f.store.unread_count(), 5);
}

#[tokio::test]
async fn test_page_without_unread_schedules_nothing() {
    let f = setup(Arc::new(AssumeYes)).await;

    Mock::given(method("GET"))
        .and(path("/api/notifications/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [record(1, true)],
            "count": 1
        })))
        .mount(&f.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/notifications/mark-read/"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&f.server)
        .await;

    let view = f
        .sync
        .open_page(&HistoryFilters::default(), 1)
        .await
        .unwrap();
    assert!(!view.is_pending());
    let page = view.finish().await;
    assert_eq!(page.items.len(), 1);
}

// ── Mutations ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_clear_all_declined_sends_nothing() {
    let asked = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&asked);
    let decline = move |_: &str| {
        counter.fetch_add(1, Ordering::SeqCst);
        false
    };
    let f = setup(Arc::new(decline)).await;
    push_server_notifications(&f.bus, 3);

    Mock::given(method("DELETE"))
        .and(path("/api/notifications/clear-all/"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&f.server)
        .await;

    assert!(!f.sync.clear_all().await.unwrap());
    assert_eq!(asked.load(Ordering::SeqCst), 1);
    assert_eq!(f.store.len(), 3);
}

#[tokio::test]
async fn test_clear_all_confirmed_purges_cache() {
    let f = setup(Arc::new(AssumeYes)).await;
    push_server_notifications(&f.bus, 3);

    Mock::given(method("DELETE"))
        .and(path("/api/notifications/clear-all/"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&f.server)
        .await;

    assert!(f.sync.clear_all().await.unwrap());
    assert!(f.store.is_empty());
    assert_eq!(f.store.unread_count(), 0);
}

#[tokio::test]
async fn test_mark_all_read_updates_cache() {
    let f = setup(Arc::new(AssumeYes)).await;
    push_server_notifications(&f.bus, 4);

    Mock::given(method("POST"))
        .and(path("/api/notifications/mark-all-read/"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&f.server)
        .await;

    f.sync.mark_all_read().await.unwrap();
    assert_eq!(f.store.unread_count(), 0);
    assert_eq!(f.store.server_unread(), Some(0));
}

#[tokio::test]
async fn test_failed_mutation_leaves_cache_unchanged() {
    let f = setup(Arc::new(AssumeYes)).await;
    push_server_notifications(&f.bus, 4);

    Mock::given(method("POST"))
        .and(path("/api/notifications/mark-all-read/"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&f.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/notifications/mark-read/"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&f.server)
        .await;

    let err = f.sync.mark_all_read().await.unwrap_err();
    assert!(matches!(
        err,
        CoreError::HistoryFetch {
            status: Some(503),
            ..
        }
    ));
    assert!(err.is_recoverable());

    f.sync.mark_read(&[1, 2]).await.unwrap_err();
    assert_eq!(f.store.unread_count(), 4);
    assert_eq!(f.store.server_unread(), None);
}

#[tokio::test]
async fn test_mark_read_empty_sends_nothing() {
    let f = setup(Arc::new(AssumeYes)).await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&f.server)
        .await;

    f.sync.mark_read(&[]).await.unwrap();
}

#[tokio::test]
async fn test_unread_count_reconciles_server_total() {
    let f = setup(Arc::new(AssumeYes)).await;
    push_server_notifications(&f.bus, 2);

    Mock::given(method("GET"))
        .and(path("/api/notifications/unread-count/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"unread_count": 37})))
        .expect(1)
        .mount(&f.server)
        .await;

    assert_eq!(f.sync.unread_count().await.unwrap(), 37);
    assert_eq!(f.store.server_unread(), Some(37));
    assert_eq!(f.store.unread_count(), 2);
}

#[tokio::test]
async fn test_get_missing_is_not_found() {
    let f = setup(Arc::new(AssumeYes)).await;

    Mock::given(method("GET"))
        .and(path("/api/notifications/404/"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&f.server)
        .await;

    let err = f.sync.get(404).await.unwrap_err();
    assert!(matches!(err, CoreError::NotFound { .. }));
}
