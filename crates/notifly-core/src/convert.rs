// ── Wire-to-domain conversions ──
//
// Bridges `notifly_api` push frames and history records into the single
// `Notification` domain type, so the cache and the history views render
// the same struct regardless of source.

use chrono::{DateTime, Utc};

use notifly_api::PushFrame;
use notifly_api::history::NotificationRecord;

use crate::model::{Notification, NotificationId, NotificationKind, Origin};

/// Parse an ISO-8601 timestamp, dropping unparseable values.
fn parse_datetime(raw: Option<&str>) -> Option<DateTime<Utc>> {
    raw.and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

/// Push timestamps arrive as ISO-8601 strings or epoch seconds.
fn push_datetime(raw: Option<&serde_json::Value>) -> Option<DateTime<Utc>> {
    match raw? {
        serde_json::Value::String(s) => parse_datetime(Some(s)),
        serde_json::Value::Number(n) => n.as_i64().and_then(|secs| DateTime::from_timestamp(secs, 0)),
        _ => None,
    }
}

impl From<NotificationRecord> for Notification {
    fn from(record: NotificationRecord) -> Self {
        Self {
            id: NotificationId::Server(record.id),
            kind: NotificationKind::from_wire(&record.notification_type),
            title: record.title,
            message: record.message,
            payload: record.data,
            created_at: parse_datetime(record.created_at.as_deref()),
            is_read: record.is_read,
            origin: Origin::Pull,
        }
    }
}

/// Build an unread notification from a `notification` push frame.
///
/// The caller picks the id: the frame's server id when present, otherwise a
/// freshly allocated local one.
pub(crate) fn from_push(frame: &PushFrame, id: NotificationId) -> Notification {
    Notification {
        id,
        kind: frame
            .notification_type
            .as_deref()
            .map_or(NotificationKind::Other, NotificationKind::from_wire),
        title: frame.title.clone().unwrap_or_default(),
        message: frame.message.clone().unwrap_or_default(),
        payload: frame.data.clone().unwrap_or(serde_json::Value::Null),
        created_at: push_datetime(frame.timestamp.as_ref()),
        is_read: false,
        origin: Origin::Push,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn record_converts_with_server_id() {
        let record: NotificationRecord = serde_json::from_value(serde_json::json!({
            "id": 17,
            "notification_type": "scan_complete",
            "title": "Scan finished",
            "message": "3 findings",
            "data": {"scan_id": 9},
            "created_at": "2026-10-01T08:30:00+02:00",
            "is_read": true
        }))
        .unwrap();

        let n = Notification::from(record);
        assert_eq!(n.id, NotificationId::Server(17));
        assert_eq!(n.kind, NotificationKind::ScanComplete);
        assert_eq!(n.payload["scan_id"], 9);
        assert_eq!(n.created_at.unwrap().to_rfc3339(), "2026-10-01T06:30:00+00:00");
        assert!(n.is_read);
        assert_eq!(n.origin, Origin::Pull);
    }

    #[test]
    fn push_frame_converts_unread_with_defaults() {
        let frame = PushFrame::parse(r#"{"type":"notification","timestamp":"garbage"}"#).unwrap();
        let n = from_push(&frame, NotificationId::Local(1));
        assert_eq!(n.kind, NotificationKind::Other);
        assert_eq!(n.title, "");
        assert!(n.created_at.is_none());
        assert!(!n.is_read);
        assert_eq!(n.origin, Origin::Push);
    }

    #[test]
    fn push_timestamp_accepts_epoch_seconds() {
        let frame = PushFrame::parse(r#"{"type":"notification","timestamp":1760000000}"#).unwrap();
        let n = from_push(&frame, NotificationId::Local(1));
        assert_eq!(n.created_at.unwrap().timestamp(), 1_760_000_000);

        let frame = PushFrame::parse(r#"{"type":"notification","timestamp":"2026-10-01T12:00:00Z"}"#).unwrap();
        let n = from_push(&frame, NotificationId::Local(2));
        assert_eq!(n.created_at.unwrap().to_rfc3339(), "2026-10-01T12:00:00+00:00");
    }
}
