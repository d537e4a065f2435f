// History API request/response types
//
// Models for the notification history endpoints. Fields use
// `#[serde(default)]` where the backend omits empty values.

use serde::{Deserialize, Serialize};

// ── Notification ─────────────────────────────────────────────────────

/// A notification as stored by the history backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NotificationRecord {
    pub id: u64,
    /// `repo_assigned`, `member_joined`, `critical_finding`, ...
    pub notification_type: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub data: serde_json::Value,
    /// ISO-8601 creation timestamp.
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub is_read: bool,
}

// ── Pagination ───────────────────────────────────────────────────────

/// Paginated list envelope: `{ "results": [...], "count": N }`.
#[derive(Debug, Clone, Deserialize)]
pub struct NotificationPage {
    pub results: Vec<NotificationRecord>,
    /// Total matching items across all pages.
    pub count: u64,
}

/// Query parameters for `GET /notifications/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryQuery {
    /// 1-based page number.
    pub page: u32,
    pub page_size: u32,
    pub is_read: Option<bool>,
    pub notification_type: Option<String>,
}

impl HistoryQuery {
    pub(crate) fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("page", self.page.to_string()),
            ("page_size", self.page_size.to_string()),
        ];
        if let Some(read) = self.is_read {
            pairs.push(("is_read", read.to_string()));
        }
        if let Some(ref kind) = self.notification_type {
            pairs.push(("notification_type", kind.clone()));
        }
        pairs
    }
}

// ── Mutations ────────────────────────────────────────────────────────

/// Body of `POST /notifications/mark-read/`.
#[derive(Debug, Serialize)]
pub(crate) struct MarkReadRequest<'a> {
    pub notification_ids: &'a [u64],
}

/// Response of `GET /notifications/unread-count/`.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct UnreadCount {
    pub unread_count: u64,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn query_omits_unset_filters() {
        let query = HistoryQuery {
            page: 2,
            page_size: 20,
            is_read: None,
            notification_type: None,
        };
        assert_eq!(
            query.to_pairs(),
            vec![("page", "2".to_string()), ("page_size", "20".to_string())]
        );
    }

    #[test]
    fn query_includes_filters() {
        let query = HistoryQuery {
            page: 1,
            page_size: 20,
            is_read: Some(false),
            notification_type: Some("scan_complete".into()),
        };
        let pairs = query.to_pairs();
        assert!(pairs.contains(&("is_read", "false".to_string())));
        assert!(pairs.contains(&("notification_type", "scan_complete".to_string())));
    }

    #[test]
    fn record_tolerates_missing_optionals() {
        let json = r#"{"id": 9, "notification_type": "other"}"#;
        let record: NotificationRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.id, 9);
        assert!(!record.is_read);
        assert!(record.title.is_empty());
        assert!(record.data.is_null());
    }
}
