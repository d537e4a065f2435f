// Notification history endpoints
//
// Listing with pagination and filters, single lookup, read-state
// mutations, clear-all and the unread counter.

use tracing::debug;

use crate::error::Error;
use crate::history::client::HistoryClient;
use crate::history::models::{
    HistoryQuery, MarkReadRequest, NotificationPage, NotificationRecord, UnreadCount,
};

impl HistoryClient {
    /// List one page of notifications.
    ///
    /// `GET /notifications/?page=&page_size=&is_read=&notification_type=`
    pub async fn list_notifications(&self, query: &HistoryQuery) -> Result<NotificationPage, Error> {
        let url = self.api_url("notifications/")?;
        debug!(page = query.page, page_size = query.page_size, "listing notifications");
        self.get(url, &query.to_pairs()).await
    }

    /// Fetch a single notification.
    ///
    /// `GET /notifications/{id}/`
    pub async fn get_notification(&self, id: u64) -> Result<NotificationRecord, Error> {
        let url = self.api_url(&format!("notifications/{id}/"))?;
        self.get(url, &[]).await
    }

    /// Mark the given notifications read in one request.
    ///
    /// `POST /notifications/mark-read/` with `{"notification_ids": [...]}`
    pub async fn mark_read(&self, ids: &[u64]) -> Result<(), Error> {
        let url = self.api_url("notifications/mark-read/")?;
        debug!(count = ids.len(), "marking notifications read");
        self.post_empty(url, Some(&MarkReadRequest { notification_ids: ids }))
            .await
    }

    /// Mark every notification read.
    ///
    /// `POST /notifications/mark-all-read/`
    pub async fn mark_all_read(&self) -> Result<(), Error> {
        let url = self.api_url("notifications/mark-all-read/")?;
        self.post_empty(url, None::<&()>).await
    }

    /// Delete every notification. Irreversible.
    ///
    /// `DELETE /notifications/clear-all/`
    pub async fn clear_all(&self) -> Result<(), Error> {
        let url = self.api_url("notifications/clear-all/")?;
        debug!("clearing notification history");
        self.delete_empty(url).await
    }

    /// Authoritative unread total.
    ///
    /// `GET /notifications/unread-count/`
    pub async fn unread_count(&self) -> Result<u64, Error> {
        let url = self.api_url("notifications/unread-count/")?;
        let body: UnreadCount = self.get(url, &[]).await?;
        Ok(body.unread_count)
    }
}
