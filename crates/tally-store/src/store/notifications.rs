//! Digest delivery records.

use super::Store;
use crate::models::Notification;
use tally_core::error::TallyError;
use uuid::Uuid;

impl Store {
    /// Record a notification attempt, sent or failed.
    pub async fn record_notification(
        &self,
        user_id: &str,
        kind: &str,
        status: &str,
        error: Option<&str>,
    ) -> Result<(), TallyError> {
        sqlx::query(
            "INSERT INTO notifications (id, user_id, kind, status, error, sent_at)
             VALUES (?, ?, ?, ?, ?, datetime('now'))",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(user_id)
        .bind(kind)
        .bind(status)
        .bind(error)
        .execute(self.pool())
        .await
        .map_err(|e| TallyError::Store(format!("failed to record notification: {e}")))?;
        Ok(())
    }

    /// True if any notification of this kind was attempted for the user
    /// on the given local calendar date (YYYY-MM-DD). The stored UTC
    /// timestamp is converted to local time, so this reads the same
    /// clock as the scheduler's send-hour check. Failed attempts count;
    /// a broken digest run is not retried until the next day.
    pub async fn notified_on(
        &self,
        user_id: &str,
        kind: &str,
        local_date: &str,
    ) -> Result<bool, TallyError> {
        let count: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM notifications
             WHERE user_id = ? AND kind = ? AND date(sent_at, 'localtime') = ?",
        )
        .bind(user_id)
        .bind(kind)
        .bind(local_date)
        .fetch_one(self.pool())
        .await
        .map_err(|e| TallyError::Store(format!("failed to check notifications: {e}")))?;
        Ok(count.0 > 0)
    }

    /// Most recent notifications for a user, newest first.
    pub async fn recent_notifications(
        &self,
        user_id: &str,
        limit: i64,
    ) -> Result<Vec<Notification>, TallyError> {
        sqlx::query_as::<_, Notification>(
            "SELECT id, user_id, kind, status, error, sent_at FROM notifications
             WHERE user_id = ? ORDER BY sent_at DESC LIMIT ?",
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(self.pool())
        .await
        .map_err(|e| TallyError::Store(format!("failed to list notifications: {e}")))
    }
}
