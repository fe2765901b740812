//! CRM lead CRUD and rollups.

use super::Store;
use crate::models::{Lead, LeadStatus};
use tally_core::error::TallyError;
use uuid::Uuid;

const LEAD_COLUMNS: &str =
    "id, user_id, name, phone, email, status, notes, created_at, updated_at";

impl Store {
    /// Create a new lead and return it.
    pub async fn create_lead(
        &self,
        user_id: &str,
        name: &str,
        phone: Option<&str>,
        email: Option<&str>,
        status: LeadStatus,
        notes: Option<&str>,
    ) -> Result<Lead, TallyError> {
        let id = Uuid::new_v4().to_string();
        sqlx::query(
            "INSERT INTO leads (id, user_id, name, phone, email, status, notes, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, datetime('now'), datetime('now'))",
        )
        .bind(&id)
        .bind(user_id)
        .bind(name)
        .bind(phone)
        .bind(email)
        .bind(status)
        .bind(notes)
        .execute(self.pool())
        .await
        .map_err(|e| TallyError::Store(format!("failed to create lead: {e}")))?;

        self.get_lead(user_id, &id)
            .await?
            .ok_or_else(|| TallyError::Store("lead vanished after insert".into()))
    }

    /// Fetch a single lead scoped to its owner.
    pub async fn get_lead(&self, user_id: &str, id: &str) -> Result<Option<Lead>, TallyError> {
        sqlx::query_as::<_, Lead>(&format!(
            "SELECT {LEAD_COLUMNS} FROM leads WHERE user_id = ? AND id = ?"
        ))
        .bind(user_id)
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(|e| TallyError::Store(format!("failed to get lead: {e}")))
    }

    /// List a user's leads, newest first.
    pub async fn list_leads(&self, user_id: &str, limit: i64) -> Result<Vec<Lead>, TallyError> {
        sqlx::query_as::<_, Lead>(&format!(
            "SELECT {LEAD_COLUMNS} FROM leads
             WHERE user_id = ? ORDER BY created_at DESC LIMIT ?"
        ))
        .bind(user_id)
        .bind(limit)
        .fetch_all(self.pool())
        .await
        .map_err(|e| TallyError::Store(format!("failed to list leads: {e}")))
    }

    /// List a user's leads filtered by status, newest first.
    pub async fn list_leads_by_status(
        &self,
        user_id: &str,
        status: LeadStatus,
    ) -> Result<Vec<Lead>, TallyError> {
        sqlx::query_as::<_, Lead>(&format!(
            "SELECT {LEAD_COLUMNS} FROM leads
             WHERE user_id = ? AND status = ? ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .bind(status)
        .fetch_all(self.pool())
        .await
        .map_err(|e| TallyError::Store(format!("failed to list leads by status: {e}")))
    }

    /// Apply partial updates to a lead. `None` fields are left untouched;
    /// notes replace whatever was stored (merge policy lives upstream).
    pub async fn update_lead(
        &self,
        user_id: &str,
        id: &str,
        name: Option<&str>,
        phone: Option<&str>,
        email: Option<&str>,
        status: Option<LeadStatus>,
        notes: Option<&str>,
    ) -> Result<Option<Lead>, TallyError> {
        let result = sqlx::query(
            "UPDATE leads SET
                name = COALESCE(?, name),
                phone = COALESCE(?, phone),
                email = COALESCE(?, email),
                status = COALESCE(?, status),
                notes = COALESCE(?, notes),
                updated_at = datetime('now')
             WHERE user_id = ? AND id = ?",
        )
        .bind(name)
        .bind(phone)
        .bind(email)
        .bind(status)
        .bind(notes)
        .bind(user_id)
        .bind(id)
        .execute(self.pool())
        .await
        .map_err(|e| TallyError::Store(format!("failed to update lead: {e}")))?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_lead(user_id, id).await
    }

    /// Delete a lead. Returns whether a row was removed.
    pub async fn delete_lead(&self, user_id: &str, id: &str) -> Result<bool, TallyError> {
        let result = sqlx::query("DELETE FROM leads WHERE user_id = ? AND id = ?")
            .bind(user_id)
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(|e| TallyError::Store(format!("failed to delete lead: {e}")))?;
        Ok(result.rows_affected() > 0)
    }

    /// Count leads per status for the digest and pipeline summary.
    pub async fn count_leads_by_status(
        &self,
        user_id: &str,
    ) -> Result<Vec<(LeadStatus, i64)>, TallyError> {
        sqlx::query_as::<_, (LeadStatus, i64)>(
            "SELECT status, COUNT(*) FROM leads WHERE user_id = ? GROUP BY status",
        )
        .bind(user_id)
        .fetch_all(self.pool())
        .await
        .map_err(|e| TallyError::Store(format!("failed to count leads: {e}")))
    }
}
