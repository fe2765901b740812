//! Ledger entries and aggregates.

use super::Store;
use crate::models::{Transaction, TxCategory};
use tally_core::error::TallyError;
use uuid::Uuid;

const TX_COLUMNS: &str = "id, user_id, description, amount, category, notes, created_at";

impl Store {
    /// Record a ledger entry and return it.
    pub async fn add_transaction(
        &self,
        user_id: &str,
        description: &str,
        amount: f64,
        category: TxCategory,
        notes: Option<&str>,
    ) -> Result<Transaction, TallyError> {
        let id = Uuid::new_v4().to_string();
        sqlx::query(
            "INSERT INTO transactions (id, user_id, description, amount, category, notes, created_at)
             VALUES (?, ?, ?, ?, ?, ?, datetime('now'))",
        )
        .bind(&id)
        .bind(user_id)
        .bind(description)
        .bind(amount)
        .bind(category)
        .bind(notes)
        .execute(self.pool())
        .await
        .map_err(|e| TallyError::Store(format!("failed to add transaction: {e}")))?;

        self.get_transaction(user_id, &id)
            .await?
            .ok_or_else(|| TallyError::Store("transaction vanished after insert".into()))
    }

    /// Fetch a single entry scoped to its owner.
    pub async fn get_transaction(
        &self,
        user_id: &str,
        id: &str,
    ) -> Result<Option<Transaction>, TallyError> {
        sqlx::query_as::<_, Transaction>(&format!(
            "SELECT {TX_COLUMNS} FROM transactions WHERE user_id = ? AND id = ?"
        ))
        .bind(user_id)
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(|e| TallyError::Store(format!("failed to get transaction: {e}")))
    }

    /// List a user's most recent entries, newest first.
    pub async fn recent_transactions(
        &self,
        user_id: &str,
        limit: i64,
    ) -> Result<Vec<Transaction>, TallyError> {
        sqlx::query_as::<_, Transaction>(&format!(
            "SELECT {TX_COLUMNS} FROM transactions
             WHERE user_id = ? ORDER BY created_at DESC LIMIT ?"
        ))
        .bind(user_id)
        .bind(limit)
        .fetch_all(self.pool())
        .await
        .map_err(|e| TallyError::Store(format!("failed to list transactions: {e}")))
    }

    /// Apply partial updates to an entry.
    pub async fn update_transaction(
        &self,
        user_id: &str,
        id: &str,
        description: Option<&str>,
        amount: Option<f64>,
        category: Option<TxCategory>,
        notes: Option<&str>,
    ) -> Result<Option<Transaction>, TallyError> {
        let result = sqlx::query(
            "UPDATE transactions SET
                description = COALESCE(?, description),
                amount = COALESCE(?, amount),
                category = COALESCE(?, category),
                notes = COALESCE(?, notes)
             WHERE user_id = ? AND id = ?",
        )
        .bind(description)
        .bind(amount)
        .bind(category)
        .bind(notes)
        .bind(user_id)
        .bind(id)
        .execute(self.pool())
        .await
        .map_err(|e| TallyError::Store(format!("failed to update transaction: {e}")))?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_transaction(user_id, id).await
    }

    /// Delete an entry. Returns whether a row was removed.
    pub async fn delete_transaction(&self, user_id: &str, id: &str) -> Result<bool, TallyError> {
        let result = sqlx::query("DELETE FROM transactions WHERE user_id = ? AND id = ?")
            .bind(user_id)
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(|e| TallyError::Store(format!("failed to delete transaction: {e}")))?;
        Ok(result.rows_affected() > 0)
    }

    /// Sum amounts per category over the last `days` days.
    pub async fn totals_by_category(
        &self,
        user_id: &str,
        days: i64,
    ) -> Result<Vec<(TxCategory, f64)>, TallyError> {
        sqlx::query_as::<_, (TxCategory, f64)>(
            "SELECT category, SUM(amount) FROM transactions
             WHERE user_id = ? AND created_at >= datetime('now', '-' || ? || ' days')
             GROUP BY category",
        )
        .bind(user_id)
        .bind(days)
        .fetch_all(self.pool())
        .await
        .map_err(|e| TallyError::Store(format!("failed to total by category: {e}")))
    }

    /// Total income (positive amounts) and spend (negative amounts, returned
    /// as a positive number) over the last `days` days.
    pub async fn income_and_spend(
        &self,
        user_id: &str,
        days: i64,
    ) -> Result<(f64, f64), TallyError> {
        let row: (Option<f64>, Option<f64>) = sqlx::query_as(
            "SELECT
                SUM(CASE WHEN amount > 0 THEN amount ELSE 0 END),
                SUM(CASE WHEN amount < 0 THEN -amount ELSE 0 END)
             FROM transactions
             WHERE user_id = ? AND created_at >= datetime('now', '-' || ? || ' days')",
        )
        .bind(user_id)
        .bind(days)
        .fetch_one(self.pool())
        .await
        .map_err(|e| TallyError::Store(format!("failed to sum income/spend: {e}")))?;

        Ok((row.0.unwrap_or(0.0), row.1.unwrap_or(0.0)))
    }
}
