//! Named balances with optional savings targets.

use super::Store;
use crate::models::Account;
use tally_core::error::TallyError;
use uuid::Uuid;

const ACCOUNT_COLUMNS: &str = "id, user_id, name, balance, target, updated_at";

impl Store {
    /// Create or update an account by name. `None` balance/target leave the
    /// existing values in place on conflict.
    pub async fn upsert_account(
        &self,
        user_id: &str,
        name: &str,
        balance: Option<f64>,
        target: Option<f64>,
    ) -> Result<Account, TallyError> {
        let id = Uuid::new_v4().to_string();
        sqlx::query(
            "INSERT INTO accounts (id, user_id, name, balance, target, updated_at)
             VALUES (?, ?, ?, COALESCE(?, 0), ?, datetime('now'))
             ON CONFLICT(user_id, name) DO UPDATE SET
                balance = COALESCE(excluded.balance, accounts.balance),
                target = COALESCE(excluded.target, accounts.target),
                updated_at = datetime('now')",
        )
        .bind(&id)
        .bind(user_id)
        .bind(name)
        .bind(balance)
        .bind(target)
        .execute(self.pool())
        .await
        .map_err(|e| TallyError::Store(format!("failed to upsert account: {e}")))?;

        self.get_account(user_id, name)
            .await?
            .ok_or_else(|| TallyError::Store("account vanished after upsert".into()))
    }

    /// Fetch an account by name, case-insensitive.
    pub async fn get_account(
        &self,
        user_id: &str,
        name: &str,
    ) -> Result<Option<Account>, TallyError> {
        sqlx::query_as::<_, Account>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts
             WHERE user_id = ? AND name = ? COLLATE NOCASE"
        ))
        .bind(user_id)
        .bind(name)
        .fetch_optional(self.pool())
        .await
        .map_err(|e| TallyError::Store(format!("failed to get account: {e}")))
    }

    /// List a user's accounts alphabetically.
    pub async fn list_accounts(&self, user_id: &str) -> Result<Vec<Account>, TallyError> {
        sqlx::query_as::<_, Account>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts
             WHERE user_id = ? ORDER BY name ASC"
        ))
        .bind(user_id)
        .fetch_all(self.pool())
        .await
        .map_err(|e| TallyError::Store(format!("failed to list accounts: {e}")))
    }

    /// Delete an account by name. Returns whether a row was removed.
    pub async fn delete_account(&self, user_id: &str, name: &str) -> Result<bool, TallyError> {
        let result =
            sqlx::query("DELETE FROM accounts WHERE user_id = ? AND name = ? COLLATE NOCASE")
                .bind(user_id)
                .bind(name)
                .execute(self.pool())
                .await
                .map_err(|e| TallyError::Store(format!("failed to delete account: {e}")))?;
        Ok(result.rows_affected() > 0)
    }
}
