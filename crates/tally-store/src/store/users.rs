//! User lookup and lazy onboarding.

use super::Store;
use crate::models::User;
use tally_core::error::TallyError;
use tracing::info;
use uuid::Uuid;

impl Store {
    /// Find a user by platform + chat id, creating one if none exists.
    /// Returns the user and whether it was just created.
    pub async fn ensure_user(
        &self,
        platform: &str,
        chat_id: &str,
        display_name: Option<&str>,
    ) -> Result<(User, bool), TallyError> {
        if let Some(user) = self.find_user(platform, chat_id).await? {
            return Ok((user, false));
        }

        let id = Uuid::new_v4().to_string();
        sqlx::query(
            "INSERT INTO users (id, platform, chat_id, display_name, created_at)
             VALUES (?, ?, ?, ?, datetime('now'))",
        )
        .bind(&id)
        .bind(platform)
        .bind(chat_id)
        .bind(display_name)
        .execute(self.pool())
        .await
        .map_err(|e| TallyError::Store(format!("failed to create user: {e}")))?;

        info!("Onboarded new {platform} user {id}");

        let user = self
            .find_user(platform, chat_id)
            .await?
            .ok_or_else(|| TallyError::Store("user vanished after insert".into()))?;
        Ok((user, true))
    }

    /// Look up a user by platform + chat id.
    pub async fn find_user(
        &self,
        platform: &str,
        chat_id: &str,
    ) -> Result<Option<User>, TallyError> {
        sqlx::query_as::<_, User>(
            "SELECT id, platform, chat_id, display_name, created_at
             FROM users WHERE platform = ? AND chat_id = ?",
        )
        .bind(platform)
        .bind(chat_id)
        .fetch_optional(self.pool())
        .await
        .map_err(|e| TallyError::Store(format!("failed to find user: {e}")))
    }

    /// List all users, oldest first.
    pub async fn list_users(&self) -> Result<Vec<User>, TallyError> {
        sqlx::query_as::<_, User>(
            "SELECT id, platform, chat_id, display_name, created_at
             FROM users ORDER BY created_at ASC",
        )
        .fetch_all(self.pool())
        .await
        .map_err(|e| TallyError::Store(format!("failed to list users: {e}")))
    }
}
