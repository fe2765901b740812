use crate::{error::TallyError, message::Inbound};
use async_trait::async_trait;

/// AI Provider trait — the classifier and writer behind every domain service.
///
/// Structured call sites send a system prompt describing a JSON schema and
/// validate the reply; free-text call sites (digests, chat) use the string
/// as-is. Providers must be assumed to occasionally return malformed output.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Human-readable provider name.
    fn name(&self) -> &str;

    /// Send a system prompt plus one user message and get the raw reply text.
    async fn generate(&self, system: &str, user: &str) -> Result<String, TallyError>;

    /// Check if the provider is configured and ready.
    async fn is_available(&self) -> bool;
}

/// Messaging Channel trait — one per platform (Telegram, WhatsApp, SMS).
///
/// Channels are webhook-driven: the HTTP layer hands the raw payload to
/// `parse_webhook` and the router replies through `send`.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Platform name as used in routing keys (e.g. "telegram").
    fn name(&self) -> &str;

    /// Normalize a raw webhook body into an inbound message.
    ///
    /// Returns `Ok(None)` for payloads that are valid but carry nothing to
    /// process (status callbacks, edits, non-text updates). The webhook
    /// endpoint acknowledges those and moves on.
    fn parse_webhook(&self, raw: &[u8]) -> Result<Option<Inbound>, TallyError>;

    /// Send a text reply to a chat.
    async fn send(&self, chat_id: &str, text: &str) -> Result<(), TallyError>;
}
