//! Telegram Bot API channel (webhook mode).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tally_core::{error::TallyError, message::Inbound, traits::Channel};
use tracing::debug;

const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// Telegram channel. Receives Bot API `Update` payloads and replies via
/// `sendMessage`.
pub struct TelegramChannel {
    client: reqwest::Client,
    bot_token: String,
}

impl TelegramChannel {
    pub fn new(bot_token: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            bot_token,
        }
    }
}

#[derive(Deserialize)]
struct TgUpdate {
    message: Option<TgMessage>,
}

#[derive(Deserialize)]
struct TgMessage {
    chat: TgChat,
    from: Option<TgUser>,
    text: Option<String>,
}

#[derive(Deserialize)]
struct TgChat {
    id: i64,
}

#[derive(Deserialize)]
struct TgUser {
    id: i64,
    first_name: Option<String>,
    username: Option<String>,
}

#[derive(Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: &'a str,
}

#[derive(Deserialize)]
struct TgResponse {
    ok: bool,
    description: Option<String>,
}

#[async_trait]
impl Channel for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    fn parse_webhook(&self, raw: &[u8]) -> Result<Option<Inbound>, TallyError> {
        let update: TgUpdate = serde_json::from_slice(raw)
            .map_err(|e| TallyError::Channel(format!("telegram: bad update payload: {e}")))?;

        // Edited messages, channel posts, stickers etc. arrive without a
        // text message; acknowledge and drop them.
        let Some(message) = update.message else {
            return Ok(None);
        };
        let Some(text) = message.text.filter(|t| !t.trim().is_empty()) else {
            return Ok(None);
        };

        let sender_id = message
            .from
            .as_ref()
            .map(|u| u.id.to_string())
            .unwrap_or_else(|| message.chat.id.to_string());
        let sender_name = message.from.as_ref().and_then(|u| {
            u.first_name
                .clone()
                .or_else(|| u.username.clone())
        });

        let mut inbound = Inbound::new("telegram", &message.chat.id.to_string(), &sender_id, &text);
        inbound.sender_name = sender_name;
        Ok(Some(inbound))
    }

    async fn send(&self, chat_id: &str, text: &str) -> Result<(), TallyError> {
        let url = format!("{TELEGRAM_API_BASE}/bot{}/sendMessage", self.bot_token);
        debug!("telegram: sendMessage to {chat_id}");

        let resp = self
            .client
            .post(&url)
            .json(&SendMessageRequest { chat_id, text })
            .send()
            .await
            .map_err(|e| TallyError::Channel(format!("telegram send failed: {e}")))?;

        let parsed: TgResponse = resp
            .json()
            .await
            .map_err(|e| TallyError::Channel(format!("telegram: bad send response: {e}")))?;

        if !parsed.ok {
            return Err(TallyError::Channel(format!(
                "telegram rejected message: {}",
                parsed.description.unwrap_or_default()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel() -> TelegramChannel {
        TelegramChannel::new("123:abc".into())
    }

    #[test]
    fn test_parse_text_message() {
        let raw = r#"{
            "update_id": 10,
            "message": {
                "message_id": 1,
                "chat": {"id": 987654, "type": "private"},
                "from": {"id": 111, "first_name": "Thandi", "username": "thandi_m"},
                "text": "add lead Sipho 0821234567"
            }
        }"#;
        let inbound = channel().parse_webhook(raw.as_bytes()).unwrap().unwrap();
        assert_eq!(inbound.platform, "telegram");
        assert_eq!(inbound.chat_id, "987654");
        assert_eq!(inbound.sender_id, "111");
        assert_eq!(inbound.sender_name.as_deref(), Some("Thandi"));
        assert_eq!(inbound.text, "add lead Sipho 0821234567");
    }

    #[test]
    fn test_parse_non_text_update_is_ignored() {
        let raw = r#"{"update_id": 11, "message": {"message_id": 2, "chat": {"id": 5}, "sticker": {}}}"#;
        assert!(channel().parse_webhook(raw.as_bytes()).unwrap().is_none());
    }

    #[test]
    fn test_parse_edited_message_is_ignored() {
        let raw = r#"{"update_id": 12, "edited_message": {"message_id": 3, "chat": {"id": 5}, "text": "hi"}}"#;
        assert!(channel().parse_webhook(raw.as_bytes()).unwrap().is_none());
    }

    #[test]
    fn test_parse_garbage_is_an_error() {
        assert!(channel().parse_webhook(b"not json").is_err());
    }
}
