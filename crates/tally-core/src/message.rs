use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Business vertical a message or record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    Sales,
    Finance,
}

impl Domain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Sales => "sales",
            Domain::Finance => "finance",
        }
    }
}

impl std::fmt::Display for Domain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An inbound message, normalized from a platform webhook payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Inbound {
    pub id: Uuid,
    /// Platform name (e.g. "telegram", "whatsapp", "sms").
    pub platform: String,
    /// Platform-specific chat/conversation id, used to route the reply.
    pub chat_id: String,
    /// Platform-specific sender id.
    pub sender_id: String,
    /// Human-readable sender name, when the platform provides one.
    pub sender_name: Option<String>,
    /// Message text content.
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl Inbound {
    /// Build a normalized message with a fresh id and current timestamp.
    pub fn new(platform: &str, chat_id: &str, sender_id: &str, text: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            platform: platform.to_string(),
            chat_id: chat_id.to_string(),
            sender_id: sender_id.to_string(),
            sender_name: None,
            text: text.to_string(),
            timestamp: Utc::now(),
        }
    }
}

/// One entry of a user's cached conversation history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    /// Which domain produced/consumed this entry, when known.
    pub domain_tag: Option<Domain>,
}

/// Speaker role in a conversation history entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_display() {
        assert_eq!(Domain::Sales.to_string(), "sales");
        assert_eq!(Domain::Finance.to_string(), "finance");
    }

    #[test]
    fn test_domain_serde_lowercase() {
        assert_eq!(serde_json::to_string(&Domain::Finance).unwrap(), "\"finance\"");
        let d: Domain = serde_json::from_str("\"sales\"").unwrap();
        assert_eq!(d, Domain::Sales);
    }

    #[test]
    fn test_inbound_new() {
        let msg = Inbound::new("telegram", "123", "456", "hello");
        assert_eq!(msg.platform, "telegram");
        assert_eq!(msg.chat_id, "123");
        assert!(msg.sender_name.is_none());
    }
}
