//! Rolling conversation history, cached per user.
//!
//! Context for AI prompts only — capped, TTL'd, and refreshed on read so
//! an active conversation never goes stale mid-stream.

use tally_core::message::{Domain, HistoryEntry, Role};
use tally_store::Cache;
use tracing::warn;

/// Cache-backed conversation history. Read failures degrade to an empty
/// history rather than failing the message.
#[derive(Clone)]
pub struct HistoryStore {
    cache: Cache,
    ttl_secs: i64,
    cap: usize,
}

impl HistoryStore {
    pub fn new(cache: Cache, ttl_secs: i64, cap: usize) -> Self {
        Self { cache, ttl_secs, cap }
    }

    fn key(user_id: &str) -> String {
        format!("history:{user_id}")
    }

    /// Load the history, refreshing its TTL.
    pub async fn load(&self, user_id: &str) -> Vec<HistoryEntry> {
        let key = Self::key(user_id);
        let raw = match self.cache.get(&key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                warn!("history: failed to read {key}: {e}");
                return Vec::new();
            }
        };

        // Reads extend the TTL; an active conversation stays warm.
        if let Err(e) = self.cache.set(&key, &raw, self.ttl_secs).await {
            warn!("history: failed to refresh {key}: {e}");
        }

        match serde_json::from_str(&raw) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("history: corrupt payload at {key}, discarding: {e}");
                if let Err(e) = self.cache.delete(&key).await {
                    warn!("history: failed to clear {key}: {e}");
                }
                Vec::new()
            }
        }
    }

    /// Append a user/assistant exchange, keeping only the newest entries.
    pub async fn append(&self, user_id: &str, domain: Option<Domain>, user: &str, assistant: &str) {
        let mut entries = self.load(user_id).await;
        let now = chrono::Utc::now();
        entries.push(HistoryEntry {
            role: Role::User,
            content: user.to_string(),
            timestamp: now,
            domain_tag: domain,
        });
        entries.push(HistoryEntry {
            role: Role::Assistant,
            content: assistant.to_string(),
            timestamp: now,
            domain_tag: domain,
        });
        if entries.len() > self.cap {
            entries.drain(..entries.len() - self.cap);
        }

        let key = Self::key(user_id);
        match serde_json::to_string(&entries) {
            Ok(payload) => {
                if let Err(e) = self.cache.set(&key, &payload, self.ttl_secs).await {
                    warn!("history: failed to write {key}: {e}");
                }
            }
            Err(e) => warn!("history: failed to serialize {key}: {e}"),
        }
    }

    /// Render the history as prompt context lines.
    pub fn render(entries: &[HistoryEntry]) -> String {
        entries
            .iter()
            .map(|e| {
                let who = match e.role {
                    Role::User => "user",
                    Role::Assistant => "assistant",
                };
                format!("{who}: {}", e.content)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
