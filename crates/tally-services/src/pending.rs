//! Pending duplicate confirmations.
//!
//! When the duplicate classifier flags a proposed entity, the question we
//! asked the user is parked here, keyed by (user, domain), until their
//! next message resolves it or the TTL runs out.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tally_core::message::Domain;
use tally_store::Cache;
use tracing::warn;

use crate::finance::intents::TxDraft;
use crate::sales::intents::LeadDraft;

/// What kind of duplicate question is pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PendingKind {
    DuplicateLead,
    DuplicateTransaction,
}

/// The entity the user asked to create, held until they decide.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProposedEntity {
    Lead(LeadDraft),
    Transaction(TxDraft),
}

/// Classifier verdict on whether a proposed entity duplicates an
/// existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    Duplicate,
    Unique,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierVerdict {
    pub verdict: Verdict,
    pub confidence: f64,
    pub rationale: String,
    pub matched_label: Option<String>,
}

/// An existing record offered to the user as a possible match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub id: String,
    pub label: String,
    pub detail: String,
    pub created_at: String,
}

/// One unresolved disambiguation question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingConfirmation {
    pub kind: PendingKind,
    pub proposed: ProposedEntity,
    pub verdict: ClassifierVerdict,
    /// Up to three candidates, most plausible first.
    pub candidates: Vec<Candidate>,
    pub created_at_ms: i64,
}

impl PendingConfirmation {
    pub fn new(
        kind: PendingKind,
        proposed: ProposedEntity,
        verdict: ClassifierVerdict,
        candidates: Vec<Candidate>,
    ) -> Self {
        Self {
            kind,
            proposed,
            verdict,
            candidates,
            created_at_ms: Utc::now().timestamp_millis(),
        }
    }
}

/// Cache-backed store for pending confirmations.
///
/// Best-effort by design: a cache outage reads as "no pending
/// confirmation" so the conversation falls through to normal handling
/// instead of blocking the user. Both domains share this policy.
#[derive(Clone)]
pub struct PendingStore {
    cache: Cache,
    ttl_secs: i64,
}

impl PendingStore {
    pub fn new(cache: Cache, ttl_secs: i64) -> Self {
        Self { cache, ttl_secs }
    }

    fn key(user_id: &str, domain: Domain) -> String {
        format!("pending:{user_id}:{domain}")
    }

    /// True if a confirmation is parked for this (user, domain).
    /// Cheaper than [`get`](Self::get): no payload read, no parse.
    pub async fn exists(&self, user_id: &str, domain: Domain) -> bool {
        let key = Self::key(user_id, domain);
        match self.cache.exists(&key).await {
            Ok(found) => found,
            Err(e) => {
                warn!("pending: failed to check {key}: {e}");
                false
            }
        }
    }

    /// Park a confirmation, overwriting any existing one for this key.
    pub async fn store(&self, user_id: &str, domain: Domain, pending: &PendingConfirmation) {
        let key = Self::key(user_id, domain);
        let payload = match serde_json::to_string(pending) {
            Ok(p) => p,
            Err(e) => {
                warn!("pending: failed to serialize {key}: {e}");
                return;
            }
        };
        if let Err(e) = self.cache.set(&key, &payload, self.ttl_secs).await {
            warn!("pending: failed to store {key}: {e}");
        }
    }

    /// Read the pending confirmation, if one is live.
    ///
    /// A payload that no longer parses is deleted and treated as absent
    /// so a bad write can't wedge the user's conversation.
    pub async fn get(&self, user_id: &str, domain: Domain) -> Option<PendingConfirmation> {
        let key = Self::key(user_id, domain);
        let raw = match self.cache.get(&key).await {
            Ok(raw) => raw?,
            Err(e) => {
                warn!("pending: failed to read {key}: {e}");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(pending) => Some(pending),
            Err(e) => {
                warn!("pending: corrupt payload at {key}, discarding: {e}");
                self.clear(user_id, domain).await;
                None
            }
        }
    }

    /// Drop the pending confirmation unconditionally.
    pub async fn clear(&self, user_id: &str, domain: Domain) {
        let key = Self::key(user_id, domain);
        if let Err(e) = self.cache.delete(&key).await {
            warn!("pending: failed to clear {key}: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_store::Store;

    async fn test_store(ttl: i64) -> PendingStore {
        let store = Store::open_in_memory().await.unwrap();
        PendingStore::new(Cache::new(store.pool().clone()), ttl)
    }

    fn sample(name: &str) -> PendingConfirmation {
        PendingConfirmation::new(
            PendingKind::DuplicateLead,
            ProposedEntity::Lead(LeadDraft {
                name: name.into(),
                ..Default::default()
            }),
            ClassifierVerdict {
                verdict: Verdict::Duplicate,
                confidence: 0.9,
                rationale: "same guest house".into(),
                matched_label: Some("Dandrom Guest House".into()),
            },
            vec![Candidate {
                id: "lead-1".into(),
                label: "Dandrom Guest House".into(),
                detail: "status New".into(),
                created_at: "2026-08-01 09:00:00".into(),
            }],
        )
    }

    #[tokio::test]
    async fn test_store_and_get_roundtrip() {
        let pending = test_store(300).await;
        pending.store("u1", Domain::Sales, &sample("Dan's")).await;
        let got = pending.get("u1", Domain::Sales).await.unwrap();
        assert_eq!(got.kind, PendingKind::DuplicateLead);
        assert_eq!(got.candidates.len(), 1);
    }

    #[tokio::test]
    async fn test_domains_are_independent_keys() {
        let pending = test_store(300).await;
        pending.store("u1", Domain::Sales, &sample("a")).await;
        assert!(pending.get("u1", Domain::Finance).await.is_none());
    }

    #[tokio::test]
    async fn test_second_store_overwrites_first() {
        let pending = test_store(300).await;
        pending.store("u1", Domain::Sales, &sample("first")).await;
        pending.store("u1", Domain::Sales, &sample("second")).await;
        let got = pending.get("u1", Domain::Sales).await.unwrap();
        match got.proposed {
            ProposedEntity::Lead(draft) => assert_eq!(draft.name, "second"),
            _ => panic!("wrong proposed entity"),
        }
    }

    #[tokio::test]
    async fn test_expired_confirmation_reads_as_absent() {
        let pending = test_store(0).await;
        pending.store("u1", Domain::Sales, &sample("a")).await;
        assert!(!pending.exists("u1", Domain::Sales).await);
        assert!(pending.get("u1", Domain::Sales).await.is_none());
    }

    #[tokio::test]
    async fn test_exists_tracks_the_parked_confirmation() {
        let pending = test_store(300).await;
        assert!(!pending.exists("u1", Domain::Sales).await);
        pending.store("u1", Domain::Sales, &sample("a")).await;
        assert!(pending.exists("u1", Domain::Sales).await);
        assert!(!pending.exists("u1", Domain::Finance).await);
        pending.clear("u1", Domain::Sales).await;
        assert!(!pending.exists("u1", Domain::Sales).await);
    }

    #[tokio::test]
    async fn test_corrupt_payload_self_heals() {
        let store = Store::open_in_memory().await.unwrap();
        let cache = Cache::new(store.pool().clone());
        let pending = PendingStore::new(cache.clone(), 300);

        cache
            .set("pending:u1:sales", "{not valid json", 300)
            .await
            .unwrap();
        assert!(pending.get("u1", Domain::Sales).await.is_none());
        // The corrupt key was deleted, not left to fail again.
        assert!(cache.get("pending:u1:sales").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_clear_then_get_is_absent() {
        let pending = test_store(300).await;
        pending.store("u1", Domain::Sales, &sample("a")).await;
        pending.clear("u1", Domain::Sales).await;
        assert!(pending.get("u1", Domain::Sales).await.is_none());
    }
}
