//! Daily digest scheduler.
//!
//! A periodic timer scans all users; whoever's local send-hour has
//! arrived and hasn't been notified today gets a digest. Failures are
//! recorded per user so one broken delivery never aborts the batch.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, Timelike};
use tally_core::config::DigestConfig;
use tally_core::error::TallyError;
use tally_core::traits::Channel;
use tally_providers::AiExecutor;
use tally_store::models::User;
use tally_store::{Cache, Store};
use tracing::{error, info, warn};

const DIGEST_KIND: &str = "digest";

const DIGEST_PROMPT: &str = "You are Tally, a friendly assistant for a small business owner. \
Turn these facts into a short good-morning digest: one or two sentences on the pipeline, one \
or two on money, and at most one nudge. Plain text, no headers.";

pub struct DigestScheduler {
    store: Store,
    cache: Cache,
    exec: AiExecutor,
    channels: HashMap<String, Arc<dyn Channel>>,
    config: DigestConfig,
}

impl DigestScheduler {
    pub fn new(
        store: Store,
        cache: Cache,
        exec: AiExecutor,
        channels: HashMap<String, Arc<dyn Channel>>,
        config: DigestConfig,
    ) -> Self {
        Self {
            store,
            cache,
            exec,
            channels,
            config,
        }
    }

    /// Run forever, scanning on the configured interval.
    pub async fn run(self) {
        info!(
            "Digest scheduler started (every {}s, send hour {})",
            self.config.poll_interval_secs, self.config.send_hour
        );
        let mut interval = tokio::time::interval(Duration::from_secs(self.config.poll_interval_secs));
        loop {
            interval.tick().await;
            self.tick().await;
        }
    }

    /// One scan over all users. Also sweeps expired cache rows while
    /// we're here.
    pub async fn tick(&self) {
        match self.cache.purge_expired().await {
            Ok(0) => {}
            Ok(n) => info!("digest: swept {n} expired cache rows"),
            Err(e) => warn!("digest: cache sweep failed: {e}"),
        }

        let users = match self.store.list_users().await {
            Ok(users) => users,
            Err(e) => {
                error!("digest: failed to list users: {e}");
                return;
            }
        };

        for user in users {
            match self.due(&user).await {
                Ok(false) => continue,
                Ok(true) => {}
                Err(e) => {
                    warn!("digest: due-check failed for user {}: {e}", user.id);
                    continue;
                }
            }

            match self.send_digest(&user).await {
                Ok(()) => {
                    info!("digest: sent to user {}", user.id);
                    if let Err(e) = self
                        .store
                        .record_notification(&user.id, DIGEST_KIND, "sent", None)
                        .await
                    {
                        warn!("digest: failed to record delivery for {}: {e}", user.id);
                    }
                }
                Err(e) => {
                    // Recorded as failed, not retried: the next attempt
                    // is tomorrow's digest.
                    error!("digest: delivery failed for user {}: {e}", user.id);
                    if let Err(e) = self
                        .store
                        .record_notification(&user.id, DIGEST_KIND, "failed", Some(&e.to_string()))
                        .await
                    {
                        warn!("digest: failed to record failure for {}: {e}", user.id);
                    }
                }
            }
        }
    }

    async fn due(&self, user: &User) -> Result<bool, TallyError> {
        // The hour gate and the date gate read the same clock instant.
        let now = Local::now();
        if now.hour() != self.config.send_hour {
            return Ok(false);
        }
        let today = now.format("%Y-%m-%d").to_string();
        Ok(!self.store.notified_on(&user.id, DIGEST_KIND, &today).await?)
    }

    async fn send_digest(&self, user: &User) -> Result<(), TallyError> {
        let channel = self
            .channels
            .get(&user.platform)
            .ok_or_else(|| TallyError::Channel(format!("no channel for {}", user.platform)))?;

        let facts = self.gather_facts(user).await?;
        let text = match self.exec.generate(DIGEST_PROMPT, &facts).await {
            Ok(text) => text,
            Err(e) => {
                warn!("digest: synthesis failed for user {}, using facts: {e}", user.id);
                format!("Good morning! Here's where things stand:\n\n{facts}")
            }
        };

        channel.send(&user.chat_id, &text).await
    }

    async fn gather_facts(&self, user: &User) -> Result<String, TallyError> {
        let counts = self.store.count_leads_by_status(&user.id).await?;
        let (income, spend) = self.store.income_and_spend(&user.id, 7).await?;

        let pipeline = if counts.is_empty() {
            "Pipeline: no leads yet.".to_string()
        } else {
            let total: i64 = counts.iter().map(|(_, n)| n).sum();
            let lines = counts
                .iter()
                .map(|(s, n)| format!("{s} {n}"))
                .collect::<Vec<_>>()
                .join(", ");
            format!("Pipeline: {total} leads ({lines}).")
        };

        Ok(format!(
            "{pipeline}\nLast 7 days: in R{income:.2}, out R{spend:.2}, net R{:.2}.",
            income - spend
        ))
    }
}
