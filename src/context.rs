//! Process-wide wiring.
//!
//! Everything is constructed once here and handed to the pieces that
//! need it — no global registries or lazy singletons.

use std::collections::HashMap;
use std::sync::Arc;

use tally_channels::{SmsChannel, TelegramChannel, WhatsAppChannel};
use tally_core::config::Config;
use tally_core::traits::Channel;
use tally_providers::{AiExecutor, AnthropicProvider};
use tally_services::history::HistoryStore;
use tally_services::pending::PendingStore;
use tally_services::{FinanceService, SalesService};
use tally_store::{Cache, Store};
use tracing::info;

use crate::router::Router;

/// Configured handles shared by the API, router and scheduler.
pub struct AppContext {
    pub config: Config,
    pub store: Store,
    pub cache: Cache,
    pub exec: AiExecutor,
    pub channels: HashMap<String, Arc<dyn Channel>>,
    pub router: Arc<Router>,
}

impl AppContext {
    /// Build the full dependency graph from config.
    pub async fn build(config: Config) -> anyhow::Result<Self> {
        let store = Store::new(&config.store).await?;
        let cache = Cache::new(store.pool().clone());

        let exec = build_executor(&config)?;
        info!("AI provider: {}", exec.provider_name());
        let channels = build_channels(&config)?;

        let pending = PendingStore::new(cache.clone(), config.cache.pending_ttl_secs);
        let history = HistoryStore::new(
            cache.clone(),
            config.cache.history_ttl_secs,
            config.cache.history_cap,
        );

        let sales = SalesService::new(store.clone(), exec.clone(), pending.clone(), history.clone());
        let finance = FinanceService::new(store.clone(), exec.clone(), pending, history.clone());
        let router = Arc::new(Router::new(store.clone(), exec.clone(), sales, finance, history));

        Ok(Self {
            config,
            store,
            cache,
            exec,
            channels,
            router,
        })
    }
}

fn build_executor(config: &Config) -> anyhow::Result<AiExecutor> {
    match config.provider.default.as_str() {
        "anthropic" => {
            let anthropic = config.provider.anthropic.clone().unwrap_or_default();
            let api_key = anthropic.resolved_api_key();
            if api_key.is_empty() {
                anyhow::bail!(
                    "Anthropic API key missing. Set it in config.toml or the \
                     ANTHROPIC_API_KEY env var."
                );
            }
            let provider = AnthropicProvider::from_config(api_key, anthropic.model);
            Ok(AiExecutor::new(Arc::new(provider)))
        }
        other => anyhow::bail!("unsupported provider: {other}"),
    }
}

fn build_channels(config: &Config) -> anyhow::Result<HashMap<String, Arc<dyn Channel>>> {
    let mut channels: HashMap<String, Arc<dyn Channel>> = HashMap::new();

    if let Some(ref tg) = config.channel.telegram {
        if tg.enabled {
            let token = tg.resolved_bot_token();
            if token.is_empty() {
                anyhow::bail!(
                    "Telegram is enabled but bot_token is empty. Set it in config.toml \
                     or the TELEGRAM_BOT_TOKEN env var."
                );
            }
            channels.insert("telegram".to_string(), Arc::new(TelegramChannel::new(token)));
        }
    }

    if let Some(ref wa) = config.channel.whatsapp {
        if wa.enabled {
            if wa.access_token.is_empty() || wa.phone_number_id.is_empty() {
                anyhow::bail!(
                    "WhatsApp is enabled but access_token or phone_number_id is empty."
                );
            }
            channels.insert(
                "whatsapp".to_string(),
                Arc::new(WhatsAppChannel::new(
                    wa.access_token.clone(),
                    wa.phone_number_id.clone(),
                )),
            );
        }
    }

    if let Some(ref sms) = config.channel.sms {
        if sms.enabled {
            if sms.account_sid.is_empty() || sms.auth_token.is_empty() {
                anyhow::bail!("SMS is enabled but account_sid or auth_token is empty.");
            }
            channels.insert(
                "sms".to_string(),
                Arc::new(SmsChannel::new(
                    sms.account_sid.clone(),
                    sms.auth_token.clone(),
                    sms.from_number.clone(),
                )),
            );
        }
    }

    if !channels.is_empty() {
        let mut names: Vec<&str> = channels.keys().map(String::as_str).collect();
        names.sort_unstable();
        info!("Channels enabled: {}", names.join(", "));
    }
    Ok(channels)
}
