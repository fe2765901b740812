use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::TallyError;

/// Top-level Tally configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub tally: TallyConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub channel: ChannelConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub digest: DigestConfig,
    #[serde(default)]
    pub api: ApiConfig,
}

/// General assistant settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TallyConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for TallyConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            data_dir: default_data_dir(),
            log_level: default_log_level(),
        }
    }
}

/// Provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default = "default_provider")]
    pub default: String,
    pub anthropic: Option<AnthropicConfig>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            default: default_provider(),
            anthropic: None,
        }
    }
}

/// Anthropic API provider config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnthropicConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Falls back to the ANTHROPIC_API_KEY env var when empty.
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_anthropic_model")]
    pub model: String,
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: String::new(),
            model: default_anthropic_model(),
        }
    }
}

impl AnthropicConfig {
    /// Resolve the API key from config or environment.
    pub fn resolved_api_key(&self) -> String {
        if !self.api_key.is_empty() {
            return self.api_key.clone();
        }
        std::env::var("ANTHROPIC_API_KEY").unwrap_or_default()
    }
}

/// Channel configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ChannelConfig {
    pub telegram: Option<TelegramConfig>,
    pub whatsapp: Option<WhatsAppConfig>,
    pub sms: Option<SmsConfig>,
}

/// Telegram bot config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Falls back to the TELEGRAM_BOT_TOKEN env var when empty.
    #[serde(default)]
    pub bot_token: String,
}

impl TelegramConfig {
    pub fn resolved_bot_token(&self) -> String {
        if !self.bot_token.is_empty() {
            return self.bot_token.clone();
        }
        std::env::var("TELEGRAM_BOT_TOKEN").unwrap_or_default()
    }
}

/// WhatsApp Cloud API config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhatsAppConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub access_token: String,
    /// Business phone number id used in the Graph API send URL.
    #[serde(default)]
    pub phone_number_id: String,
}

/// SMS gateway config (Twilio-style REST API).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmsConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub account_sid: String,
    #[serde(default)]
    pub auth_token: String,
    /// Sending number in E.164 form.
    #[serde(default)]
    pub from_number: String,
}

/// Durable store config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

/// Ephemeral cache config (pending confirmations, conversation history).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// TTL for an unresolved duplicate confirmation.
    #[serde(default = "default_pending_ttl")]
    pub pending_ttl_secs: i64,
    /// TTL for cached conversation history, refreshed on every read.
    #[serde(default = "default_history_ttl")]
    pub history_ttl_secs: i64,
    /// Most recent history entries kept per user.
    #[serde(default = "default_history_cap")]
    pub history_cap: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            pending_ttl_secs: default_pending_ttl(),
            history_ttl_secs: default_history_ttl(),
            history_cap: default_history_cap(),
        }
    }
}

/// Digest notification config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DigestConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// How often the scheduler scans for due users.
    #[serde(default = "default_digest_poll")]
    pub poll_interval_secs: u64,
    /// Local hour (0-23) at which a user's daily digest becomes due.
    #[serde(default = "default_digest_hour")]
    pub send_hour: u32,
}

impl Default for DigestConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            poll_interval_secs: default_digest_poll(),
            send_hour: default_digest_hour(),
        }
    }
}

/// HTTP API config (webhooks + health/listing).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

// --- Default value functions ---

fn default_name() -> String {
    "Tally".to_string()
}
fn default_data_dir() -> String {
    "~/.tally".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_provider() -> String {
    "anthropic".to_string()
}
fn default_anthropic_model() -> String {
    "claude-sonnet-4-20250514".to_string()
}
fn default_db_path() -> String {
    "~/.tally/tally.db".to_string()
}
fn default_pending_ttl() -> i64 {
    300
}
fn default_history_ttl() -> i64 {
    7200
}
fn default_history_cap() -> usize {
    20
}
fn default_true() -> bool {
    true
}
fn default_digest_poll() -> u64 {
    900
}
fn default_digest_hour() -> u32 {
    8
}
fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}

/// Expand `~` to home directory.
pub fn shellexpand(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = std::env::var_os("HOME") {
            return format!("{}/{rest}", home.to_string_lossy());
        }
    }
    path.to_string()
}

/// Load configuration from a TOML file.
///
/// Falls back to defaults if the file does not exist.
pub fn load(path: &str) -> Result<Config, TallyError> {
    let path = Path::new(path);
    if !path.exists() {
        tracing::info!("Config file not found at {}, using defaults", path.display());
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| TallyError::Config(format!("failed to read {}: {e}", path.display())))?;

    let config: Config = toml::from_str(&content)
        .map_err(|e| TallyError::Config(format!("failed to parse config: {e}")))?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_defaults() {
        let cache = CacheConfig::default();
        assert_eq!(cache.pending_ttl_secs, 300);
        assert_eq!(cache.history_ttl_secs, 7200);
        assert_eq!(cache.history_cap, 20);
    }

    #[test]
    fn test_digest_defaults() {
        let digest = DigestConfig::default();
        assert!(digest.enabled);
        assert_eq!(digest.poll_interval_secs, 900);
        assert_eq!(digest.send_hour, 8);
    }

    #[test]
    fn test_config_from_toml() {
        let toml_str = r#"
            [tally]
            name = "Tally Dev"

            [provider.anthropic]
            enabled = true
            api_key = "sk-ant-test"

            [channel.telegram]
            enabled = true
            bot_token = "tok"

            [cache]
            pending_ttl_secs = 60
        "#;
        let cfg: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(cfg.tally.name, "Tally Dev");
        assert!(cfg.provider.anthropic.as_ref().unwrap().enabled);
        assert!(cfg.channel.telegram.as_ref().unwrap().enabled);
        assert!(cfg.channel.whatsapp.is_none());
        assert_eq!(cfg.cache.pending_ttl_secs, 60);
        // Untouched sections keep defaults.
        assert_eq!(cfg.cache.history_cap, 20);
        assert_eq!(cfg.digest.poll_interval_secs, 900);
        assert_eq!(cfg.api.bind, "0.0.0.0:8080");
    }

    #[test]
    fn test_empty_toml_is_all_defaults() {
        let cfg: Config = toml::from_str("").unwrap();
        assert_eq!(cfg.tally.name, "Tally");
        assert_eq!(cfg.provider.default, "anthropic");
        assert_eq!(cfg.store.db_path, "~/.tally/tally.db");
    }

    #[test]
    fn test_anthropic_model_default() {
        let toml_str = r#"
            enabled = true
            api_key = "k"
        "#;
        let cfg: AnthropicConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(cfg.model, "claude-sonnet-4-20250514");
    }
}
