//! Retrying wrapper around a provider, with JSON payload extraction.

use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tally_core::{error::TallyError, traits::Provider};
use tracing::warn;

const MAX_ATTEMPTS: u32 = 2;
const BACKOFF_MS: u64 = 500;

/// Executes provider calls with bounded retries.
///
/// Only transient failures (rate limits, gateway errors, timeouts) are
/// retried; a malformed request fails the same way twice and retrying it
/// just burns quota.
#[derive(Clone)]
pub struct AiExecutor {
    provider: Arc<dyn Provider>,
}

impl AiExecutor {
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        Self { provider }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Generate a completion, retrying transient failures with linear backoff.
    pub async fn generate(&self, system: &str, user: &str) -> Result<String, TallyError> {
        let mut last_err = None;
        for attempt in 1..=MAX_ATTEMPTS {
            match self.provider.generate(system, user).await {
                Ok(text) => return Ok(text),
                Err(e) if e.is_transient() && attempt < MAX_ATTEMPTS => {
                    warn!(
                        "{} attempt {attempt} failed transiently, retrying: {e}",
                        self.provider.name()
                    );
                    tokio::time::sleep(Duration::from_millis(BACKOFF_MS * attempt as u64)).await;
                    last_err = Some(e);
                }
                Err(e) => return Err(e),
            }
        }
        Err(last_err
            .unwrap_or_else(|| TallyError::Provider("retries exhausted".into())))
    }

    /// Generate a completion and parse it as JSON of type `T`.
    ///
    /// Models often wrap JSON in prose or code fences; we extract the
    /// outermost `{...}` span before parsing.
    pub async fn generate_json<T: DeserializeOwned>(
        &self,
        system: &str,
        user: &str,
    ) -> Result<T, TallyError> {
        let raw = self.generate(system, user).await?;
        let payload = extract_json_payload(&raw);
        serde_json::from_str(payload)
            .map_err(|e| TallyError::Intent(format!("unparseable model reply: {e}: {payload}")))
    }
}

/// Strip prose and code fences around a JSON object by slicing from the
/// first `{` to the last `}`. Falls back to the trimmed input.
pub fn extract_json_payload(raw: &str) -> &str {
    let trimmed = raw.trim();
    match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(start), Some(end)) if end > start => &trimmed[start..=end],
        _ => trimmed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct FlakyProvider {
        calls: AtomicU32,
        fail_with: String,
        fail_times: u32,
    }

    #[async_trait]
    impl Provider for FlakyProvider {
        fn name(&self) -> &str {
            "flaky"
        }

        async fn generate(&self, _system: &str, _user: &str) -> Result<String, TallyError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.fail_times {
                Err(TallyError::Provider(self.fail_with.clone()))
            } else {
                Ok("ok".into())
            }
        }

        async fn is_available(&self) -> bool {
            true
        }
    }

    fn executor(fail_with: &str, fail_times: u32) -> (AiExecutor, Arc<FlakyProvider>) {
        let provider = Arc::new(FlakyProvider {
            calls: AtomicU32::new(0),
            fail_with: fail_with.into(),
            fail_times,
        });
        (AiExecutor::new(provider.clone()), provider)
    }

    #[tokio::test]
    async fn test_transient_error_is_retried_once() {
        let (exec, provider) = executor("anthropic returned 429: rate limited", 1);
        let out = exec.generate("s", "u").await.unwrap();
        assert_eq!(out, "ok");
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_persistent_transient_error_gives_up_after_two_attempts() {
        let (exec, provider) = executor("connection reset", 10);
        assert!(exec.generate("s", "u").await.is_err());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_permanent_error_is_not_retried() {
        let (exec, provider) = executor("anthropic returned 400: bad request", 10);
        assert!(exec.generate("s", "u").await.is_err());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_extract_json_from_code_fence() {
        let raw = "Here you go:\n```json\n{\"action\":\"create_lead\"}\n```";
        assert_eq!(extract_json_payload(raw), "{\"action\":\"create_lead\"}");
    }

    #[test]
    fn test_extract_json_plain_object_untouched() {
        assert_eq!(extract_json_payload("  {\"a\":1}  "), "{\"a\":1}");
    }

    #[test]
    fn test_extract_json_no_braces_falls_back() {
        assert_eq!(extract_json_payload("not json at all"), "not json at all");
    }

    #[tokio::test]
    async fn test_generate_json_parses_fenced_reply() {
        #[derive(serde::Deserialize)]
        struct Verdict {
            action: String,
        }

        struct Fenced;

        #[async_trait]
        impl Provider for Fenced {
            fn name(&self) -> &str {
                "fenced"
            }
            async fn generate(&self, _: &str, _: &str) -> Result<String, TallyError> {
                Ok("```json\n{\"action\":\"cancel\"}\n```".into())
            }
            async fn is_available(&self) -> bool {
                true
            }
        }

        let exec = AiExecutor::new(Arc::new(Fenced));
        let v: Verdict = exec.generate_json("s", "u").await.unwrap();
        assert_eq!(v.action, "cancel");
    }
}
