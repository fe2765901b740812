use thiserror::Error;

/// Top-level error type for Tally.
#[derive(Debug, Error)]
pub enum TallyError {
    /// Error from an AI provider.
    #[error("provider error: {0}")]
    Provider(String),

    /// Error from a messaging channel.
    #[error("channel error: {0}")]
    Channel(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// Durable store error.
    #[error("store error: {0}")]
    Store(String),

    /// Key-value cache error.
    #[error("cache error: {0}")]
    Cache(String),

    /// The AI returned output we could not turn into a structured intent,
    /// or named an action we do not support.
    #[error("intent error: {0}")]
    Intent(String),

    /// A lead/transaction/account the user referenced does not exist.
    #[error("{0} not found: {1}")]
    NotFound(&'static str, String),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl TallyError {
    /// Whether this error is worth retrying against the provider.
    ///
    /// Only rate-limit/overload/timeout/connection failures qualify;
    /// everything else propagates immediately.
    pub fn is_transient(&self) -> bool {
        match self {
            TallyError::Provider(msg) => {
                let m = msg.to_lowercase();
                m.contains("429")
                    || m.contains("502")
                    || m.contains("503")
                    || m.contains("overloaded")
                    || m.contains("timeout")
                    || m.contains("timed out")
                    || m.contains("connection")
                    || m.contains("connect error")
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_provider_errors() {
        assert!(TallyError::Provider("anthropic returned 429: slow down".into()).is_transient());
        assert!(TallyError::Provider("anthropic returned 503: overloaded_error".into()).is_transient());
        assert!(TallyError::Provider("request timed out".into()).is_transient());
        assert!(TallyError::Provider("connection reset by peer".into()).is_transient());
    }

    #[test]
    fn test_non_transient_errors() {
        assert!(!TallyError::Provider("anthropic returned 401: bad key".into()).is_transient());
        assert!(!TallyError::Intent("unknown action 'frobnicate'".into()).is_transient());
        assert!(!TallyError::Store("insert failed".into()).is_transient());
    }
}
