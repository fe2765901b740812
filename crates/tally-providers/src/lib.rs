//! AI provider implementations and the retrying executor.

pub mod anthropic;
pub mod executor;
pub mod friendly;

pub use anthropic::AnthropicProvider;
pub use executor::AiExecutor;
