//! # tally-store
//!
//! SQLite-backed persistence for Tally: durable per-user records
//! (leads, transactions, accounts, notifications) plus the TTL key-value
//! cache used for pending confirmations and conversation history.

pub mod cache;
pub mod models;
pub mod store;

pub use cache::Cache;
pub use store::Store;
