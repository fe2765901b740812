//! Messaging channel adapters.
//!
//! Each adapter turns a platform webhook payload into a normalized
//! [`Inbound`](tally_core::message::Inbound) and sends replies through
//! the platform's outbound API.

pub mod sms;
pub mod telegram;
pub mod whatsapp;

pub use sms::SmsChannel;
pub use telegram::TelegramChannel;
pub use whatsapp::WhatsAppChannel;
