//! SMS channel via a Twilio-style REST API.

use async_trait::async_trait;
use serde::Deserialize;
use tally_core::{error::TallyError, message::Inbound, traits::Channel};
use tracing::debug;

const TWILIO_API_BASE: &str = "https://api.twilio.com/2010-04-01";

/// SMS channel. Inbound webhooks arrive form-encoded; replies go out via
/// the Messages endpoint with basic auth.
pub struct SmsChannel {
    client: reqwest::Client,
    account_sid: String,
    auth_token: String,
    from_number: String,
}

impl SmsChannel {
    pub fn new(account_sid: String, auth_token: String, from_number: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            account_sid,
            auth_token,
            from_number,
        }
    }
}

#[derive(Deserialize)]
struct SmsInbound {
    #[serde(rename = "From")]
    from: String,
    #[serde(rename = "Body", default)]
    body: String,
}

#[async_trait]
impl Channel for SmsChannel {
    fn name(&self) -> &str {
        "sms"
    }

    fn parse_webhook(&self, raw: &[u8]) -> Result<Option<Inbound>, TallyError> {
        let inbound: SmsInbound = serde_urlencoded::from_bytes(raw)
            .map_err(|e| TallyError::Channel(format!("sms: bad webhook payload: {e}")))?;

        if inbound.body.trim().is_empty() {
            return Ok(None);
        }

        // SMS carries no display name; the phone number is both identity
        // and reply address.
        Ok(Some(Inbound::new(
            "sms",
            &inbound.from,
            &inbound.from,
            inbound.body.trim(),
        )))
    }

    async fn send(&self, chat_id: &str, text: &str) -> Result<(), TallyError> {
        let url = format!(
            "{TWILIO_API_BASE}/Accounts/{}/Messages.json",
            self.account_sid
        );
        debug!("sms: send to {chat_id}");

        let resp = self
            .client
            .post(&url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&[
                ("To", chat_id),
                ("From", self.from_number.as_str()),
                ("Body", text),
            ])
            .send()
            .await
            .map_err(|e| TallyError::Channel(format!("sms send failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(TallyError::Channel(format!("sms returned {status}: {text}")));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel() -> SmsChannel {
        SmsChannel::new("AC123".into(), "secret".into(), "+27870001111".into())
    }

    #[test]
    fn test_parse_form_encoded_message() {
        let raw = b"MessageSid=SM1&From=%2B27821234567&To=%2B27870001111&Body=paid+R200+for+petrol";
        let inbound = channel().parse_webhook(raw).unwrap().unwrap();
        assert_eq!(inbound.platform, "sms");
        assert_eq!(inbound.chat_id, "+27821234567");
        assert_eq!(inbound.sender_name, None);
        assert_eq!(inbound.text, "paid R200 for petrol");
    }

    #[test]
    fn test_parse_empty_body_is_ignored() {
        let raw = b"From=%2B27821234567&Body=";
        assert!(channel().parse_webhook(raw).unwrap().is_none());
    }

    #[test]
    fn test_parse_missing_from_is_an_error() {
        assert!(channel().parse_webhook(b"Body=hello").is_err());
    }
}
