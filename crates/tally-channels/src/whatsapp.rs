//! WhatsApp channel via the Meta Cloud API.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tally_core::{error::TallyError, message::Inbound, traits::Channel};
use tracing::debug;

const GRAPH_API_BASE: &str = "https://graph.facebook.com/v19.0";

/// WhatsApp Business channel. Receives Cloud API webhook payloads and
/// replies through the Graph API messages endpoint.
pub struct WhatsAppChannel {
    client: reqwest::Client,
    access_token: String,
    phone_number_id: String,
}

impl WhatsAppChannel {
    pub fn new(access_token: String, phone_number_id: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            access_token,
            phone_number_id,
        }
    }
}

#[derive(Deserialize)]
struct WaWebhook {
    entry: Option<Vec<WaEntry>>,
}

#[derive(Deserialize)]
struct WaEntry {
    changes: Option<Vec<WaChange>>,
}

#[derive(Deserialize)]
struct WaChange {
    value: Option<WaValue>,
}

#[derive(Deserialize)]
struct WaValue {
    messages: Option<Vec<WaMessage>>,
    contacts: Option<Vec<WaContact>>,
}

#[derive(Deserialize)]
struct WaMessage {
    from: String,
    #[serde(rename = "type")]
    kind: Option<String>,
    text: Option<WaText>,
}

#[derive(Deserialize)]
struct WaText {
    body: String,
}

#[derive(Deserialize)]
struct WaContact {
    profile: Option<WaProfile>,
}

#[derive(Deserialize)]
struct WaProfile {
    name: Option<String>,
}

#[derive(Deserialize)]
struct WaSendResponse {
    error: Option<serde_json::Value>,
}

#[async_trait]
impl Channel for WhatsAppChannel {
    fn name(&self) -> &str {
        "whatsapp"
    }

    fn parse_webhook(&self, raw: &[u8]) -> Result<Option<Inbound>, TallyError> {
        let webhook: WaWebhook = serde_json::from_slice(raw)
            .map_err(|e| TallyError::Channel(format!("whatsapp: bad webhook payload: {e}")))?;

        // Status callbacks (delivered/read) come through the same endpoint
        // with no messages array.
        let value = webhook
            .entry
            .and_then(|mut e| e.drain(..).next())
            .and_then(|e| e.changes)
            .and_then(|mut c| c.drain(..).next())
            .and_then(|c| c.value);
        let Some(value) = value else {
            return Ok(None);
        };

        let sender_name = value
            .contacts
            .as_ref()
            .and_then(|c| c.first())
            .and_then(|c| c.profile.as_ref())
            .and_then(|p| p.name.clone());

        let Some(message) = value.messages.and_then(|mut m| m.drain(..).next()) else {
            return Ok(None);
        };
        if message.kind.as_deref() != Some("text") {
            return Ok(None);
        }
        let Some(text) = message.text.map(|t| t.body).filter(|t| !t.trim().is_empty()) else {
            return Ok(None);
        };

        // The wa_id doubles as the reply address.
        let mut inbound = Inbound::new("whatsapp", &message.from, &message.from, &text);
        inbound.sender_name = sender_name;
        Ok(Some(inbound))
    }

    async fn send(&self, chat_id: &str, text: &str) -> Result<(), TallyError> {
        let url = format!("{GRAPH_API_BASE}/{}/messages", self.phone_number_id);
        debug!("whatsapp: send to {chat_id}");

        let body = json!({
            "messaging_product": "whatsapp",
            "to": chat_id,
            "type": "text",
            "text": { "body": text },
        });

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| TallyError::Channel(format!("whatsapp send failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(TallyError::Channel(format!(
                "whatsapp returned {status}: {text}"
            )));
        }

        let parsed: WaSendResponse = resp
            .json()
            .await
            .map_err(|e| TallyError::Channel(format!("whatsapp: bad send response: {e}")))?;
        if let Some(err) = parsed.error {
            return Err(TallyError::Channel(format!("whatsapp rejected message: {err}")));
        }
        Ok(())
    }
}
