//! WhatsApp channel — sends messages through the Cloud API Graph endpoint.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;

use crate::channels::{ButtonChoice, MessageSink, OutboundMessage};
use crate::error::ChannelError;

/// Graph API version used for the messages endpoint.
const GRAPH_API_VERSION: &str = "v17.0";

/// WhatsApp Cloud API message sender.
pub struct WhatsAppChannel {
    token: SecretString,
    phone_number_id: String,
    client: reqwest::Client,
}

impl WhatsAppChannel {
    pub fn new(token: SecretString, phone_number_id: String) -> Self {
        Self {
            token,
            phone_number_id,
            client: reqwest::Client::new(),
        }
    }

    fn api_url(&self) -> String {
        format!(
            "https://graph.facebook.com/{GRAPH_API_VERSION}/{}/messages",
            self.phone_number_id
        )
    }

    async fn post(&self, body: Value) -> Result<(), ChannelError> {
        let resp = self
            .client
            .post(self.api_url())
            .bearer_auth(self.token.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| ChannelError::SendFailed {
                name: "whatsapp".into(),
                reason: e.to_string(),
            })?;

        if !resp.status().is_success() {
            let status = resp.status();
            let err = resp.text().await.unwrap_or_default();
            return Err(ChannelError::SendFailed {
                name: "whatsapp".into(),
                reason: format!("messages endpoint returned {status}: {err}"),
            });
        }

        Ok(())
    }
}

#[async_trait]
impl MessageSink for WhatsAppChannel {
    async fn send(&self, message: &OutboundMessage) -> Result<(), ChannelError> {
        let body = if message.choices.is_empty() {
            text_body(&message.to, &message.text)
        } else {
            buttons_body(&message.to, &message.text, &message.choices)
        };
        self.post(body).await?;
        tracing::debug!(to = %message.to, "WhatsApp message sent");
        Ok(())
    }
}

// ── Payload builders ────────────────────────────────────────────────

/// Plain text message body.
fn text_body(to: &str, text: &str) -> Value {
    serde_json::json!({
        "messaging_product": "whatsapp",
        "to": to,
        "type": "text",
        "text": { "body": text }
    })
}

/// Interactive button message body.
fn buttons_body(to: &str, text: &str, choices: &[ButtonChoice]) -> Value {
    let buttons: Vec<Value> = choices
        .iter()
        .map(|c| {
            serde_json::json!({
                "type": "reply",
                "reply": { "id": c.id, "title": c.label }
            })
        })
        .collect();

    serde_json::json!({
        "messaging_product": "whatsapp",
        "to": to,
        "type": "interactive",
        "interactive": {
            "type": "button",
            "body": { "text": text },
            "action": { "buttons": buttons }
        }
    })
}

// ── Tests ───────────────────────────────────────────────────────────
