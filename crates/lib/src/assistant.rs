//! Conversational service client.
//!
//! One JSON POST per inbound message, fixed timeout, no retries; a failed
//! call terminates the request with the gateway's apology response.

use chrono::Utc;
use serde_json::{json, Value};
use std::time::Duration;

use crate::message::IncomingMessage;

/// Default webhook when neither config nor DESPACHO_WEBHOOK_URL say otherwise.
pub const DEFAULT_WEBHOOK_URL: &str = "http://127.0.0.1:5678/webhook/asistente";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, thiserror::Error)]
pub enum AssistantError {
    #[error("assistant request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("assistant api error: {0}")]
    Api(String),
    #[error("assistant reply had no usable text")]
    EmptyReply,
}

/// Client for the external conversational service webhook.
#[derive(Clone)]
pub struct AssistantClient {
    webhook_url: String,
    client: reqwest::Client,
}

impl AssistantClient {
    pub fn new(webhook_url: Option<String>) -> Result<Self, AssistantError> {
        let webhook_url = webhook_url
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_WEBHOOK_URL.to_string());
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { webhook_url, client })
    }

    /// POST the message to the webhook and return the assistant's reply text.
    pub async fn send(&self, msg: &IncomingMessage) -> Result<String, AssistantError> {
        let body = json!({
            "chatInput": msg.text,
            "user": {
                "id": msg.user_id,
                "role": msg.role,
                "organizationId": msg.tenant_id,
                "tenantId": msg.tenant_id,
            },
            "timestamp": Utc::now().to_rfc3339(),
        });
        let res = self.client.post(&self.webhook_url).json(&body).send().await?;
        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(AssistantError::Api(format!("{} {}", status, text)));
        }
        let value: Value = res.json().await?;
        reply_text(&value)
            .map(str::to_string)
            .ok_or(AssistantError::EmptyReply)
    }
}

/// The reply text is the body's `output` string or, failing that, the first
/// string found anywhere in the body, depth-first in document order.
fn reply_text(body: &Value) -> Option<&str> {
    if let Some(out) = body.get("output").and_then(Value::as_str) {
        return Some(out);
    }
    first_string(body)
}

fn first_string(value: &Value) -> Option<&str> {
    match value {
        Value::String(s) => Some(s),
        Value::Array(items) => items.iter().find_map(first_string),
        Value::Object(map) => map.values().find_map(first_string),
        _ => None,
    }
}
