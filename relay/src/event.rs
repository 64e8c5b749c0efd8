use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::api::RelayError;

/// Sender label used when the webhook does not name its own source.
pub const DEFAULT_EVENT_SOURCE: &str = "customerio";

/// Inbound webhook envelope as posted by the engagement platform.
#[derive(Debug, Deserialize)]
pub struct CioWebhook {
    #[serde(rename = "event_source")]
    source: Option<String>,
    pub event_type: String,
    #[serde(default)]
    pub event_id: String,
    pub timestamp: Option<i64>,
    pub timestamp_iso: Option<String>,
    #[serde(default)]
    pub data: HashMap<String, Value>,
}

impl CioWebhook {
    pub fn from_bytes(bytes: &[u8]) -> Result<CioWebhook, RelayError> {
        let mut webhook: CioWebhook = serde_json::from_slice(bytes)?;

        // Internal template state, redacted before anything is forwarded.
        webhook.data.remove("variables");

        Ok(webhook)
    }

    pub fn source(&self) -> &str {
        self.source.as_deref().unwrap_or(DEFAULT_EVENT_SOURCE)
    }

    /// Resolve the event timestamp: epoch seconds first, then the ISO
    /// string, then the caller-supplied wall clock. An epoch value that
    /// cannot be represented falls through to the next candidate.
    pub fn timestamp_rfc3339(&self, now: &str) -> String {
        if let Some(epoch) = self.timestamp {
            if let Ok(ts) = OffsetDateTime::from_unix_timestamp(epoch) {
                if let Ok(formatted) = ts.format(&Rfc3339) {
                    return formatted;
                }
            }
        }

        if let Some(iso) = &self.timestamp_iso {
            return iso.clone();
        }

        now.to_owned()
    }

    /// The subject of the event. Only the legacy combined route requires it.
    pub fn customer_id(&self) -> Result<String, RelayError> {
        match self.data.get("customer_id").and_then(Value::as_str) {
            Some(id) if !id.is_empty() => Ok(id.to_owned()),
            _ => Err(RelayError::MissingCustomerId),
        }
    }
}

/// What to do with a raw event type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventClass {
    /// Forward downstream under this event name.
    Forward(String),
    /// Acknowledge upstream without a downstream call.
    Suppress,
}

/// Map a raw event type to its outbound event name, or suppress it. Types
/// not in the table are forwarded as "<source>:<type>".
pub fn classify_event(source: &str, event_type: &str) -> EventClass {
    match event_type {
        "customer_unsubscribed" => EventClass::Forward(String::from("Email - unsubscribed")),

        "email_converted" | "email_drafted" | "email_dropped" | "email_delivered" => {
            EventClass::Suppress
        }

        "email_bounced" | "email_failed" | "email_spammed" => {
            EventClass::Forward(String::from("Email - email failed"))
        }

        "email_sent" => EventClass::Forward(String::from("Email - email sent")),
        "email_opened" => EventClass::Forward(String::from("Email - opened email")),
        "email_clicked" => EventClass::Forward(String::from("Email - clicked email")),

        other => EventClass::Forward(format!("{}:{}", source, other)),
    }
}
