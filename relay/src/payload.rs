use std::collections::HashMap;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::RelayError;
use crate::sinks::AnalyticsSink;

/// Correlation data carried through to the analytics service.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct CallContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
}

/// One analytics call shape. Each implementation decodes its own request
/// body variant and transmits itself through a sink bound to a credential.
#[async_trait]
pub trait AnalyticsCall: Sized + Send {
    /// Decode and validate a request body. `now` is the wall-clock RFC3339
    /// timestamp used when the payload does not carry its own.
    fn decode(body: &Bytes, now: &str) -> Result<Self, RelayError>;

    async fn deliver(
        self,
        sink: &(dyn AnalyticsSink + Send + Sync),
        write_key: &str,
    ) -> Result<(), RelayError>;
}

/// A discrete named event with properties.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TrackPayload {
    #[serde(rename = "userId", alias = "user_id")]
    pub user_id: String,
    pub event: String,
    #[serde(default)]
    pub properties: HashMap<String, Value>,
    #[serde(default)]
    pub context: CallContext,
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// A user-profile trait update.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct IdentifyPayload {
    #[serde(rename = "userId", alias = "user_id")]
    pub user_id: String,
    #[serde(default)]
    pub traits: HashMap<String, Value>,
    #[serde(default)]
    pub context: CallContext,
    #[serde(default)]
    pub timestamp: Option<String>,
}

fn validate_user_id(user_id: &str) -> Result<(), RelayError> {
    if user_id.is_empty() {
        return Err(RelayError::MissingUserId);
    }
    Ok(())
}

#[async_trait]
impl AnalyticsCall for TrackPayload {
    fn decode(body: &Bytes, now: &str) -> Result<Self, RelayError> {
        let mut payload: TrackPayload = serde_json::from_slice(body)?;
        validate_user_id(&payload.user_id)?;

        payload.properties.remove("variables");
        if payload.timestamp.is_none() {
            payload.timestamp = Some(now.to_owned());
        }

        Ok(payload)
    }

    async fn deliver(
        self,
        sink: &(dyn AnalyticsSink + Send + Sync),
        write_key: &str,
    ) -> Result<(), RelayError> {
        sink.track(write_key, self).await
    }
}

#[async_trait]
impl AnalyticsCall for IdentifyPayload {
    fn decode(body: &Bytes, now: &str) -> Result<Self, RelayError> {
        let mut payload: IdentifyPayload = serde_json::from_slice(body)?;
        validate_user_id(&payload.user_id)?;

        payload.traits.remove("variables");
        if payload.timestamp.is_none() {
            payload.timestamp = Some(now.to_owned());
        }

        Ok(payload)
    }

    async fn deliver(
        self,
        sink: &(dyn AnalyticsSink + Send + Sync),
        write_key: &str,
    ) -> Result<(), RelayError> {
        sink.identify(write_key, self).await
    }
}
