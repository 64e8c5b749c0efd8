use axum::extract::{Query, State};
use bytes::Bytes;
use metrics::counter;
use serde::Deserialize;
use tracing::{info, instrument, warn};

use crate::api::RelayError;
use crate::event::{classify_event, CioWebhook, EventClass};
use crate::payload::{AnalyticsCall, CallContext, IdentifyPayload, TrackPayload};
use crate::router;
use crate::sinks::AnalyticsSink;
use crate::time::TimeSource;

pub const OK_BODY: &str = "ok";

#[derive(Debug, Default, Deserialize)]
pub struct EnvQuery {
    #[serde(default)]
    pub env: String,
}

fn resolve_write_key(state: &router::State, env: &str) -> Result<String, RelayError> {
    match state.config.write_key(env) {
        Some(key) => Ok(key.to_owned()),
        None => {
            warn!(env, "environment is not configured");
            Err(RelayError::UnknownEnvironment(env.to_owned()))
        }
    }
}

/// Legacy combined route: decode the webhook envelope, classify the event
/// type, and forward as a track call unless the type is suppressed.
#[instrument(skip_all, fields(env = %meta.env))]
pub async fn event(
    State(state): State<router::State>,
    Query(meta): Query<EnvQuery>,
    body: Bytes,
) -> Result<&'static str, RelayError> {
    counter!("relay_events_received_total").increment(1);

    let write_key = resolve_write_key(&state, &meta.env)?;

    let hook = CioWebhook::from_bytes(&body).map_err(|err| {
        warn!("rejected invalid payload: {}", err);
        err
    })?;

    let event = match classify_event(hook.source(), &hook.event_type) {
        EventClass::Suppress => {
            // Intentionally ignored types still get a 200 so the sender
            // never sees a failure for them.
            counter!("relay_events_suppressed_total").increment(1);
            info!(event_type = %hook.event_type, event_id = %hook.event_id, "suppressed event");
            return Ok(OK_BODY);
        }
        EventClass::Forward(name) => name,
    };

    let customer_id = hook.customer_id().map_err(|err| {
        warn!(event_id = %hook.event_id, "rejected webhook: {}", err);
        err
    })?;

    let now = state.timesource.current_time();
    let payload = TrackPayload {
        user_id: customer_id,
        event,
        context: CallContext {
            event_id: Some(hook.event_id.clone()),
        },
        timestamp: Some(hook.timestamp_rfc3339(&now)),
        properties: hook.data,
    };

    state.sink.track(&write_key, payload).await.map_err(|err| {
        counter!("relay_events_dropped_total").increment(1);
        err
    })?;

    counter!("relay_events_forwarded_total").increment(1);
    info!(event_id = %hook.event_id, "ok");

    Ok(OK_BODY)
}

#[instrument(skip_all, fields(env = %meta.env))]
pub async fn identify(
    State(state): State<router::State>,
    Query(meta): Query<EnvQuery>,
    body: Bytes,
) -> Result<&'static str, RelayError> {
    forward::<IdentifyPayload>(&state, &meta.env, body).await
}

#[instrument(skip_all, fields(env = %meta.env))]
pub async fn track(
    State(state): State<router::State>,
    Query(meta): Query<EnvQuery>,
    body: Bytes,
) -> Result<&'static str, RelayError> {
    forward::<TrackPayload>(&state, &meta.env, body).await
}

/// Dedicated routes carry payloads that are already analytics-shaped; the
/// route picks the call variant and the variant does the rest.
async fn forward<A: AnalyticsCall>(
    state: &router::State,
    env: &str,
    body: Bytes,
) -> Result<&'static str, RelayError> {
    counter!("relay_events_received_total").increment(1);

    let write_key = resolve_write_key(state, env)?;
    let now = state.timesource.current_time();

    let call = A::decode(&body, &now).map_err(|err| {
        warn!("rejected invalid payload: {}", err);
        err
    })?;

    call.deliver(state.sink.as_ref(), &write_key)
        .await
        .map_err(|err| {
            counter!("relay_events_dropped_total").increment(1);
            err
        })?;

    counter!("relay_events_forwarded_total").increment(1);
    info!("ok");

    Ok(OK_BODY)
}
