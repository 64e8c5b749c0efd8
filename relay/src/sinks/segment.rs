use std::time::Duration;

use async_trait::async_trait;
use metrics::counter;
use reqwest::header;
use serde::Serialize;
use tracing::{debug, error, info};
use url::Url;

use crate::api::RelayError;
use crate::payload::{IdentifyPayload, TrackPayload};
use crate::sinks::AnalyticsSink;

pub const DEFAULT_ENDPOINT: &str = "https://api.segment.com";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Delivers calls to Segment's HTTP tracking API, one request per inbound
/// webhook. The write key rides along as basic-auth username.
#[derive(Clone)]
pub struct SegmentSink {
    client: reqwest::Client,
    endpoint: Url,
}

impl SegmentSink {
    pub fn new(endpoint: Url) -> anyhow::Result<SegmentSink> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent("segment-relay")
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        info!("delivering analytics calls to {}", endpoint);

        Ok(SegmentSink { client, endpoint })
    }

    async fn post<P: Serialize + Sync>(
        &self,
        path: &str,
        write_key: &str,
        payload: &P,
    ) -> Result<(), RelayError> {
        let url = self
            .endpoint
            .join(path)
            .map_err(|e| RelayError::DeliveryError(e.to_string()))?;

        debug!(%url, "sending analytics call");

        let response = self
            .client
            .post(url)
            .basic_auth(write_key, Some(""))
            .json(payload)
            .send()
            .await
            .map_err(|e| {
                error!("segment request failed: {}", e);
                RelayError::DeliveryError(e.to_string())
            })?;

        if let Err(e) = response.error_for_status() {
            error!("segment rejected the call: {}", e);
            counter!("relay_calls_rejected_total").increment(1);
            return Err(RelayError::DeliveryError(e.to_string()));
        }

        counter!("relay_calls_delivered_total").increment(1);

        Ok(())
    }
}

#[async_trait]
impl AnalyticsSink for SegmentSink {
    async fn identify(
        &self,
        write_key: &str,
        payload: IdentifyPayload,
    ) -> Result<(), RelayError> {
        self.post("/v1/identify", write_key, &payload).await
    }

    async fn track(&self, write_key: &str, payload: TrackPayload) -> Result<(), RelayError> {
        self.post("/v1/track", write_key, &payload).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use assert_json_diff::assert_json_eq;
    use axum::extract::State;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::{Json, Router};
    use base64::Engine;
    use serde_json::{json, Value};
    use url::Url;

    use super::SegmentSink;
    use crate::payload::{CallContext, TrackPayload};
    use crate::sinks::AnalyticsSink;

    #[derive(Clone, Default)]
    struct Received {
        calls: Arc<Mutex<Vec<(String, Value)>>>,
    }

    async fn capture(
        State(received): State<Received>,
        headers: HeaderMap,
        Json(body): Json<Value>,
    ) -> StatusCode {
        let auth = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_owned();
        received.calls.lock().unwrap().push((auth, body));

        StatusCode::OK
    }

    async fn reject() -> (StatusCode, &'static str) {
        (StatusCode::BAD_REQUEST, "no thanks")
    }

    async fn spawn_receiver(app: Router) -> Url {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test listener");
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Url::parse(&format!("http://{}", addr)).unwrap()
    }

    fn track_payload() -> TrackPayload {
        TrackPayload {
            user_id: String::from("u1"),
            event: String::from("Email - opened email"),
            properties: [(String::from("subject"), json!("hello"))].into(),
            context: CallContext {
                event_id: Some(String::from("ev-1")),
            },
            timestamp: Some(String::from("2017-07-14T02:40:00Z")),
        }
    }

    #[tokio::test]
    async fn posts_track_calls_with_write_key_auth() {
        let received = Received::default();
        let app = Router::new()
            .route("/v1/track", post(capture))
            .with_state(received.clone());
        let endpoint = spawn_receiver(app).await;

        let sink = SegmentSink::new(endpoint).expect("build sink");
        sink.track("key-prod", track_payload())
            .await
            .expect("delivery should succeed");

        let calls = received.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);

        let (auth, body) = &calls[0];
        let expected_auth = format!(
            "Basic {}",
            base64::engine::general_purpose::STANDARD.encode("key-prod:")
        );
        assert_eq!(auth, &expected_auth);

        assert_json_eq!(
            body,
            &json!({
                "userId": "u1",
                "event": "Email - opened email",
                "properties": {"subject": "hello"},
                "context": {"event_id": "ev-1"},
                "timestamp": "2017-07-14T02:40:00Z",
            })
        );
    }

    #[tokio::test]
    async fn surfaces_rejected_calls_as_delivery_errors() {
        let app = Router::new().route("/v1/track", post(reject));
        let endpoint = spawn_receiver(app).await;

        let sink = SegmentSink::new(endpoint).expect("build sink");
        let sent = sink.track("key-prod", track_payload()).await;

        assert!(sent.is_err());
    }
}
