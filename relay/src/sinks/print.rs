use async_trait::async_trait;
use metrics::counter;
use tracing::info;

use crate::api::RelayError;
use crate::payload::{IdentifyPayload, TrackPayload};
use crate::sinks::AnalyticsSink;

/// Log-only sink for local debug runs. Never ships a call anywhere.
pub struct PrintSink {}

#[async_trait]
impl AnalyticsSink for PrintSink {
    async fn identify(
        &self,
        _write_key: &str,
        payload: IdentifyPayload,
    ) -> Result<(), RelayError> {
        info!("identify call: {:?}", payload);
        counter!("relay_calls_delivered_total").increment(1);

        Ok(())
    }

    async fn track(&self, _write_key: &str, payload: TrackPayload) -> Result<(), RelayError> {
        info!("track call: {:?}", payload);
        counter!("relay_calls_delivered_total").increment(1);

        Ok(())
    }
}
