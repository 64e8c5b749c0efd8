use async_trait::async_trait;

use crate::api::RelayError;
use crate::payload::{IdentifyPayload, TrackPayload};

pub mod print;
pub mod segment;

pub use print::PrintSink;
pub use segment::SegmentSink;

/// Destination for outbound analytics calls. The credential is resolved per
/// request, so sinks take it per call instead of owning one.
#[async_trait]
pub trait AnalyticsSink {
    async fn identify(&self, write_key: &str, payload: IdentifyPayload)
        -> Result<(), RelayError>;

    async fn track(&self, write_key: &str, payload: TrackPayload) -> Result<(), RelayError>;
}
