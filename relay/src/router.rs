use std::future::ready;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::prometheus::{setup_metrics_recorder, track_metrics};
use crate::sinks::AnalyticsSink;
use crate::time::TimeSource;
use crate::webhook;

/// Complete-body reads are capped here instead of trusting the declared
/// content length.
pub const MAX_BODY_SIZE: usize = 1_000_000;

#[derive(Clone)]
pub struct State {
    pub config: Arc<Config>,
    pub sink: Arc<dyn AnalyticsSink + Send + Sync>,
    pub timesource: Arc<dyn TimeSource + Send + Sync>,
}

async fn index() -> &'static str {
    "segment-relay"
}

pub fn router<
    TZ: TimeSource + Send + Sync + 'static,
    S: AnalyticsSink + Send + Sync + 'static,
>(
    timesource: TZ,
    sink: S,
    config: Config,
    metrics: bool,
) -> Router {
    let state = State {
        config: Arc::new(config),
        sink: Arc::new(sink),
        timesource: Arc::new(timesource),
    };

    let router = Router::new()
        .route("/", get(index))
        .route("/_liveness", get(index))
        .route("/webhook", post(webhook::event))
        .route("/webhook/identify", post(webhook::identify))
        .route("/webhook/track", post(webhook::track))
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE))
        .layer(TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn(track_metrics))
        .with_state(state);

    // Don't install metrics unless asked to
    // Installing a global recorder when relay is used as a library (during tests etc)
    // does not work well.
    if metrics {
        let recorder_handle = setup_metrics_recorder();
        router.route("/metrics", get(move || ready(recorder_handle.render())))
    } else {
        router
    }
}
