use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tokio::signal;
use url::Url;

use relay::config::Config;
use relay::router::router;
use relay::sinks::{PrintSink, SegmentSink};
use relay::time::SystemTime;

/// Receives engagement-platform webhooks and forwards them to Segment.
#[derive(Parser)]
#[command(version)]
struct Cli {
    /// Path to the environments config file.
    #[arg(long, default_value = "./config.json")]
    config: PathBuf,

    /// Address to listen on for incoming webhooks.
    #[arg(long, default_value = "0.0.0.0:8080")]
    address: SocketAddr,

    /// Segment HTTP API endpoint.
    #[arg(long, default_value = relay::sinks::segment::DEFAULT_ENDPOINT)]
    segment_endpoint: Url,

    /// Log outbound calls instead of delivering them.
    #[arg(long)]
    print_sink: bool,
}

async fn shutdown() {
    let mut term = signal::unix::signal(signal::unix::SignalKind::terminate())
        .expect("failed to register SIGTERM handler");

    let mut interrupt = signal::unix::signal(signal::unix::SignalKind::interrupt())
        .expect("failed to register SIGINT handler");

    tokio::select! {
        _ = term.recv() => {},
        _ = interrupt.recv() => {},
    };

    tracing::info!("shutting down gracefully...");
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let config = match Config::from_file(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("failed to load config from {}: {}", cli.config.display(), e);
            std::process::exit(1);
        }
    };

    let app = if cli.print_sink {
        router(SystemTime {}, PrintSink {}, config, true)
    } else {
        let sink =
            SegmentSink::new(cli.segment_endpoint).expect("failed to build segment client");
        router(SystemTime {}, sink, config, true)
    };

    let listener = tokio::net::TcpListener::bind(cli.address)
        .await
        .expect("failed to bind listener");

    tracing::info!(
        "listening on {} for incoming webhooks to forward to segment",
        cli.address
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown())
        .await
        .expect("server error");
}
