use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use derby_core::RaceStore;
use derby_judge::ClodJudge;
use tokio::task::JoinHandle;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use derby_api::config::ServerConfig;
use derby_api::engine::AnswerPipeline;
use derby_api::router::build_app_router;
use derby_api::state::AppState;
use derby_api::ws::{self, BroadcastHub};

const DEFAULT_LOG_FILTER: &str =
    "derby_api=debug,derby_core=debug,derby_judge=debug,tower_http=debug";

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = ServerConfig::from_env();
    tracing::info!(
        host = %config.host,
        port = config.port,
        judge = ?config.judge,
        judge_timeout_secs = config.judge_timeout_secs,
        "Configuration loaded",
    );

    let store = Arc::new(RaceStore::default());
    let hub = Arc::new(BroadcastHub::new());
    let heartbeat = ws::start_heartbeat(Arc::clone(&hub));
    let judge_timeout = Duration::from_secs(config.judge_timeout_secs);
    let http_client = reqwest::Client::builder()
        .timeout(judge_timeout)
        .build()
        .expect("Failed to build HTTP client");
    let pipeline = AnswerPipeline::new(
        Arc::clone(&store),
        Arc::new(ClodJudge::with_client(http_client, config.judge.clone())),
        Arc::clone(&hub),
        judge_timeout,
    );

    let app = build_app_router(
        AppState {
            config: Arc::new(config.clone()),
            store,
            hub: Arc::clone(&hub),
            pipeline: pipeline.clone(),
        },
        &config,
    );

    let ip: IpAddr = config.host.parse().expect("HOST must be an IP address");
    let addr = SocketAddr::new(ip, config.port);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listener");
    tracing::info!(%addr, "Race server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    drain(
        &pipeline,
        &hub,
        heartbeat,
        Duration::from_secs(config.shutdown_timeout_secs),
    )
    .await;
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Post-shutdown cleanup once the listener has stopped.
///
/// In-flight submissions are cancelled before viewers are closed so no
/// verdict is pushed to a socket that is going away.
async fn drain(
    pipeline: &AnswerPipeline,
    hub: &BroadcastHub,
    heartbeat: JoinHandle<()>,
    grace: Duration,
) {
    tracing::info!(in_flight = pipeline.in_flight(), "Stopping answer pipeline");
    if !pipeline.shutdown(grace).await {
        tracing::warn!(
            grace_secs = grace.as_secs(),
            "Submissions still running after shutdown grace period",
        );
    }

    let viewers = hub.connection_count().await;
    hub.shutdown_all().await;
    heartbeat.abort();

    tracing::info!(viewers, "Shutdown complete");
}

/// Resolve on SIGINT, or SIGTERM on Unix.
async fn shutdown_signal() {
    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Cannot listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let signal = tokio::select! {
        () = interrupt => "SIGINT",
        () = terminate => "SIGTERM",
    };
    tracing::info!(signal, "Shutting down");
}
