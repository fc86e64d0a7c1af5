use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::time::Duration;
use steam_trust::{handlers, spawn_rate_limit_sweeper, AppState, Config};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenv::dotenv().ok();

    // Check if we should enable tokio-console
    if std::env::var("TOKIO_CONSOLE").is_ok() {
        console_subscriber::init();
        info!("tokio-console enabled on port 6669");
    } else {
        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("info,steam_trust=debug"));
        fmt().with_env_filter(env_filter).with_target(true).init();
    }

    let config = Config::from_env();
    if config.steam_api_key.is_none() {
        warn!("STEAM_API_KEY not set, account lookups will fail until it is configured");
    }

    let addr: SocketAddr = config
        .bind_addr
        .parse()
        .with_context(|| format!("invalid BIND_ADDR {:?}", config.bind_addr))?;

    let state = AppState::with_http_api(config).context("failed to build Steam API client")?;

    // Create task tracker and cancellation token for coordinated shutdown
    let cancellation_token = CancellationToken::new();
    let task_tracker = TaskTracker::new();

    spawn_rate_limit_sweeper(&state, cancellation_token.clone(), &task_tracker);

    let app = handlers::router(state.clone());

    println!("\nSteam trust service starting");
    println!("HTTP: http://{addr}");
    println!("\nRate limits (per client address):");
    for (route, quota) in [
        ("resolve-vanity", state.config.resolve_vanity_quota),
        ("steam-account", state.config.steam_account_quota),
        ("page-load", state.config.page_load_quota),
    ] {
        println!(
            "- {route}: {} requests / {}s",
            quota.limit,
            quota.window.as_secs()
        );
    }
    println!("\nUpstream timeout: {}ms", state.config.api_timeout.as_millis());

    // Handle shutdown signal
    let shutdown_token = cancellation_token.clone();
    let shutdown_signal = async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
        }
        info!("Shutdown signal received, stopping services...");
        shutdown_token.cancel();
    };

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal)
    .await?;

    info!("Server stopped, shutting down services...");
    cancellation_token.cancel();
    task_tracker.close();

    match tokio::time::timeout(Duration::from_secs(30), task_tracker.wait()).await {
        Ok(()) => info!("All background tasks completed successfully"),
        Err(_) => {
            error!("Timeout waiting for background tasks to complete");
            std::process::exit(1);
        }
    }

    info!("Clean shutdown complete");

    Ok(())
}
