//! Paddock binary entry point.
//!
//! Wires configuration, the OAuth client, the metric sinks, and the
//! polling supervisor together, then serves the HTTP endpoints until
//! interrupted.

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use paddock::poller::GROUPS;
use paddock::server::{create_router, AppState};
use paddock::{AppConfig, OAuthClient, PollingSupervisor, ResourcePoller, SinkRegistry};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Paddock - OAuth2 Vehicle Telemetry Exporter
#[derive(Parser, Debug)]
#[command(name = "paddock", version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(
        short,
        long,
        default_value = "configs/config.yaml",
        env = "PADDOCK_CONFIG"
    )]
    config: String,

    /// Server bind address (overrides config file)
    #[arg(long, env = "PADDOCK_SERVER_BIND")]
    server_bind: Option<String>,

    /// Server port (overrides config file)
    #[arg(long, env = "PADDOCK_SERVER_PORT")]
    server_port: Option<u16>,

    /// Vehicle identification number (overrides config file)
    #[arg(long, env = "PADDOCK_VIN")]
    vin: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,paddock=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    tracing::info!("Loading configuration from: {}", cli.config);
    let mut config = AppConfig::load(&cli.config)?;

    // Apply CLI/env overrides (CLI > ENV > config file)
    if let Some(bind) = cli.server_bind {
        config.server.bind = bind;
    }
    if let Some(port) = cli.server_port {
        config.server.port = port;
    }
    if let Some(vin) = cli.vin {
        config.vehicle.vin = vin;
    }
    config.validate()?;

    let registry = prometheus::Registry::new();
    let sinks = Arc::new(SinkRegistry::new(&registry)?);
    let auth = Arc::new(OAuthClient::new(config.oauth.clone())?);

    let pollers: Vec<ResourcePoller> = GROUPS
        .iter()
        .map(|group| {
            ResourcePoller::new(
                *group,
                Arc::clone(&auth),
                Arc::clone(&sinks),
                &config.vehicle.vin,
                &config.vehicle.api_base,
            )
        })
        .collect();
    let supervisor = Arc::new(PollingSupervisor::new(Arc::clone(&auth), pollers));

    // No-op until the OAuth flow has produced a token; a restored
    // token starts polling immediately.
    supervisor.start().await;

    let state = AppState {
        auth,
        supervisor: Arc::clone(&supervisor),
        registry,
    };
    let router = create_router(state);

    let addr: SocketAddr = format!("{}:{}", config.server.bind, config.server.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, vin = %config.vehicle.vin, "paddock listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    supervisor.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
    tracing::info!("shutdown signal received");
}
