//! fanwatch daemon
//!
//! Samples configured sensors in the background, keeps a moving average per
//! sensor and serves them over a JSON API and a Prometheus endpoint.

mod config;
mod metrics;
mod state;
mod web;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use config::Config;
use state::AppState;

#[derive(Parser)]
#[command(name = "fanwatchd", version, about = "Sensor sampling daemon")]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "/etc/fanwatch/fanwatch.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the daemon (default)
    Run,
    /// Validate the configuration file and exit
    Validate,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Setup logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run(cli.config).await,
        Commands::Validate => {
            validate(&cli.config);
            Ok(())
        }
    }
}

fn validate(path: &Path) {
    info!("Using configuration file at: {}", path.display());
    let result = Config::load(path).and_then(|config| Ok(config.validate()?));
    match result {
        Ok(()) => info!("Config looks good! :)"),
        Err(e) => {
            error!("Validation failed: {:#}", e);
            std::process::exit(1);
        }
    }
}

async fn run(config_path: PathBuf) -> Result<()> {
    // Load configuration
    let config = Config::load(&config_path).context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;
    info!("Loaded configuration from: {}", config_path.display());

    // Initialize application state
    let state = Arc::new(AppState::new(config.clone(), &config_path)?);
    info!("Rolling window size: {}", state.window().get());
    state.prime_sensors().await;

    let cancel = CancellationToken::new();
    let monitors = state.spawn_monitors(&cancel);
    info!("Started {} sensor monitor(s)", monitors.len());

    // Optionally start API server
    let server = if config.api.enabled {
        let app = web::create_router(state.clone());
        let addr: SocketAddr = config
            .api
            .listen
            .parse()
            .context("Invalid listen address")?;
        let listener = TcpListener::bind(addr).await?;
        info!("API listening on http://{}", addr);

        let shutdown = cancel.clone();
        Some(tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown.cancelled_owned())
                .await
        }))
    } else {
        info!("API disabled");
        None
    };

    // Setup Unix signal handlers
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sighup = signal(SignalKind::hangup())?;

    loop {
        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down");
                break;
            }
            _ = sigint.recv() => {
                info!("Received SIGINT, shutting down");
                break;
            }
            _ = sighup.recv() => {
                info!("Received SIGHUP, reloading configuration");
                if let Err(e) = state.reload() {
                    warn!("Reload failed, keeping current settings: {:#}", e);
                }
            }
        }
    }

    cancel.cancel();
    for monitor in monitors {
        if let Err(e) = monitor.await {
            warn!("Sensor monitor panicked: {}", e);
        }
    }

    if let Some(server) = server {
        server.await??;
    }

    info!("Shutdown complete");
    Ok(())
}
