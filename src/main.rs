//! Main entry point for the alliance rating service
//!
//! Loads configuration, restores the last snapshot, and serves the rating
//! API until SIGINT or SIGTERM.

use alliance_rating::api::ApiServer;
use alliance_rating::config::AppConfig;
use alliance_rating::service::{AppState, HealthStatus};
use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};

/// Alliance Rating Service - TrueSkill ratings for alliance matches
#[derive(Parser)]
#[command(
    name = "alliance-rating",
    version,
    about = "A Bayesian skill rating service for alliance-based robotics matches",
    long_about = "Alliance Rating keeps a Gaussian skill belief for every team, rebuilds it from \
                 match results fetched from The Blue Alliance, and serves win probability \
                 predictions for hypothetical alliance matchups over HTTP."
)]
struct Args {
    /// Configuration file path
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "Path to configuration file (TOML format)"
    )]
    config: Option<PathBuf>,

    /// Perform health check and exit
    #[arg(long, help = "Initialise the service, report health and exit")]
    health_check: bool,

    /// Log level override
    #[arg(
        short,
        long,
        value_name = "LEVEL",
        help = "Override log level (trace, debug, info, warn, error)"
    )]
    log_level: Option<String>,

    /// HTTP port override
    #[arg(long, value_name = "PORT", help = "Override HTTP server port")]
    http_port: Option<u16>,

    /// Snapshot path override
    #[arg(long, value_name = "FILE", help = "Override the ratings snapshot path")]
    data_path: Option<PathBuf>,

    /// Skip the startup snapshot import
    #[arg(long, help = "Start with empty ratings even if a snapshot exists")]
    no_load: bool,

    /// Enable debug mode
    #[arg(short, long, help = "Enable debug mode with verbose logging")]
    debug: bool,

    /// Dry run mode (validate config and exit)
    #[arg(
        long,
        help = "Validate configuration and exit without starting service"
    )]
    dry_run: bool,
}

/// Initialize structured logging with the configured level
fn init_logging(log_level: &str) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with_target(false)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}

/// Perform health check and return appropriate exit code
async fn perform_health_check(config: AppConfig) -> Result<()> {
    info!("Performing health check...");

    let app_state = AppState::from_config(config)?;
    app_state.load_on_startup().await?;

    let health = app_state.health();
    println!("Health Check: {}", health.status);
    println!("  Teams Indexed: {}", health.teams_indexed);
    println!("  Event: {}", health.context.event_key.as_deref().unwrap_or("-"));
    println!(
        "  Year: {}",
        health
            .context
            .year
            .map(|y| y.to_string())
            .unwrap_or_else(|| "-".to_string())
    );

    if health.status == HealthStatus::Healthy {
        std::process::exit(0);
    } else {
        std::process::exit(1);
    }
}

/// Wait for shutdown signals (SIGINT, SIGTERM)
async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C) signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }
}

/// Display startup banner with service information
fn display_startup_banner(config: &AppConfig) {
    info!("🚀 Alliance Rating Service");
    info!("   Service: {}", config.service.name);
    info!("   Log level: {}", config.service.log_level);
    info!("   HTTP: {}", config.http_bind_address());
    info!("   Match data: {}", config.provider.base_url);
    info!("   Snapshot: {}", config.storage.data_path.display());
    info!(
        "   Environment: mu={} sigma={:.4} beta={:.4} tau={:.4} draw={}",
        config.rating.mu,
        config.rating.sigma,
        config.rating.beta,
        config.rating.tau,
        config.rating.draw_probability
    );
    if config.provider.auth_key.is_none() {
        warn!("   TBA_AUTH_KEY is not set; /update will be rejected");
    }
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
}

/// Load and merge configuration from environment and CLI arguments
fn load_config(args: &Args) -> Result<AppConfig> {
    let mut config = if let Some(config_path) = &args.config {
        AppConfig::from_file(config_path)?
    } else {
        AppConfig::from_env()?
    };

    // Apply CLI overrides
    if let Some(log_level) = &args.log_level {
        config.service.log_level = log_level.clone();
    }

    if args.debug {
        config.service.log_level = "debug".to_string();
    }

    if let Some(http_port) = args.http_port {
        config.service.http_port = http_port;
    }

    if let Some(data_path) = &args.data_path {
        config.storage.data_path = data_path.clone();
    }

    if args.no_load {
        config.storage.load_on_startup = false;
    }

    alliance_rating::config::validate_config(&config)?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Load configuration (CLI args can override environment/config file)
    let config = load_config(&args).unwrap_or_else(|e| {
        eprintln!("Configuration error: {:#}", e);
        std::process::exit(1);
    });

    // Initialize logging early (before any other operations)
    if let Err(e) = init_logging(&config.service.log_level) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    // Handle special modes
    if args.health_check {
        return perform_health_check(config).await;
    }

    if args.dry_run {
        info!("Configuration validation successful");
        display_startup_banner(&config);
        info!("Dry run completed - exiting without starting service");
        return Ok(());
    }

    display_startup_banner(&config);

    info!("Initializing service components...");
    let app_state = match AppState::from_config(config.clone()) {
        Ok(state) => Arc::new(state),
        Err(e) => {
            error!("Failed to initialize application: {:#}", e);
            std::process::exit(1);
        }
    };

    match app_state.load_on_startup().await {
        Ok(Some(loaded)) => info!(
            "Restored {} teams from {}",
            loaded.teams_indexed,
            loaded.file.display()
        ),
        Ok(None) => {}
        Err(e) => warn!("Startup snapshot not loaded, starting empty: {:#}", e),
    }

    let server = Arc::new(ApiServer::new(app_state.clone()));
    let mut server_task = {
        let server = server.clone();
        tokio::spawn(async move { server.start().await })
    };

    info!("✅ Alliance Rating Service is running");
    info!("Press Ctrl+C to shutdown gracefully...");

    let joined = tokio::select! {
        _ = wait_for_shutdown_signal() => {
            info!("🛑 Shutdown signal received, beginning graceful shutdown...");
            server.stop();
            match tokio::time::timeout(config.shutdown_timeout(), &mut server_task).await {
                Ok(joined) => joined,
                Err(_) => {
                    warn!("⚠️  Shutdown timeout exceeded, forcing exit");
                    server_task.abort();
                    Ok(Ok(()))
                }
            }
        }
        joined = &mut server_task => joined,
    };

    match joined {
        Ok(Ok(())) => info!("✅ Graceful shutdown completed successfully"),
        Ok(Err(e)) => {
            error!("API server failed: {:#}", e);
            std::process::exit(1);
        }
        Err(e) => {
            error!("API server task panicked: {}", e);
            std::process::exit(1);
        }
    }

    info!("🛑 Alliance Rating Service stopped");
    Ok(())
}
