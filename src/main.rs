//! Person SOAP service binary.
//!
//! Run with: `person-soap-service --config config.yaml`

use anyhow::{Context, Result};
use clap::Parser;
use person_soap::storage::{self, SeaOrmPersonRepository};
use person_soap::{router, PersonService, PersonServiceConfig};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

/// Person directory service speaking SOAP over HTTP.
///
/// Stores person records in SQLite or PostgreSQL and exposes
/// Add/Update/Delete/Get/GetAll/Search operations on one endpoint.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (YAML)
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Listen address, overrides `server.listen_address`
    #[arg(long)]
    listen: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = args.log_level.parse().unwrap_or(Level::INFO);
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    info!("Starting Person SOAP service v{}", env!("CARGO_PKG_VERSION"));
    info!("Config file: {}", args.config.display());

    let mut config: PersonServiceConfig = if args.config.exists() {
        let content = tokio::fs::read_to_string(&args.config)
            .await
            .context("Failed to read config file")?;
        serde_yaml::from_str(&content).context("Failed to parse config file")?
    } else {
        info!("Config file not found, using defaults");
        PersonServiceConfig::default()
    };

    if let Some(listen) = args.listen {
        config.server.listen_address = listen;
    }

    info!(
        listen = %config.server.listen_address,
        endpoint = %config.server.endpoint_path,
        auth = ?config.auth,
        seed = config.seed.len(),
        "Configuration loaded"
    );

    let db = storage::connect(&config.database)
        .await
        .context("Failed to connect to database")?;
    storage::prepare(&db, &config.database, &config.seed)
        .await
        .context("Failed to prepare database")?;

    let repository = Arc::new(SeaOrmPersonRepository::new(db));
    let service = PersonService::from_config(&config, repository)
        .context("Invalid validation.phone_pattern")?;
    let app = router(Arc::new(service), &config.server);

    let listener = TcpListener::bind(&config.server.listen_address)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.listen_address))?;

    info!(
        "Serving SOAP endpoint at http://{}{}",
        config.server.listen_address, config.server.endpoint_path
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("Person SOAP service stopped");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
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
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, stopping server");
}
