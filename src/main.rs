//! cityio-kpi - land-use KPIs and cell geometry for cityIO tables
//!
//! This is the main entry point for the cityio-kpi application.

use std::net::SocketAddr;
use tokio::signal;
use tracing::{error, info};

use cityio_kpi::cityio::CityIoClient;
use cityio_kpi::config::Command;
use cityio_kpi::handlers::router;
use cityio_kpi::{init_tracing, log_error, run_cycle, AppState, Config, KpiError};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let (config, command) = Config::load()?;

    init_tracing(&config.log_level);

    info!("Starting cityio-kpi v{}", env!("CARGO_PKG_VERSION"));

    let outcome = match command {
        Command::Run => run(config).await,
        Command::Serve { .. } => serve(config).await,
    };

    if let Err(e) = &outcome {
        log_error(e, "main");
    }
    Ok(outcome?)
}

/// Fetch, evaluate and post once
async fn run(config: Config) -> cityio_kpi::Result<()> {
    config.validate_for_run().map_err(|e| {
        error!("Invalid configuration: {}", e);
        e
    })?;

    let client = CityIoClient::from_config(&config.cityio)?;
    let summary = run_cycle(&client, &config).await?;

    info!(
        cycle_id = %summary.cycle_id,
        occupied = summary.stats.occupied,
        features = ?summary.feature_count,
        "Result posted"
    );
    Ok(())
}

/// Serve the evaluation endpoint until a shutdown signal arrives
async fn serve(config: Config) -> cityio_kpi::Result<()> {
    config.validate_for_serve().map_err(|e| {
        error!("Invalid configuration: {}", e);
        e
    })?;

    // Create the server address
    let addr = SocketAddr::from((
        config
            .server
            .host
            .parse::<std::net::IpAddr>()
            .map_err(|e| KpiError::Config {
                message: format!("Invalid host address: {}", e),
            })?,
        config.server.port,
    ));

    let app = router(AppState::new_shared(config));

    info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| KpiError::Server {
            message: format!("Failed to bind to address: {}", e),
        })?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| KpiError::Server {
            message: format!("Server error: {}", e),
        })?;

    info!("Server has been gracefully shut down");
    Ok(())
}

/// Wait for a shutdown signal
async fn shutdown_signal() {
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
            info!("Received Ctrl+C, starting graceful shutdown");
        },
        _ = terminate => {
            info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
