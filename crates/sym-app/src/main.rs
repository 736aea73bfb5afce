//! SYM application binary - composition root.
//!
//! 1. Parse CLI arguments and load the TOML configuration
//! 2. Initialize tracing
//! 3. Build storage, collaborators, the ingestion pipeline and the report
//!    synthesizer
//! 4. Serve the axum API until Ctrl-C

mod cli;
mod services;

use clap::Parser;

use sym_api::routes;
use sym_core::config::SymConfig;

use cli::CliArgs;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config.
    let config_file = args.resolve_config_path();
    let mut config = SymConfig::load_or_default(&config_file)?;
    args.apply_overrides(&mut config);

    // Tracing. RUST_LOG wins over the configured level.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.general.log_level)),
        )
        .init();

    tracing::info!("Starting SYM backend v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(path = %config_file.display(), "Configuration resolved");

    // Storage.
    let data_dir = services::resolve_data_dir(&config.general.data_dir);
    if let Err(e) = std::fs::create_dir_all(&data_dir) {
        tracing::error!(path = %data_dir.display(), error = %e, "Failed to create data directory");
        return Err(e.into());
    }

    let state = services::build_state(config.clone(), &data_dir, args.mock_services)
        .inspect_err(|e| tracing::error!(error = %e, "Failed to build services"))?;

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
        tracing::info!("Shutdown signal received");
    };

    routes::start_server(&config, state, shutdown).await?;

    tracing::info!("SYM backend stopped");
    Ok(())
}
