//! Inspectra - AI-assisted industrial component inspection CLI
//!
//! Main entry point for the Inspectra application.

use anyhow::Result;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use inspectra::cli::{Cli, Commands};
use inspectra::commands;
use inspectra::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    init_tracing();

    // Parse command line arguments
    let cli = Cli::parse_args();

    // If the user supplied a database path on the CLI, mirror it into
    // INSPECTRA_DB so the storage initializer can pick it up. This keeps
    // callers unchanged while allowing `SqliteStore::new()` to honor an
    // override.
    if let Some(db_path) = &cli.db_path {
        std::env::set_var(inspectra::storage::ENV_DB_PATH, db_path);
        tracing::info!("Using storage DB override from CLI: {}", db_path);
    }

    // Load configuration
    let config_path = cli.config.as_deref().unwrap_or("config/config.yaml");
    let config = Config::load(config_path)?;

    // Validate configuration
    config.validate()?;

    // Execute command
    match cli.command {
        Commands::Inspect {
            session,
            image,
            mode,
            focus,
        } => {
            tracing::info!("Starting interactive inspection mode");
            if let Some(id) = &session {
                tracing::debug!("Resuming session: {}", id);
            }
            if let Some(path) = &image {
                tracing::debug!("Attaching image: {}", path.display());
            }

            commands::inspect::run_inspect(config, session, image, mode, focus).await?;
            Ok(())
        }
        Commands::Sessions { command } => {
            tracing::info!("Starting session management command");
            commands::sessions::run_sessions(&config, command)?;
            Ok(())
        }
        Commands::Export { session, output } => {
            tracing::info!("Exporting session {} to {}", session, output.display());
            commands::export::run_export(&config, &session, &output)?;
            Ok(())
        }
    }
}

/// Initialize tracing subscriber with environment filter
fn init_tracing() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("inspectra=info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
