//! chatkeep CLI and REST API entry point.
//!
//! Binary name: `chatkeep`
//!
//! Parses CLI arguments, loads configuration, initializes logging, the
//! database, and the chat service, then dispatches to the command handler or
//! starts the REST API server.

mod cli;
mod http;
mod state;

use std::path::PathBuf;

use clap::Parser;

use chatkeep_infra::config::{load_global_config, resolve_data_dir};
use chatkeep_infra::sqlite::session::SqliteSessionRepository;
use chatkeep_observe::tracing_setup::{init_tracing, shutdown_tracing};
use chatkeep_types::config::GlobalConfig;

use cli::{Cli, Commands};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let data_dir = resolve_data_dir();
    let config = load_global_config(&data_dir).await;

    if let Err(e) = init_tracing(&config.log, cli.log_filter()) {
        eprintln!("Warning: failed to initialize logging: {e}");
    }

    let result = run(cli, data_dir, config).await;
    shutdown_tracing();
    result
}

async fn run(cli: Cli, data_dir: PathBuf, config: GlobalConfig) -> anyhow::Result<()> {
    match cli.command {
        Commands::Inspect { user, limit } => {
            // Read-only: no backend or API key needed.
            let pool = state::open_database(&data_dir, &config).await?;
            let repo = SqliteSessionRepository::new(pool);
            cli::inspect::inspect(&repo, user.as_deref(), limit, cli.json).await?;
        }

        Commands::Ask { prompt } => {
            let state = AppState::init(data_dir, config).await?;
            cli::chat::ask(&state, &prompt, cli.json).await?;
        }

        Commands::Chat { user, session } => {
            let state = AppState::init(data_dir, config).await?;
            cli::chat::run_chat(&state, &user, session, cli.json).await?;
        }

        Commands::Serve { port, host } => {
            let state = AppState::init(data_dir, config).await?;

            let addr = format!("{host}:{port}");
            let listener = tokio::net::TcpListener::bind(&addr).await?;

            if !cli.quiet {
                println!(
                    "  {} chatkeep API listening on {}",
                    console::style("⚡").bold(),
                    console::style(format!("http://{addr}")).cyan()
                );
                println!("  {}", console::style("Press Ctrl+C to stop").dim());
            }
            tracing::info!(%addr, data_dir = %state.data_dir.display(), "Server started");

            let router = http::router::build_router(state);

            axum::serve(listener, router)
                .with_graceful_shutdown(shutdown_signal())
                .await?;

            if !cli.quiet {
                println!("\n  Server stopped.");
            }
        }
    }

    Ok(())
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
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
}
