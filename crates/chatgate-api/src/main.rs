//! chatgate CLI and REST API entry point.
//!
//! Binary name: `chatgate`
//!
//! Parses CLI arguments, loads configuration, then dispatches to the
//! appropriate command handler or starts the REST API server.

mod cli;
mod http;
mod state;

use clap::Parser;
use clap_complete::generate;

use chatgate_infra::config::{load_gateway_config, resolve_port};
use chatgate_infra::filesystem::resolve_data_dir;
use chatgate_observe::{TracingOptions, init_tracing, shutdown_tracing};

use cli::{Cli, Commands};
use state::{AppState, resolve_api_key};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Shell completions don't need tracing or config
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "chatgate", &mut std::io::stdout());
        return Ok(());
    }

    init_tracing(&TracingOptions {
        json: cli.log_json,
        otel: cli.otel,
        default_filter: cli.log_filter().to_string(),
    })
    .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

    let data_dir = resolve_data_dir();
    tokio::fs::create_dir_all(&data_dir).await?;
    let config = load_gateway_config(&data_dir).await;

    let result = match cli.command {
        Commands::Serve { port, host } => {
            let port = resolve_port(&config, port, |var| std::env::var(var).ok());
            let host = host.unwrap_or_else(|| config.host.clone());
            serve(config, data_dir, &host, port).await
        }
        Commands::Status => cli::session::status(&config, &data_dir, cli.json).await,
        Commands::Config => cli::config::show_config(&config, &data_dir, cli.json),
        Commands::Logout => cli::session::logout(&config, &data_dir, cli.json).await,
        Commands::Completions { .. } => Ok(()),
    };

    shutdown_tracing();
    result
}

async fn serve(
    config: chatgate_types::config::GatewayConfig,
    data_dir: std::path::PathBuf,
    host: &str,
    port: u16,
) -> anyhow::Result<()> {
    let api_key = resolve_api_key(&config, |var| std::env::var(var).ok());
    if api_key.is_none() {
        tracing::warn!("no API key configured, /api routes accept unauthenticated requests");
    }

    let state = AppState::new(config, data_dir, api_key)?;
    let status = state.session.initialize().await;
    tracing::info!(state = %status.state, session_id = %state.session.session_id(), "session starting");

    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    println!(
        "  {} chatgate listening on {}",
        console::style("⚡").bold(),
        console::style(format!("http://{addr}")).cyan()
    );
    println!("  {}", console::style("Press Ctrl+C to stop").dim());

    let router = http::router::build_router(state.clone());
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    state.session.shutdown().await;
    println!("\n  Server stopped.");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
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
                tracing::error!(error = %e, "failed to install SIGTERM handler");
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
