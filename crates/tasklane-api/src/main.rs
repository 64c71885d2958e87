//! Tasklane REST API entry point.
//!
//! Binary name: `tasklane`
//!
//! Parses CLI arguments, loads configuration, initializes tracing and
//! services, then starts the REST API server or runs a utility command.

mod cli;
mod http;
mod state;

use clap::Parser;
use clap_complete::generate;
use tracing::instrument::WithSubscriber;

use tasklane_infra::config::{load_config, resolve_config_path};
use tasklane_observe::tracing_setup::{bootstrap_subscriber, init_tracing, shutdown_tracing};

use cli::{Cli, Commands, ConfigFormat};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let directives = cli.log_directives();

    // Shell completions don't need configuration
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "tasklane", &mut std::io::stdout());
        return Ok(());
    }

    let config_path = resolve_config_path(cli.config.as_deref());
    let mut config = load_config(&config_path)
        .with_subscriber(bootstrap_subscriber(directives))
        .await;

    match cli.command {
        Commands::Config { format } => {
            let rendered = match format {
                ConfigFormat::Toml => toml::to_string_pretty(&config)?,
                ConfigFormat::Json => serde_json::to_string_pretty(&config)?,
            };
            println!("{rendered}");
        }

        Commands::Serve { port, host, agents } => {
            init_tracing(directives, config.logging.json, config.logging.otel)
                .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

            if let Some(port) = port {
                config.server.port = port;
            }
            if let Some(host) = host {
                config.server.host = host;
            }

            let state = AppState::new(&config);
            state.register_agents(&agents).await?;

            let addr = format!("{}:{}", config.server.host, config.server.port);
            let listener = tokio::net::TcpListener::bind(&addr).await?;
            tracing::info!(
                %addr,
                config = %config_path.display(),
                email_domain = %config.naming.email_domain,
                "Tasklane API listening"
            );

            let router = http::router::build_router(state);

            axum::serve(listener, router)
                .with_graceful_shutdown(shutdown_signal())
                .await?;

            tracing::info!("server stopped");
            shutdown_tracing();
        }

        Commands::Completions { .. } => unreachable!("handled above"),
    }

    Ok(())
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
///
/// A handler that fails to install is logged and never fires.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
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
    tracing::info!("shutdown signal received");
}
