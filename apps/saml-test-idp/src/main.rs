//! SAML Test Identity Provider
//!
//! Serves SP-initiated SSO for a fixed set of test users declared in a YAML
//! file. Point a Service Provider at `/metadata`, pick a user on the chooser
//! page and receive a signed assertion.

mod config;
mod logging;

use anyhow::Context;
use clap::Parser;
use config::AppConfig;
use std::future::IntoFuture;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use testidp_saml::{
    create_saml_state, saml_router, spawn_cleanup_task, IdentityRegistry, InMemoryPendingStore,
    PendingRequestStore, SamlState, ValidatedRequest,
};
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::info;

/// In-flight requests get this long to finish after a shutdown signal.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Parser)]
#[command(name = "saml-test-idp", version, about)]
struct Cli {
    /// Path to the YAML configuration file
    #[arg(short, long, env = "TESTIDP_CONFIG", default_value = "config.yaml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::from_file(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    config.apply_env_overrides();

    logging::init_logging(&config.logging);

    let (state, store) = build_state(&config)?;

    if config.session.cleanup_interval_secs > 0 {
        let _cleanup = spawn_cleanup_task(
            store,
            Duration::from_secs(config.session.cleanup_interval_secs),
        );
    }

    let app = saml_router(state).layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind((config.server.host.as_str(), config.server.port))
        .await
        .with_context(|| format!("binding {}:{}", config.server.host, config.server.port))?;

    let base_url = config.base_url();
    info!(addr = %listener.local_addr()?, "Server listening");
    info!("Metadata URL: {base_url}/metadata");
    info!("SSO URL: {base_url}/sso");

    serve(listener, app).await?;
    info!("Server shutdown complete");
    Ok(())
}

/// Assemble router state from configuration.
fn build_state(
    config: &AppConfig,
) -> anyhow::Result<(SamlState, Arc<dyn PendingRequestStore<ValidatedRequest>>)> {
    let credentials = config
        .signing_credentials()
        .context("loading IdP signing credentials")?;

    let registry = IdentityRegistry::new(config.relying_parties()?)
        .context("building service provider registry")?;
    info!(service_providers = registry.len(), "Loaded service providers");

    let store: Arc<dyn PendingRequestStore<ValidatedRequest>> =
        Arc::new(InMemoryPendingStore::with_ttl(config.pending_ttl()));

    let state = create_saml_state(
        config.base_url(),
        config.idp_entity_id(),
        Arc::new(registry),
        Arc::clone(&store),
        credentials,
        config.assertion_validity(),
    );
    Ok((state, store))
}

/// Run the server until a shutdown signal, then drain for at most
/// [`SHUTDOWN_TIMEOUT`].
async fn serve(listener: tokio::net::TcpListener, app: axum::Router) -> anyhow::Result<()> {
    let (signalled_tx, signalled_rx) = tokio::sync::oneshot::channel();
    let mut server = tokio::spawn(
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                shutdown_signal().await;
                let _ = signalled_tx.send(());
            })
            .into_future(),
    );

    tokio::select! {
        result = &mut server => {
            result.context("server task panicked")??;
        }
        _ = signalled_rx => {
            match tokio::time::timeout(SHUTDOWN_TIMEOUT, &mut server).await {
                Ok(result) => result.context("server task panicked")??,
                Err(_) => {
                    tracing::warn!(
                        timeout_secs = SHUTDOWN_TIMEOUT.as_secs(),
                        "Graceful shutdown timed out, dropping open connections"
                    );
                    server.abort();
                }
            }
        }
    }
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        () = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
