//! Conflict screening service
//!
//! Single-binary service that:
//! 1. Loads TOML config, resolving the Clio client secret from the env or a file
//! 2. Restores the persisted credential, if any
//! 3. Serves the auth, check, and ops routes
//! 4. Drains in-flight requests on SIGTERM/SIGINT

mod config;
mod corpus;
mod metrics;
mod routes;
mod service;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use clio_api::ApiClient;
use clio_auth::{AuthSession, CredentialStore, FileCredentialStore, OAuthConfig};

use crate::config::Config;
use crate::routes::AppState;
use crate::service::ConflictService;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and LOG_LEVEL / RUST_LOG support
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("starting conflict-check");

    // Install Prometheus metrics recorder before any metrics are emitted
    let prometheus_handle = metrics::install_recorder();

    let args: Vec<String> = std::env::args().collect();
    let cli_config = args
        .iter()
        .position(|a| a == "--config")
        .and_then(|i| args.get(i + 1))
        .map(String::as_str);

    let config_path = Config::resolve_path(cli_config);
    info!(path = %config_path.display(), "loading configuration");
    let mut config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    info!(
        listen_addr = %config.server.listen_addr,
        base_url = %config.api.base_url,
        page_size = config.api.page_size,
        max_pages = config.api.max_pages,
        "configuration loaded"
    );

    let Some(client_secret) = config.oauth.client_secret.take() else {
        anyhow::bail!("client secret missing: set CLIO_CLIENT_SECRET or client_secret_file");
    };
    let oauth = OAuthConfig::new(
        config.oauth.client_id.clone(),
        client_secret.expose().clone(),
        config.oauth.redirect_uri.clone(),
    );

    let store = FileCredentialStore::open(config.oauth.credential_path.clone())
        .await
        .with_context(|| {
            format!(
                "failed to open credential store at {}",
                config.oauth.credential_path.display()
            )
        })?;
    let store: Arc<dyn CredentialStore> = Arc::new(store);
    match store.load().await {
        Ok(Some(_)) => info!("stored credential found"),
        _ => info!("no stored credential; authorization required (POST /auth/authorize)"),
    }

    let http_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.api.timeout_secs))
        .build()
        .context("failed to build http client")?;

    let session = Arc::new(AuthSession::new(oauth, store, http_client.clone()));
    let api = ApiClient::new(http_client, config.api.base_url.clone(), session.clone());
    let service = Arc::new(ConflictService::new(
        api,
        config.api.page_size,
        config.api.max_pages,
    ));

    let app_state = AppState {
        service,
        session,
        prometheus: prometheus_handle,
    };
    let app = routes::build_router(app_state, config.server.max_connections);

    let listener = TcpListener::bind(config.server.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.server.listen_addr))?;
    info!(addr = %config.server.listen_addr, "accepting requests");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("shutdown complete");
    Ok(())
}

/// Wait for SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
