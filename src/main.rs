//!
//! Authenticated file server with JWT role-based access.
//! Reads configuration from TOML file (~/.config/fileserver-api/config.toml).

use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::{error, info, warn};

use fileserver_api::application::AccountService;
use fileserver_api::config::AppConfig;
use fileserver_api::files::FileStore;
use fileserver_api::identity::IdentityDirectory;
use fileserver_api::shared::shutdown::{listen_for_shutdown_signals, ShutdownSignal};
use fileserver_api::{create_api_router, default_config_path};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // ── Load configuration ─────────────────────────────────────
    let config_path = std::env::var("FILE_SERVER_CONFIG")
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|_| default_config_path());
    let app_cfg = match AppConfig::load(&config_path) {
        Ok(cfg) => {
            // Initialize logging with configured level
            tracing_subscriber::fmt()
                .with_env_filter(
                    tracing_subscriber::EnvFilter::try_from_default_env()
                        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cfg.logging.level)),
                )
                .init();
            info!("Configuration loaded from {}", config_path.display());
            cfg
        }
        Err(e) => {
            tracing_subscriber::fmt()
                .with_env_filter(tracing_subscriber::EnvFilter::new("info"))
                .init();
            error!("Failed to load config: {}. Using defaults.", e);
            AppConfig::default()
        }
    };

    info!("Starting File Server API...");

    // ── Prometheus metrics recorder (must be installed before any metrics calls) ──
    let prometheus_handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus metrics recorder");
    info!("📊 Prometheus metrics recorder installed");

    let jwt_config = app_cfg.jwt_auth.clone();
    if jwt_config.key.is_empty() {
        warn!("⚠️  JWT signing key is empty; logins will fail until [jwt_auth].key or JWT_AUTH_KEY is set");
    } else {
        info!(
            "JWT configured with {}min token expiration",
            jwt_config.expires_time_minutes
        );
    }
    if app_cfg.admin.password == "123" {
        warn!("⚠️  Default admin password in use. Please change it immediately!");
    }

    // ── File store ─────────────────────────────────────────────
    let store = Arc::new(FileStore::new(&app_cfg.files.content_dir));
    store.ensure_root().await?;
    info!("Serving files from {}", store.root().display());

    // ── Identity & account service ─────────────────────────────
    let directory = Arc::new(IdentityDirectory::with_admin(
        &app_cfg.admin.username,
        &app_cfg.admin.password,
    ));
    let service = Arc::new(AccountService::new(directory, jwt_config.clone()));

    // Start listening for shutdown signals (SIGTERM, SIGINT)
    let shutdown = ShutdownSignal::new();
    tokio::spawn(listen_for_shutdown_signals(shutdown.clone()));

    // Create REST API router
    let api_router = create_api_router(service, store, jwt_config, prometheus_handle);

    // Start REST API server with graceful shutdown
    let api_addr = format!("{}:{}", app_cfg.server.host, app_cfg.server.port);
    let listener = tokio::net::TcpListener::bind(&api_addr).await?;
    info!("REST API server listening on http://{}", api_addr);
    info!("Swagger UI available at http://{}/docs/", api_addr);

    let api_shutdown = shutdown.clone();
    axum::serve(listener, api_router)
        .with_graceful_shutdown(async move {
            api_shutdown.wait().await;
            info!("🛑 REST API server received shutdown signal");
        })
        .await?;

    info!("👋 File Server API shutdown complete");
    Ok(())
}
