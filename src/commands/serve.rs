//! `pcbook serve`: run the catalog server.

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::auth::{AuthInterceptor, JwtManager};
use crate::config::ServerConfig;
use crate::model::User;
use crate::service::{AuthServer, LaptopServer, Server};
use crate::store::{
    DiskImageStore, ImageStore, InMemoryLaptopStore, InMemoryRatingStore, InMemoryUserStore,
    UserStore,
};

/// Run the server until Ctrl+C.
///
/// # Errors
///
/// Returns an error if the config is invalid, the seed users cannot be
/// created, or the listener cannot bind.
pub async fn execute(config_path: Option<&Path>, port_override: Option<u16>) -> Result<()> {
    let mut config = match config_path {
        Some(path) => ServerConfig::load_from(path)?,
        None => ServerConfig::default(),
    };
    if let Some(port) = port_override {
        config.port = port;
    }

    let validation = config.validate()?;
    for warning in &validation.warnings {
        warn!("{warning}");
    }

    if let Some(addr) = config.metrics_addr {
        install_metrics_exporter(addr)?;
    }

    let images = Arc::new(DiskImageStore::new(&config.image_dir));
    let server = build_server(&config, images)?;

    let listener = TcpListener::bind(config.bind_addr())
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr()))?;

    let shutdown = CancellationToken::new();
    let on_signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, shutting down");
        }
        on_signal.cancel();
    });

    info!(
        addr = %config.bind_addr(),
        image_dir = %config.image_dir.display(),
        users = config.users.len(),
        "pcbook server started"
    );
    server.serve(listener, shutdown).await.context("Server error")
}

/// Wires stores, token manager and access policy into a [`Server`].
///
/// # Errors
///
/// Returns an error if a seed user cannot be hashed or is a duplicate.
pub fn build_server(config: &ServerConfig, images: Arc<dyn ImageStore>) -> Result<Server> {
    let users = Arc::new(InMemoryUserStore::new());
    seed_users(users.as_ref(), config)?;

    let jwt = Arc::new(JwtManager::new(&config.secret_key, config.token_duration()));
    let interceptor = AuthInterceptor::new(Arc::clone(&jwt), config.access_policy());

    let auth = AuthServer::new(users, jwt);
    let laptops = LaptopServer::new(
        Arc::new(InMemoryLaptopStore::new()),
        images,
        Arc::new(InMemoryRatingStore::new()),
    )
    .with_max_image_size(config.max_image_size);

    Ok(Server::new(interceptor, auth, laptops))
}

fn seed_users(users: &dyn UserStore, config: &ServerConfig) -> Result<()> {
    for seed in &config.users {
        let user = User::new(&seed.username, &seed.password, &seed.role)
            .with_context(|| format!("Failed to create user '{}'", seed.username))?;
        users
            .save(&user)
            .with_context(|| format!("Failed to seed user '{}'", seed.username))?;
        info!(username = %seed.username, role = %seed.role, "Seeded user");
    }
    Ok(())
}

fn install_metrics_exporter(addr: SocketAddr) -> Result<()> {
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .context("Failed to install Prometheus exporter")?;
    info!(%addr, "Prometheus metrics exported");
    Ok(())
}
