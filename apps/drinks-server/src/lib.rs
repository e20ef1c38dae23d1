// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Drinks Menu Service
//!
//! A small HTTP backend for a drinks menu. Anyone can read the menu; the
//! recipe details and every mutation require a bearer token whose
//! `permissions` claim grants the matching permission.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers and router (Axum)
//! - `auth` - Bearer token authorization (JWKS-verified JWTs)
//! - `config` - Environment configuration
//! - `storage` - Drink store (redb)

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod state;
pub mod storage;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum_server::{tls_rustls::RustlsConfig, Handle};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::auth::{AuthError, AuthGate, JwksManager};
use crate::config::{AppConfig, ConfigError, LogFormat, DEFAULT_LOG_FILTER};
use crate::models::{Drink, Ingredient};
use crate::state::AppState;
use crate::storage::{DrinkStore, NewDrink, StoreError};

/// How long in-flight requests get to finish after a shutdown signal.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("drink store: {0}")]
    Store(#[from] StoreError),

    #[error("signing keys: {0}")]
    Auth(#[from] AuthError),

    #[error("failed to install rustls crypto provider")]
    CryptoProvider,

    #[error("failed to load TLS certificate: {0}")]
    Tls(std::io::Error),

    #[error("server failed: {0}")]
    Serve(std::io::Error),
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` overrides the default filter.
pub fn init_tracing(format: LogFormat) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

/// Insert the sample drink if the store is empty.
pub fn seed_sample_drink(store: &DrinkStore) -> Result<Option<Drink>, StoreError> {
    if !store.is_empty()? {
        return Ok(None);
    }
    let drink = store.create(NewDrink {
        title: "water".to_string(),
        recipe: vec![Ingredient {
            name: "water".to_string(),
            color: "blue".to_string(),
            parts: 1,
        }],
    })?;
    Ok(Some(drink))
}

fn open_store(config: &AppConfig) -> Result<DrinkStore, StoreError> {
    let store = match &config.database_path {
        Some(path) => {
            info!(path = %path.display(), "Opening drink database");
            DrinkStore::open(path)?
        }
        None => {
            warn!("DATABASE_PATH not set, drinks are kept in memory");
            DrinkStore::in_memory()?
        }
    };

    if config.seed_sample_drink {
        if let Some(drink) = seed_sample_drink(&store)? {
            info!(drink_id = drink.id, title = %drink.title, "Seeded sample drink");
        }
    }
    Ok(store)
}

fn build_gate(config: &AppConfig) -> Result<AuthGate, AuthError> {
    let auth = &config.auth;
    let mut keys =
        JwksManager::remote(auth.jwks_url.as_str())?.with_min_refresh_interval(auth.jwks_min_refresh);
    if let Some(ttl) = auth.jwks_cache_ttl {
        keys = keys.with_cache_ttl(ttl);
    }

    info!(
        jwks_url = %auth.jwks_url,
        issuer = %auth.issuer,
        audience = %auth.audience,
        "Token verification configured"
    );
    Ok(AuthGate::new(Arc::new(keys), &auth.issuer, &auth.audience).with_leeway(auth.leeway_secs))
}

/// Build the application from `config` and serve it until shutdown.
pub async fn run(config: AppConfig) -> Result<(), StartupError> {
    let drinks = open_store(&config)?;
    let gate = Arc::new(build_gate(&config)?);
    let app = api::router(AppState::new(drinks, gate));
    let addr = config.bind_addr()?;

    let handle: Handle<SocketAddr> = Handle::new();
    tokio::spawn(shutdown_on_signal(handle.clone()));

    match &config.tls {
        Some(tls) => {
            rustls::crypto::ring::default_provider()
                .install_default()
                .map_err(|_| StartupError::CryptoProvider)?;
            let tls_config = RustlsConfig::from_pem_file(&tls.cert_path, &tls.key_path)
                .await
                .map_err(StartupError::Tls)?;

            info!(%addr, "Drinks server listening on https (docs at /docs)");
            axum_server::bind_rustls(addr, tls_config)
                .handle(handle)
                .serve(app.into_make_service())
                .await
                .map_err(StartupError::Serve)?;
        }
        None => {
            info!(%addr, "Drinks server listening on http (docs at /docs)");
            axum_server::bind(addr)
                .handle(handle)
                .serve(app.into_make_service())
                .await
                .map_err(StartupError::Serve)?;
        }
    }

    info!("Server stopped");
    Ok(())
}

async fn shutdown_on_signal(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "Failed to register SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl-C"),
        _ = terminate => info!("Received SIGTERM"),
    }

    info!(grace_secs = SHUTDOWN_GRACE.as_secs(), "Shutting down");
    handle.graceful_shutdown(Some(SHUTDOWN_GRACE));
}
