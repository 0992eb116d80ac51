// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use axum_server::tls_rustls::RustlsConfig;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use civil_registry_server::{
    api::router,
    auth::JwksManager,
    config::AppConfig,
    registry::{ExpirySweeper, StatusWorkflow},
    state::{AppState, AuthConfig},
    storage::RegistryDatabase,
    telemetry,
};

/// Time allowed for in-flight TLS connections after a shutdown signal.
const SHUTDOWN_GRACE: std::time::Duration = std::time::Duration::from_secs(10);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Install the ring crypto provider for rustls (must be done before any TLS operations)
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| "Failed to install rustls crypto provider")?;

    let config = AppConfig::from_env()?;
    telemetry::init_tracing(config.log_format)?;

    info!(path = %config.database_path.display(), "Opening registry database");
    let db = Arc::new(RegistryDatabase::open(&config.database_path)?);

    let auth_config = match &config.auth.jwks_url {
        Some(url) => {
            let jwks = JwksManager::new(url.clone())?;
            // Warm the cache; readiness keeps retrying if Clerk is down now
            if let Err(error) = jwks.refresh().await {
                warn!(%error, "Initial JWKS fetch failed");
            }
            info!(jwks_url = %url, "JWT verification enabled");
            AuthConfig::production(jwks, config.auth.issuer.clone(), config.auth.audience.clone())
        }
        None if config.auth.dev_mode => {
            warn!("AUTH_DEV_MODE is on: JWT signatures are NOT verified");
            AuthConfig::development()
        }
        None => {
            warn!("No CLERK_JWKS_URL configured: all authenticated requests will be rejected");
            AuthConfig::default()
        }
    };

    let workflow = Arc::new(
        StatusWorkflow::new(db.clone(), config.policy)
            .with_public_base_url(config.public_base_url.clone()),
    );
    info!(
        auto_issue = config.policy.auto_issue,
        allow_resubmission = config.policy.allow_resubmission,
        validity_days = config.policy.expiry.validity().map(|d| d.num_days()),
        "Workflow policy loaded"
    );

    let shutdown = CancellationToken::new();
    let sweeper = tokio::spawn(
        ExpirySweeper::new(workflow.clone())
            .with_interval(config.sweep_interval)
            .run(shutdown.clone()),
    );

    let state = AppState::new(db, workflow).with_auth_config(auth_config);
    let app = router(state);

    tokio::spawn(shutdown_signal(shutdown.clone()));

    let addr = config.bind_addr;
    match &config.tls {
        Some(tls) => {
            let tls_config = RustlsConfig::from_pem_file(&tls.cert, &tls.key).await?;
            let handle = axum_server::Handle::new();
            {
                let handle = handle.clone();
                let shutdown = shutdown.clone();
                tokio::spawn(async move {
                    shutdown.cancelled().await;
                    handle.graceful_shutdown(Some(SHUTDOWN_GRACE));
                });
            }
            info!("Civil registry listening on https://{addr} (docs at /docs)");
            axum_server::bind_rustls(addr, tls_config)
                .handle(handle)
                .serve(app.into_make_service())
                .await?;
        }
        None => {
            let listener = tokio::net::TcpListener::bind(addr).await?;
            info!("Civil registry listening on http://{addr} (docs at /docs)");
            let shutdown = shutdown.clone();
            axum::serve(listener, app)
                .with_graceful_shutdown(async move { shutdown.cancelled().await })
                .await?;
        }
    }

    shutdown.cancel();
    if let Err(error) = sweeper.await {
        error!(%error, "Expiry sweeper task failed");
    }
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal(shutdown: CancellationToken) {
    use tokio::signal;

    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C signal"),
            Err(e) => error!("Failed to listen for Ctrl+C: {}", e),
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
                info!("Received SIGTERM signal");
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
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

    info!("Starting graceful shutdown...");
    shutdown.cancel();
}
