// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::{process::ExitCode, sync::Arc, time::Duration};

use axum_server::{tls_rustls::RustlsConfig, Handle};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use launch_custody_server::{
    api::router,
    auth::SessionVerifier,
    blockchain::AvaxClient,
    config::{LogFormat, ServerConfig},
    launch::{LaunchDispatcher, LaunchEngine, LaunchSettings, LaunchSweeper, DEFAULT_QUEUE_CAPACITY},
    pool::RelayerPoolClient,
    rate_limit::FixedWindowLimiter,
    state::AppState,
    storage::Ledger,
    vault::SecretVault,
    wallet::WalletProvisioner,
};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Grace period for in-flight requests after a shutdown signal.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> ExitCode {
    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("configuration error: {e}");
            return ExitCode::FAILURE;
        }
    };

    init_tracing(config.log_format);

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Server failed");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug"));
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

async fn run(config: ServerConfig) -> Result<(), BoxError> {
    info!(?config, "Starting launch custody server");

    std::fs::create_dir_all(&config.data_dir)?;
    let ledger = Arc::new(Ledger::open(&config.ledger_path())?);
    let vault = SecretVault::new(config.vault_master_key.as_bytes())?;

    let chain = Arc::new(AvaxClient::new(config.network.clone(), &config.rpc_url)?);
    let pool = Arc::new(RelayerPoolClient::new(
        &config.pool_relayer_url,
        config.pool_timeout,
    )?);

    let engine = Arc::new(LaunchEngine::new(
        ledger.clone(),
        WalletProvisioner::new(ledger.clone(), vault),
        pool,
        chain,
        LaunchSettings {
            min_launch_amount: config.min_launch_amount_wei,
            max_attempts: config.max_launch_attempts,
        },
    ));

    let shutdown = CancellationToken::new();
    let (dispatcher, worker) = LaunchDispatcher::new(engine.clone(), DEFAULT_QUEUE_CAPACITY);
    let worker_task = tokio::spawn(worker.run(shutdown.clone()));

    let sweeper_task = match config.sweep_interval {
        Some(interval) => {
            let sweeper = LaunchSweeper::new(engine.clone(), dispatcher.clone(), interval);
            Some(tokio::spawn(sweeper.run(shutdown.clone())))
        }
        None => {
            warn!("Retry sweeper disabled; stalled launches need a manual retry");
            None
        }
    };

    let state = AppState {
        engine,
        dispatcher,
        ledger,
        sessions: Arc::new(SessionVerifier::new(config.session_jwt_secret.as_bytes())),
        rate_limiter: Arc::new(FixedWindowLimiter::per_minute(config.rate_limit_per_minute)),
        internal_job_secret: config.internal_job_secret.clone(),
    };
    let app = router(state);

    let handle = Handle::new();
    tokio::spawn(watch_signals(shutdown.clone(), handle.clone()));

    let addr = config.bind_addr;
    match &config.tls {
        Some(tls) => {
            rustls::crypto::ring::default_provider()
                .install_default()
                .map_err(|_| "failed to install rustls crypto provider")?;
            let tls_config = RustlsConfig::from_pem_file(&tls.cert_path, &tls.key_path).await?;

            info!(%addr, network = %config.network.name, "Listening on https (docs at /docs)");
            axum_server::bind_rustls(addr, tls_config)
                .handle(handle)
                .serve(app.into_make_service())
                .await?;
        }
        None => {
            info!(%addr, network = %config.network.name, "Listening on http (docs at /docs)");
            axum_server::bind(addr)
                .handle(handle)
                .serve(app.into_make_service())
                .await?;
        }
    }

    shutdown.cancel();
    if let Err(e) = worker_task.await {
        warn!(error = %e, "Launch worker task failed");
    }
    if let Some(task) = sweeper_task {
        if let Err(e) = task.await {
            warn!(error = %e, "Sweeper task failed");
        }
    }

    info!("Server stopped");
    Ok(())
}

/// Cancel background work and drain the server on Ctrl-C or SIGTERM.
async fn watch_signals(shutdown: CancellationToken, handle: Handle<std::net::SocketAddr>) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl-C");
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
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }

    info!("Shutdown signal received");
    shutdown.cancel();
    handle.graceful_shutdown(Some(SHUTDOWN_GRACE));
}
