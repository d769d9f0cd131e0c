use std::future::Future;
use std::sync::Arc;

use stowage_api::{ApiDependencies, ApiServer};
use stowage_config::AppConfig;
use stowage_fsops::PathSandbox;
use stowage_telemetry::{AppSpan, LoggingConfig, Metrics};
use stowage_torrent_core::{TorrentEngine, TorrentRegistry};
use stowage_torrent_mem::InMemoryEngine;
use tracing::{error, info};

use crate::error::{AppError, AppResult};

/// Build identifier baked in at compile time when the build provides one.
const BUILD_SHA: &str = match option_env!("STOWAGE_BUILD_SHA") {
    Some(sha) => sha,
    None => "dev",
};

/// Dependencies required to bootstrap the Stowage application.
pub(crate) struct BootstrapDependencies {
    config: AppConfig,
    telemetry: Metrics,
    engine: Arc<dyn TorrentEngine>,
}

impl BootstrapDependencies {
    /// Construct production dependencies from the environment for the binary entrypoint.
    pub(crate) fn from_env() -> AppResult<Self> {
        let config =
            AppConfig::from_env().map_err(|err| AppError::config("config.from_env", err))?;
        let telemetry =
            Metrics::new().map_err(|err| AppError::telemetry("telemetry.metrics", err))?;
        Ok(Self {
            config,
            telemetry,
            engine: Arc::new(InMemoryEngine::new()),
        })
    }
}

/// Entry point for the Stowage application boot sequence.
///
/// # Errors
///
/// Returns an error if configuration, logging, sandbox setup, or the API listener fails.
pub async fn run_app() -> AppResult<()> {
    let dependencies = BootstrapDependencies::from_env()?;
    run_app_with(dependencies, shutdown_signal()).await
}

/// Boot sequence that relies entirely on injected dependencies to simplify testing.
pub(crate) async fn run_app_with<F>(
    dependencies: BootstrapDependencies,
    shutdown: F,
) -> AppResult<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let BootstrapDependencies {
        config,
        telemetry,
        engine,
    } = dependencies;

    stowage_telemetry::init_logging(&LoggingConfig {
        level: &config.log_level,
        format: config.log_format,
        build_sha: BUILD_SHA,
    })
    .map_err(|err| AppError::telemetry("telemetry.init", err))?;
    let _span = AppSpan::enter("bootstrap");

    info!("Stowage application bootstrap starting");

    let api = build_api(&config, telemetry, engine)?;
    let addr = config.listen_addr();
    info!(addr = %addr, "Launching API listener");

    api.serve(addr, shutdown)
        .await
        .map_err(|err| AppError::api_server("api_server.serve", err))?;
    info!("API server shutdown complete");
    Ok(())
}

/// Prepare the download root and wire the registry, sandbox, and telemetry into the API.
pub(crate) fn build_api(
    config: &AppConfig,
    telemetry: Metrics,
    engine: Arc<dyn TorrentEngine>,
) -> AppResult<ApiServer> {
    config
        .ensure_download_root()
        .map_err(|err| AppError::config("config.ensure_download_root", err))?;
    let sandbox = Arc::new(
        PathSandbox::new(&config.download_root)
            .map_err(|err| AppError::fsops("sandbox.new", err))?,
    );
    info!(root = %sandbox.root().display(), "download sandbox ready");

    let registry = Arc::new(TorrentRegistry::new(engine, Arc::clone(&sandbox)));
    Ok(ApiServer::new(ApiDependencies::new(
        registry,
        sandbox,
        telemetry,
        config.archive.compression_level,
        config.max_metainfo_bytes,
    )))
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown signal received"),
        Err(err) => {
            error!(error = %err, "failed to install shutdown handler; serving until killed");
            std::future::pending::<()>().await;
        }
    }
}
