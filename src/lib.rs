pub mod analytics;
pub mod db;
pub mod error;
pub mod server;
pub mod settings;
pub mod tracking;
mod utils;

use anyhow::Context;
use db::Database;
use server::AppState;
use settings::Settings;
use tokio_util::sync::CancellationToken;

pub use error::{CoreError, CoreResult};

/// Process entry point: logging, settings, store, then serve until Ctrl-C.
///
/// The store is opened and migrated before the listener binds; if it cannot
/// be opened the process exits with an error instead of serving.
pub fn run() -> anyhow::Result<()> {
    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    log::info!("Focus Guardian starting up...");

    let settings = Settings::load().context("failed to load settings")?;
    let database = Database::new(settings.db_path.clone())?;
    log::info!(
        "Telemetry interval {}s, database {}",
        settings.telemetry_interval_secs,
        database.path().display()
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?;

    runtime.block_on(async move {
        let state = AppState::new(settings, database);
        let shutdown = CancellationToken::new();

        let signal_token = shutdown.clone();
        tokio::spawn(async move {
            if let Err(err) = tokio::signal::ctrl_c().await {
                log::error!("Failed to listen for Ctrl-C: {err}");
                return;
            }
            log::info!("Shutdown requested");
            signal_token.cancel();
        });

        server::serve(state, shutdown).await
    })
}
