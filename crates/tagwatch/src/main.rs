//! # tagwatch
//!
//! Watches for Apple FindMy accessories, AirTags in particular, that stay
//! near you.
//!
//! This binary provides:
//! - Continuous BLE scanning with a rest/scan duty cycle
//! - A terminal table of tracked devices, longest-tracked first
//! - An optional read-only HTTP status API
//!
//! ## Running
//!
//! ```bash
//! # Demo data, no Bluetooth hardware needed
//! cargo run --package tagwatch
//!
//! # Real scanning through BlueZ (Linux)
//! cargo run --package tagwatch --features bluetooth
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tagwatch::state::AppState;
use tagwatch::{api, display, logging};
use tagwatch_core::{CompanyDirectory, Config, Pipeline, TagwatchError, TrackerState};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Environment variable naming the configuration file.
const CONFIG_ENV_VAR: &str = "TAGWATCH_CONFIG";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init(logging::is_production())?;

    info!("Starting tagwatch v{}", env!("CARGO_PKG_VERSION"));

    let config_path = std::env::var_os(CONFIG_ENV_VAR).map(PathBuf::from);
    let config = Config::load(config_path.as_deref())
        .map_err(|e| startup_failure(e.into(), "Failed to load configuration"))?;
    let companies = CompanyDirectory::load(&config.companies_path)
        .map_err(|e| startup_failure(e.into(), "Failed to load company identifiers"))?;
    info!(companies = companies.len(), "Loaded company identifiers");

    // Bound before anything is spawned so a taken port aborts startup.
    let listener = if config.server.enabled {
        let addr = config
            .server
            .bind_addr()
            .map_err(|e| startup_failure(e.into(), "Invalid status API address"))?;
        Some(api::bind(addr).await?)
    } else {
        None
    };

    let cancel = CancellationToken::new();
    let radio = open_radio().await?;
    let (pipeline, snapshots) = Pipeline::start(radio, Arc::new(companies), &config, &cancel)
        .await
        .map_err(|e| startup_failure(e, "Failed to start tracking pipeline"))?;

    let state = AppState::new();
    let display_task = tokio::spawn(display::run(
        snapshots,
        state.clone(),
        config.display.clone(),
        cancel.clone(),
    ));
    let server_task = listener.map(|listener| tokio::spawn(api::serve(state, listener, cancel.clone())));

    let mut tracker_state = pipeline.state();
    tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for Ctrl-C")?;
            info!("Shutdown requested");
        }
        _ = tracker_state.wait_for(|state| *state == TrackerState::Stopped) => {
            warn!("Tracking pipeline stopped on its own, shutting down");
        }
    }
    cancel.cancel();

    let registry = pipeline.registry();
    let stats = pipeline.shutdown().await;
    if let Err(e) = display_task.await {
        warn!(error = %e, "Display task failed");
    }
    if let Some(server_task) = server_task {
        match server_task.await {
            Ok(Err(e)) => warn!(error = %e, "Status API failed"),
            Err(e) => warn!(error = %e, "Status API task failed"),
            Ok(Ok(())) => {}
        }
    }

    info!(
        devices = registry.len(),
        advertisements = stats.advertisements_received,
        discarded = stats.advertisements_discarded,
        devices_added = stats.devices_added,
        devices_evicted = stats.devices_evicted,
        snapshots = stats.snapshots_published,
        "tagwatch stopped"
    );
    Ok(())
}

/// Log a startup failure with its code and operator hint.
fn startup_failure(err: TagwatchError, context: &'static str) -> anyhow::Error {
    error!(code = err.error_code(), recoverable = err.is_recoverable(), "{context}: {err}");
    if let Some(hint) = err.hint() {
        info!("Hint: {hint}");
    }
    anyhow::Error::new(err).context(context)
}

#[cfg(feature = "bluetooth")]
async fn open_radio() -> anyhow::Result<tagwatch_core::BluerRadio> {
    tagwatch_core::BluerRadio::new()
        .await
        .map_err(|e| startup_failure(e.into(), "Failed to open Bluetooth adapter"))
}

#[cfg(not(feature = "bluetooth"))]
#[allow(clippy::unused_async)]
async fn open_radio() -> anyhow::Result<tagwatch_core::MockRadio> {
    warn!("Built without the `bluetooth` feature; replaying demo advertisements");
    Ok(tagwatch_core::MockRadio::demo())
}
