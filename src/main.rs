//! keymouse: background daemon that drives the mouse from the keyboard
//!
//! This daemon runs in the user's desktop session and provides:
//! - A global low-level keyboard hook that intercepts bound keys
//! - A mode machine (Normal, MouseControl, RegionSelect)
//! - A fixed-tick worker for pointer motion and smooth scrolling
//! - Absolute pointer placement through an external grid-picker helper
//!
//! The tray icon, settings UI and autostart registration are separate
//! programs; this daemon only logs mode changes.

mod config;
mod dispatch;
mod events;
mod hook;
mod lifecycle;
mod logging;
mod motion;
mod platform;
mod region;
mod state;

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::{broadcast, mpsc};
use tracing::{error, info, warn};

use crate::config::Config;
use crate::dispatch::InputDispatcher;
use crate::events::ModeEvent;
use crate::hook::HookListener;
use crate::lifecycle::ShutdownSignal;
use crate::motion::MovementWorker;
use crate::region::RegionSelector;
use crate::state::SharedState;

#[tokio::main]
async fn main() -> Result<()> {
    let _log_guard = logging::init();

    info!(version = env!("CARGO_PKG_VERSION"), "keymouse starting");

    // Unbound keys have no safe default, so a bad config is fatal.
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            error!(%e, "failed to load configuration");
            return Err(e).context("failed to load configuration");
        }
    };
    info!(path = %config.path.display(), "configuration loaded");

    let shutdown = ShutdownSignal::new();

    // Mode machine -> observers (this daemon only logs them)
    let (event_tx, _event_rx) = broadcast::channel::<ModeEvent>(64);
    let state = Arc::new(SharedState::new(event_tx));
    let output = platform::system_output();

    let mut mode_rx = state.mode.subscribe();
    let observer = tokio::spawn(async move {
        loop {
            match mode_rx.recv().await {
                Ok(event) => info!(%event, "mode event"),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(skipped = n, "mode event receiver lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    // Region selector -> movement worker
    let (move_tx, move_rx) = std::sync::mpsc::channel();
    // Dispatcher -> region selector
    let (region_tx, region_rx) = mpsc::unbounded_channel();
    let (region_stop_tx, region_stop_rx) = broadcast::channel(1);

    let region = tokio::spawn(
        RegionSelector::new(Arc::clone(&state), config.region_select, move_tx)
            .run(region_rx, region_stop_rx),
    );

    let dispatcher = InputDispatcher::new(
        Arc::clone(&state),
        config.bindings,
        Arc::clone(&output),
        platform::system_modifiers(),
        region_tx,
        shutdown.exit_handle(),
    );

    let mut hook = match HookListener::start(Arc::new(dispatcher)) {
        Ok(hook) => hook,
        Err(e) => {
            error!(%e, "failed to install keyboard hook");
            return Err(e).context("failed to install keyboard hook");
        }
    };

    let worker = MovementWorker::new(
        Arc::clone(&state),
        Arc::clone(&output),
        config.movement,
        &config.scrolling,
        move_rx,
    )
    .spawn()
    .context("failed to start movement worker")?;

    info!("daemon initialized, waiting for input");

    let reason = shutdown.wait().await;
    info!(%reason, "shutting down...");

    // No key events after this point.
    hook.stop();

    let _ = region_stop_tx.send(());
    if let Err(e) = region.await {
        warn!(%e, "region selector task failed");
    }

    // The worker is stopped before releasing so it cannot re-press a sticky click.
    worker.stop();
    state.control.release_all(output.as_ref());

    observer.abort();

    info!("keymouse stopped");

    Ok(())
}
