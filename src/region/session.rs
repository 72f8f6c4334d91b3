//! Region selector session manager
//!
//! Owns at most one helper process at a time. The dispatcher has already
//! paused the hook and entered RegionSelect when a request arrives; the
//! session's watcher undoes both once the helper exits, whatever the outcome.
//! A newer request supersedes a running session: the old helper is killed
//! and its watcher only removes its own files.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;

use thiserror::Error;
use tokio::process::{Child, Command};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::protocol::{read_coords, write_layout, HandshakeFiles};
use crate::config::RegionSelectConfig;
use crate::motion::PointerCommand;
use crate::state::SharedState;

/// Ask the manager to start a new selection session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionRequest;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to write layout file {path}: {source}")]
    Layout {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to launch region selector {helper}: {source}")]
    Spawn {
        helper: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

struct ActiveSession {
    generation: u64,
    kill: oneshot::Sender<()>,
    watcher: JoinHandle<()>,
}

pub struct RegionSelector {
    state: Arc<SharedState>,
    config: RegionSelectConfig,
    commands: Sender<PointerCommand>,
    temp_dir: PathBuf,
    /// Generation of the newest session; watchers compare against it
    current: Arc<AtomicU64>,
    active: Option<ActiveSession>,
}

impl RegionSelector {
    pub fn new(
        state: Arc<SharedState>,
        config: RegionSelectConfig,
        commands: Sender<PointerCommand>,
    ) -> Self {
        Self {
            state,
            config,
            commands,
            temp_dir: std::env::temp_dir(),
            current: Arc::new(AtomicU64::new(0)),
            active: None,
        }
    }

    /// Place handshake files in `dir` instead of the OS temp directory
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = dir.into();
        self
    }

    /// Serve requests until the channel closes or shutdown is signalled
    pub async fn run(
        mut self,
        mut requests: mpsc::UnboundedReceiver<RegionRequest>,
        mut shutdown: broadcast::Receiver<()>,
    ) {
        info!(helper = %self.config.helper.display(), "region selector ready");

        loop {
            tokio::select! {
                request = requests.recv() => match request {
                    Some(RegionRequest) => self.start_session().await,
                    None => break,
                },
                _ = shutdown.recv() => {
                    debug!("region selector shutting down");
                    break;
                }
            }
        }

        self.stop_active().await;
    }

    async fn start_session(&mut self) {
        let generation = self.current.fetch_add(1, Ordering::AcqRel) + 1;
        self.stop_active().await;

        let files = HandshakeFiles::for_session(&self.temp_dir, generation);
        let child = match self.launch(&files).await {
            Ok(child) => {
                info!(generation, pid = child.id(), "region selector launched");
                Some(child)
            }
            Err(e) => {
                warn!(generation, %e, "region selection failed");
                None
            }
        };

        let (kill, kill_rx) = oneshot::channel();
        let watcher = Watcher {
            generation,
            files,
            state: Arc::clone(&self.state),
            commands: self.commands.clone(),
            current: Arc::clone(&self.current),
        };
        self.active = Some(ActiveSession {
            generation,
            kill,
            watcher: tokio::spawn(watcher.run(child, kill_rx)),
        });
    }

    async fn launch(&self, files: &HandshakeFiles) -> Result<Child, SessionError> {
        write_layout(&files.layout, &self.config.layout)
            .await
            .map_err(|source| SessionError::Layout {
                path: files.layout.clone(),
                source,
            })?;

        Command::new(&self.config.helper)
            .args(&self.config.helper_args)
            .arg(&files.layout)
            .arg(&files.coords)
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| SessionError::Spawn {
                helper: self.config.helper.clone(),
                source,
            })
    }

    /// Terminate the running helper, if any, and wait for its cleanup
    async fn stop_active(&mut self) {
        let Some(session) = self.active.take() else {
            return;
        };
        if session.kill.send(()).is_ok() {
            debug!(generation = session.generation, "terminating region selector");
        }
        if let Err(e) = session.watcher.await {
            warn!(generation = session.generation, %e, "region selector watcher failed");
        }
    }
}

/// Waits for one helper to exit and runs the session's cleanup
struct Watcher {
    generation: u64,
    files: HandshakeFiles,
    state: Arc<SharedState>,
    commands: Sender<PointerCommand>,
    current: Arc<AtomicU64>,
}

impl Watcher {
    async fn run(self, child: Option<Child>, kill: oneshot::Receiver<()>) {
        if let Some(mut child) = child {
            tokio::select! {
                status = child.wait() => match status {
                    Ok(status) => debug!(generation = self.generation, %status, "region selector exited"),
                    Err(e) => warn!(generation = self.generation, %e, "failed to wait for region selector"),
                },
                _ = kill => {
                    if let Err(e) = child.kill().await {
                        warn!(generation = self.generation, %e, "failed to kill region selector");
                    }
                }
            }
        }

        match read_coords(&self.files.coords).await {
            Ok(Some((x, y))) => {
                if self.commands.send(PointerCommand::MoveTo { x, y }).is_err() {
                    warn!("movement worker is gone; dropping selected position");
                }
            }
            Ok(None) => info!(generation = self.generation, "region selection cancelled"),
            Err(e) => warn!(generation = self.generation, %e, "discarding region selector output"),
        }

        self.files.remove().await;

        if self.current.load(Ordering::Acquire) == self.generation {
            self.state.mode.return_from_region_select();
            self.state.mode.resume_hook();
        } else {
            debug!(generation = self.generation, "superseded session cleaned up");
        }
    }
}
