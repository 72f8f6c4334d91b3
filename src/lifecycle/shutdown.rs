//! Signal handling for graceful shutdown

use std::sync::Arc;

use tokio::sync::Notify;
use tracing::{debug, warn};

/// Why the daemon is shutting down
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// Ctrl-C / SIGINT
    Interrupt,
    /// SIGTERM
    Terminate,
    /// The exit key was pressed in mouse control mode
    ExitKey,
}

impl std::fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShutdownReason::Interrupt => write!(f, "interrupt"),
            ShutdownReason::Terminate => write!(f, "terminate"),
            ShutdownReason::ExitKey => write!(f, "exit key"),
        }
    }
}

/// Handles shutdown signals (SIGTERM, SIGINT) and the in-app exit request
pub struct ShutdownSignal {
    exit: Arc<Notify>,
}

impl ShutdownSignal {
    /// Create a new shutdown signal handler
    pub fn new() -> Self {
        Self {
            exit: Arc::new(Notify::new()),
        }
    }

    /// Handle the dispatcher uses to request shutdown without blocking
    pub fn exit_handle(&self) -> Arc<Notify> {
        Arc::clone(&self.exit)
    }

    /// Wait for a shutdown signal
    pub async fn wait(&self) -> ShutdownReason {
        tokio::select! {
            _ = interrupt() => {
                debug!("received SIGINT");
                ShutdownReason::Interrupt
            }
            _ = terminate() => {
                debug!("received SIGTERM");
                ShutdownReason::Terminate
            }
            _ = self.exit.notified() => {
                debug!("exit requested");
                ShutdownReason::ExitKey
            }
        }
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// A handler that cannot be registered never fires
async fn interrupt() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(?e, "failed to register Ctrl-C handler");
        std::future::pending::<()>().await;
    }
}

#[cfg(unix)]
async fn terminate() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            sigterm.recv().await;
        }
        Err(e) => {
            warn!(?e, "failed to register SIGTERM handler");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn terminate() {
    std::future::pending::<()>().await;
}
