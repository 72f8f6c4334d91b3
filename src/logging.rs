//! Tracing subscriber setup for stderr and the log file

use std::fs::File;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// Log file written next to the executable, truncated on every start
const LOG_FILE: &str = "main.log";

/// Initialise logging to stderr and to `main.log` beside the executable.
///
/// The level defaults to `info` and can be overridden via `RUST_LOG`. The
/// returned guard flushes the file writer when dropped, so keep it alive for
/// the lifetime of the process.
pub fn init() -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let (file_layer, guard) = match open_log_file() {
        Some(file) => {
            let (writer, guard) = tracing_appender::non_blocking(file);
            let layer = fmt::layer().with_ansi(false).with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .try_init();

    guard
}

/// The daemon usually runs without a console, so the file is best-effort
fn open_log_file() -> Option<File> {
    let exe = std::env::current_exe().ok()?;
    File::create(exe.parent()?.join(LOG_FILE)).ok()
}
