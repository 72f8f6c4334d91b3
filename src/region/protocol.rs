//! Two-file handshake with the region selector helper
//!
//! The helper is started as `helper [args..] <layout-file> <coords-file>`.
//!
//! - layout file: JSON array of rows, each row an array of one-character
//!   strings, e.g. `[["1","2"],["q","w"]]`
//! - coords file: a single `x,y` line in screen pixels, written by the helper
//!   on success; absent or empty when the user cancelled

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::warn;

/// Problems with the coordinates the helper wrote back
#[derive(Debug, Error)]
pub enum CoordsError {
    #[error("I/O error reading coordinates at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("expected \"x,y\", got {0:?}")]
    Malformed(String),

    #[error("coordinate {0:?} is not a finite number")]
    NotANumber(String),
}

/// Paths of one session's handshake files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeFiles {
    pub layout: PathBuf,
    pub coords: PathBuf,
}

impl HandshakeFiles {
    /// Per-process, per-session file names inside `dir`
    pub fn for_session(dir: &Path, generation: u64) -> Self {
        let pid = std::process::id();
        Self {
            layout: dir.join(format!("keymouse_layout_{pid}_{generation}.tmp")),
            coords: dir.join(format!("keymouse_coords_{pid}_{generation}.tmp")),
        }
    }

    /// Delete both files; a file that was never created is not an error
    pub async fn remove(&self) {
        for path in [&self.layout, &self.coords] {
            match tokio::fs::remove_file(path).await {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => warn!(path = %path.display(), %e, "failed to remove handshake file"),
            }
        }
    }
}

/// Serialize the grid layout in the shape the helper reads
pub fn encode_layout(layout: &[Vec<char>]) -> serde_json::Result<String> {
    serde_json::to_string(layout)
}

pub async fn write_layout(path: &Path, layout: &[Vec<char>]) -> io::Result<()> {
    let json = encode_layout(layout)?;
    tokio::fs::write(path, json).await
}

/// Parse the helper's answer; `Ok(None)` means the user cancelled
pub fn parse_coords(text: &str) -> Result<Option<(f64, f64)>, CoordsError> {
    let line = text.lines().next().unwrap_or("").trim();
    if line.is_empty() {
        return Ok(None);
    }

    let (x, y) = line
        .split_once(',')
        .ok_or_else(|| CoordsError::Malformed(line.to_string()))?;

    Ok(Some((parse_axis(x)?, parse_axis(y)?)))
}

fn parse_axis(raw: &str) -> Result<f64, CoordsError> {
    let raw = raw.trim();
    raw.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| CoordsError::NotANumber(raw.to_string()))
}

/// Read and parse the coords file; a missing file means the user cancelled
pub async fn read_coords(path: &Path) -> Result<Option<(f64, f64)>, CoordsError> {
    match tokio::fs::read_to_string(path).await {
        Ok(text) => parse_coords(&text),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(CoordsError::Io {
            path: path.to_owned(),
            source,
        }),
    }
}
