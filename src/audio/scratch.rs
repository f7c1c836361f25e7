//! Temporary files that delete themselves.

use std::io;
use std::path::{Path, PathBuf};
use tracing::warn;
use uuid::Uuid;

/// A uniquely named file in the scratch directory, removed when dropped.
///
/// The guard only owns the *name*; the file may or may not exist yet. Every
/// exit path of the pipeline (success, error, panic unwinding, cancelled
/// future) drops the guard, so uploads and converted audio never accumulate.
#[derive(Debug)]
pub struct ScratchFile {
    path: PathBuf,
}

impl ScratchFile {
    /// Reserve `<dir>/<uuid>.<extension>`.
    pub fn new_in(dir: &Path, extension: &str) -> Self {
        let name = format!("{}.{}", Uuid::new_v4(), extension.trim_start_matches('.'));
        Self { path: dir.join(name) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write `bytes` to the reserved path.
    pub async fn write(&self, bytes: &[u8]) -> io::Result<()> {
        tokio::fs::write(&self.path, bytes).await
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != io::ErrorKind::NotFound {
                warn!(path = %self.path.display(), error = %e, "Failed to remove scratch file");
            }
        }
    }
}

/// Create the scratch directory if it does not exist.
pub async fn ensure_dir(dir: &Path) -> io::Result<()> {
    tokio::fs::create_dir_all(dir).await
}
