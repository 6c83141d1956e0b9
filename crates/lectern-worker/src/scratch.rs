//! Scoped registration and best-effort release of transient artifacts.
//!
//! Every file a run creates is registered here the moment it exists, so the
//! cleanup pass can run unconditionally on the way out of any terminal
//! state. Deletion failures are logged and swallowed; cleanup must never
//! keep a run from reaching its terminal state.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

/// Registry of transient local files for one processing run.
#[derive(Debug, Default)]
pub struct ScratchSpace {
    files: Vec<PathBuf>,
}

impl ScratchSpace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a file for deletion at run end. Duplicate registrations
    /// are ignored.
    pub fn register(&mut self, path: impl AsRef<Path>) {
        let path = path.as_ref().to_path_buf();
        if !self.files.contains(&path) {
            self.files.push(path);
        }
    }

    /// Paths currently registered.
    pub fn registered(&self) -> &[PathBuf] {
        &self.files
    }

    /// Delete every registered file, best-effort.
    pub async fn cleanup(&mut self) {
        for path in self.files.drain(..) {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => debug!("Removed transient file {}", path.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!("Could not remove {}: {}", path.display(), e),
            }
        }
    }
}
