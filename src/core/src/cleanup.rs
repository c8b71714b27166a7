//! Guaranteed removal of transient archive files.
//!
//! Archives are hundreds of megabytes, so every exit path of a pipeline
//! (success, error, early return, panic unwind) must delete them. Holding an
//! [`ArchiveGuard`] ties the file's lifetime to a scope.

use std::path::{Path, PathBuf};

/// Best-effort delete. Logs instead of failing; a missing file is not an error.
///
/// Returns `true` if a file was removed.
pub fn ensure_removed(path: &Path) -> bool {
    match std::fs::remove_file(path) {
        Ok(()) => {
            tracing::debug!(path = %path.display(), "Removed archive");
            true
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Could not clean up file");
            eprintln!("Warning: Could not clean up {}: {e}", path.display());
            false
        }
    }
}

/// Owns an archive path and removes the file when dropped.
#[derive(Debug)]
pub struct ArchiveGuard {
    path: PathBuf,
    released: bool,
}

impl ArchiveGuard {
    /// Take ownership of `path`. The file need not exist yet.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            released: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the file now and report it to the user.
    pub fn cleanup(mut self) {
        self.remove_now();
    }

    fn remove_now(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        if ensure_removed(&self.path) {
            println!("🧹 Cleaned up {}", display_name(&self.path));
        }
    }
}

impl Drop for ArchiveGuard {
    fn drop(&mut self) {
        self.remove_now();
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}
