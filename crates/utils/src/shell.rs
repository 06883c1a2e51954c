//! Helpers for locating external executables.

use std::path::{Path, PathBuf};

/// Resolve an executable name (or explicit path) to an absolute path.
///
/// Names containing a path separator are checked directly; bare names are
/// looked up on `PATH`.
pub fn resolve_executable_path_blocking(executable: &str) -> Option<PathBuf> {
    if executable.is_empty() {
        return None;
    }

    let candidate = Path::new(executable);
    if candidate.components().count() > 1 {
        return candidate.is_file().then(|| candidate.to_path_buf());
    }

    match which::which(executable) {
        Ok(path) => Some(path),
        Err(e) => {
            tracing::debug!(executable, error = %e, "executable not found on PATH");
            None
        }
    }
}
