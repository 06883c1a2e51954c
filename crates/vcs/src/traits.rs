use crate::error::VcsError;
use crate::paths::RepoPath;
use crate::types::*;
use std::path::Path;

/// Core repository operations
///
/// Note: We don't require Sync. A single backend runs one extraction at a
/// time; `patches` takes `&mut self` to make that explicit.
pub trait VcsRepository: Send {
    /// Get the working directory path (top of the versioned tree)
    fn work_dir(&self) -> &Path;

    /// Revision the working copy is based on: a commit SHA for git, the
    /// highest synced changelist for Perforce. `None` if there is none yet.
    fn current_revision(&self) -> Result<Option<String>, VcsError>;
}

/// Status and path operations
pub trait VcsChanges: VcsRepository {
    /// Refresh the backend's view of local edits.
    ///
    /// For Perforce this opens out-of-band edits on the server and so
    /// changes server-side state. It is a no-op where the working tree is
    /// authoritative (git).
    fn reconcile(&mut self) -> Result<(), VcsError>;

    /// List pending changes (action + backend path, not yet normalized)
    fn list_changes(&self) -> Result<Vec<ChangeRecord>, VcsError>;

    /// Find where a backend path lives on disk
    fn resolve_path(&self, depot_path: &str) -> Result<PathMapping, VcsError>;

    /// Convert a backend path into a repository-relative path
    fn normalize(&self, depot_path: &str) -> Result<RepoPath, VcsError>;
}

/// Native diff operations
pub trait VcsDiff: VcsRepository {
    /// Zero-context unified diff of tracked modifications.
    ///
    /// Headers may still carry backend-internal paths; an empty string means
    /// nothing is modified.
    fn native_diff(&self) -> Result<String, VcsError>;
}

/// Combined trait representing a full VCS backend
///
/// This is the main trait that users will interact with.
pub trait VcsBackend: VcsRepository + VcsChanges + VcsDiff {
    /// Get backend type
    fn backend_type(&self) -> crate::factory::VcsBackendType;

    /// Get a human-readable description of this backend
    fn description(&self) -> String {
        format!("{:?} backend at {}", self.backend_type(), self.work_dir().display())
    }

    /// Collect every pending change as an ordered patch set
    fn patches(&mut self) -> Result<PatchSet, VcsError> {
        crate::patch::collect_patches(self)
    }
}
