//! Git backend implementation for VCS abstraction layer
//!
//! Git tracks the working tree itself, so there is nothing to reconcile and
//! paths reported by `git status` are already repository-relative. The
//! native diff covers modifications; additions are synthesized from the
//! working tree and deletions become `delete <path>` blocks, like every other
//! backend.

use crate::error::VcsError;
use crate::factory::{GitConfig, VcsBackendType};
use crate::paths::RepoPath;
use crate::process::{CommandRunner, Tool};
use crate::status::parse_porcelain_status;
use crate::traits::*;
use crate::types::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Object id of the empty tree, used as the diff base before the first commit
const EMPTY_TREE: &str = "4b825dc642cb6eb9a060e54bf8d69288fbee4904";

const STATUS_ARGS: [&str; 5] = [
    "status",
    "--porcelain=v1",
    "-z",
    "--untracked-files=all",
    "--no-renames",
];

/// Git implementation of VCS backend
pub struct GitRepository {
    path: PathBuf,
    git: Tool,
}

impl GitRepository {
    /// Open the repository containing `path`; the work dir becomes its top level
    pub fn open(
        path: &Path,
        config: &GitConfig,
        runner: Arc<dyn CommandRunner>,
    ) -> Result<Self, VcsError> {
        if !path.is_dir() {
            return Err(VcsError::repo_not_found(path));
        }

        let mut git = Tool::new(&config.executable, path, runner);
        let toplevel = git.run(["rev-parse", "--show-toplevel"])?;
        let toplevel = toplevel.trim();
        if toplevel.is_empty() {
            return Err(VcsError::unparseable(
                "git rev-parse --show-toplevel",
                "empty output",
            ));
        }

        let root = PathBuf::from(toplevel);
        git.set_cwd(&root);
        tracing::debug!(root = %root.display(), "opened git repository");

        Ok(Self { path: root, git })
    }

    /// HEAD commit, or `None` on an unborn branch
    fn head(&self) -> Result<Option<String>, VcsError> {
        let (command, output) = self.git.output(["rev-parse", "--verify", "-q", "HEAD"])?;
        if output.success {
            let sha = output.stdout.trim();
            if sha.is_empty() {
                return Err(VcsError::unparseable(command, "empty revision"));
            }
            return Ok(Some(sha.to_string()));
        }
        if output.code == Some(1) && output.stdout.trim().is_empty() {
            return Ok(None);
        }
        Err(VcsError::external_tool(command, output.stderr.trim()))
    }
}

// ============================================================================
// VcsRepository Implementation
// ============================================================================

impl VcsRepository for GitRepository {
    fn work_dir(&self) -> &Path {
        &self.path
    }

    fn current_revision(&self) -> Result<Option<String>, VcsError> {
        self.head()
    }
}

// ============================================================================
// VcsChanges Implementation
// ============================================================================

impl VcsChanges for GitRepository {
    fn reconcile(&mut self) -> Result<(), VcsError> {
        Ok(())
    }

    fn list_changes(&self) -> Result<Vec<ChangeRecord>, VcsError> {
        let output = self.git.run(STATUS_ARGS)?;
        parse_porcelain_status("git status", &output)
    }

    fn resolve_path(&self, depot_path: &str) -> Result<PathMapping, VcsError> {
        let relative = RepoPath::parse(depot_path)?;
        Ok(PathMapping {
            depot_path: depot_path.to_string(),
            local_path: relative.to_local(&self.path),
        })
    }

    fn normalize(&self, depot_path: &str) -> Result<RepoPath, VcsError> {
        RepoPath::parse(depot_path)
    }
}

// ============================================================================
// VcsDiff Implementation
// ============================================================================

impl VcsDiff for GitRepository {
    fn native_diff(&self) -> Result<String, VcsError> {
        let base = self.head()?.unwrap_or_else(|| EMPTY_TREE.to_string());

        self.git.run([
            "-c",
            "core.quotePath=false",
            "diff",
            "--no-color",
            "--no-ext-diff",
            "--no-renames",
            "--no-prefix",
            "--unified=0",
            "--diff-filter=ad",
            base.as_str(),
        ])
    }
}

// ============================================================================
// VcsBackend Implementation
// ============================================================================

impl VcsBackend for GitRepository {
    fn backend_type(&self) -> VcsBackendType {
        VcsBackendType::Git
    }
}
