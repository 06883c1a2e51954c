//! Perforce backend implementation for VCS abstraction layer
//!
//! Perforce only knows about edits that have been opened on the server, so
//! every extraction starts with `p4 reconcile -e`. Status comes from tagged
//! (`-ztag`) output, depot paths are translated through `p4 where`, and the
//! configured [`PathRoot`](crate::paths::PathRoot) decides where the
//! versioned tree begins.

use crate::error::VcsError;
use crate::factory::{PerforceConfig, VcsBackendType};
use crate::paths::{PathNormalizer, RepoPath};
use crate::process::{command_line, CommandRunner, Tool};
use crate::status::{parse_ztag_change, parse_ztag_status, parse_ztag_where};
use crate::traits::*;
use crate::types::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Informational p4 messages that mean "nothing to report"
const NOTHING_TO_REPORT: &[&str] = &[
    "file(s) not opened on this client",
    "no file(s) to reconcile",
    "file(s) not on client",
    "file(s) up-to-date",
];

/// Perforce implementation of VCS backend
pub struct PerforceRepository {
    path: PathBuf,
    p4: Tool,
    normalizer: PathNormalizer,
}

impl PerforceRepository {
    /// Open the client workspace rooted at (or containing) `path`.
    ///
    /// Nothing is run against the server until the first operation.
    pub fn open(
        path: &Path,
        config: &PerforceConfig,
        runner: Arc<dyn CommandRunner>,
    ) -> Result<Self, VcsError> {
        if !path.is_dir() {
            return Err(VcsError::repo_not_found(path));
        }

        let p4 = Tool::new(&config.executable, path, runner).with_global_args(config.global_args());
        tracing::debug!(
            path = %path.display(),
            root = ?config.root,
            client = ?config.client,
            "opened perforce workspace"
        );

        Ok(Self {
            path: path.to_path_buf(),
            p4,
            normalizer: PathNormalizer::new(config.root.clone()),
        })
    }

    fn command(&self, args: &[&str]) -> String {
        let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
        command_line(self.p4.program(), &args)
    }
}

/// Undo Perforce's escaping of reserved characters in depot paths
fn unescape_segment(segment: &str) -> String {
    segment
        .replace("%40", "@")
        .replace("%23", "#")
        .replace("%2A", "*")
        .replace("%2a", "*")
        .replace("%25", "%")
}

// ============================================================================
// VcsRepository Implementation
// ============================================================================

impl VcsRepository for PerforceRepository {
    fn work_dir(&self) -> &Path {
        &self.path
    }

    fn current_revision(&self) -> Result<Option<String>, VcsError> {
        let output = self
            .p4
            .run_allowing(["-ztag", "changes", "-m1", "...#have"], NOTHING_TO_REPORT)?;
        Ok(parse_ztag_change(&output))
    }
}

// ============================================================================
// VcsChanges Implementation
// ============================================================================

impl VcsChanges for PerforceRepository {
    fn reconcile(&mut self) -> Result<(), VcsError> {
        let output = self
            .p4
            .run_allowing(["reconcile", "-e"], NOTHING_TO_REPORT)?;
        tracing::debug!(
            opened = output.lines().filter(|l| !l.trim().is_empty()).count(),
            "reconciled local edits"
        );
        Ok(())
    }

    fn list_changes(&self) -> Result<Vec<ChangeRecord>, VcsError> {
        let args = ["-ztag", "status"];
        let output = self.p4.run_allowing(args, NOTHING_TO_REPORT)?;
        parse_ztag_status(&self.command(&args), &output)
    }

    fn resolve_path(&self, depot_path: &str) -> Result<PathMapping, VcsError> {
        let args = ["-ztag", "where", depot_path];
        let output = self.p4.run(args)?;
        parse_ztag_where(&self.command(&args), &output)
    }

    fn normalize(&self, depot_path: &str) -> Result<RepoPath, VcsError> {
        let relative = self.normalizer.normalize(depot_path)?;
        RepoPath::from_segments(
            relative
                .segments()
                .iter()
                .map(|s| unescape_segment(s))
                .collect(),
        )
    }
}

// ============================================================================
// VcsDiff Implementation
// ============================================================================

impl VcsDiff for PerforceRepository {
    fn native_diff(&self) -> Result<String, VcsError> {
        let output = self.p4.run_allowing(["diff", "-du0"], NOTHING_TO_REPORT)?;

        let has_files = output
            .lines()
            .any(|line| line.starts_with("--- ") || line.starts_with("==== "));
        if !has_files {
            return Ok(String::new());
        }
        Ok(output)
    }
}

// ============================================================================
// VcsBackend Implementation
// ============================================================================

impl VcsBackend for PerforceRepository {
    fn backend_type(&self) -> VcsBackendType {
        VcsBackendType::Perforce
    }
}
