//! Patch aggregation.
//!
//! [`collect_patches`] drives a backend through one extraction:
//!
//! 1. reconcile the working copy
//! 2. fetch the native diff of tracked modifications
//! 3. list changes and resolve/normalize every path
//! 4. rewrite native diff headers to repository-relative paths
//! 5. emit `delete <path>` blocks for deletions
//! 6. synthesize diffs for additions
//!
//! The first error aborts the whole call; no partial patch set is returned.

use std::collections::HashMap;
use std::path::Path;

use tracing::debug;

use crate::error::VcsError;
use crate::factory::VcsBackendType;
use crate::paths::RepoPath;
use crate::synth::{synthesize_added_file, DEV_NULL};
use crate::traits::VcsBackend;
use crate::types::{
    ChangeAction, ChangeRecord, ChangeSet, DiffBlock, PatchSet, PathMapping, ResolvedChange,
};

/// Run a full extraction against `backend`
pub fn collect_patches<B: VcsBackend + ?Sized>(backend: &mut B) -> Result<PatchSet, VcsError> {
    backend.reconcile()?;

    let native = backend.native_diff()?;
    let changes = ChangeSet::from_records(backend.list_changes()?);
    let (modified, deleted, added) = changes.into_parts();
    debug!(
        backend = ?backend.backend_type(),
        native_diff_len = native.len(),
        modified = modified.len(),
        deleted = deleted.len(),
        added = added.len(),
        "collected working copy status"
    );

    let modified = resolve_all(&*backend, modified)?;
    let deleted = resolve_all(&*backend, deleted)?;
    let added = resolve_all(&*backend, added)?;

    let mut patches = PatchSet::new();

    if !native.trim().is_empty() {
        let mut rewriter = HeaderRewriter::default();
        for change in &modified {
            rewriter.map(&change.depot_path, &change.repo_path);
            if let Some(local) = &change.local_path {
                rewriter.map(local.display().to_string(), &change.repo_path);
            }
        }
        let rewritten = rewriter.rewrite(&native)?;
        if !rewritten.trim().is_empty() {
            patches.push(DiffBlock::Diff(rewritten));
        }
    }

    for change in deleted {
        patches.push(DiffBlock::Deletion(change.repo_path));
    }

    for change in &added {
        let local = change
            .local_path
            .as_deref()
            .ok_or_else(|| VcsError::MissingFile(change.depot_path.clone()))?;
        patches.push(synthesize_added_file(local, &change.repo_path)?);
    }

    debug!(blocks = patches.len(), "assembled patch set");
    Ok(patches)
}

fn resolve_all<B: VcsBackend + ?Sized>(
    backend: &B,
    records: Vec<ChangeRecord>,
) -> Result<Vec<ResolvedChange>, VcsError> {
    records
        .into_iter()
        .map(|record| resolve(backend, record))
        .collect()
}

/// Attach the local path (except for deletions) and the repository path
fn resolve<B: VcsBackend + ?Sized>(
    backend: &B,
    record: ChangeRecord,
) -> Result<ResolvedChange, VcsError> {
    let local_path = match (record.action, record.local_path) {
        (ChangeAction::Delete, _) => None,
        (_, Some(local)) => Some(local),
        (_, None) => {
            let PathMapping { local_path, .. } = backend.resolve_path(&record.depot_path)?;
            Some(local_path)
        }
    };

    Ok(ResolvedChange {
        action: record.action,
        repo_path: backend.normalize(&record.depot_path)?,
        depot_path: record.depot_path,
        local_path,
    })
}

/// Rewrites `---`/`+++` header paths in unified-diff text.
///
/// Lines inside hunks are never touched, even when their content happens to
/// start with `---` or `+++`. Perforce `==== … ====` banners are dropped.
#[derive(Debug, Default)]
pub struct HeaderRewriter {
    mappings: HashMap<String, RepoPath>,
}

impl HeaderRewriter {
    pub fn map(&mut self, vcs_path: impl Into<String>, repo_path: &RepoPath) {
        self.mappings.insert(vcs_path.into(), repo_path.clone());
    }

    /// Rewrite every header path.
    ///
    /// A header that still names an absolute or depot (`//`) path after
    /// rewriting is an error: it would leak a backend-internal path.
    pub fn rewrite(&self, diff: &str) -> Result<String, VcsError> {
        let mut out = String::with_capacity(diff.len());
        let mut hunk = HunkCursor::default();

        for line in diff.split_inclusive('\n') {
            let content = line.trim_end_matches(['\n', '\r']);

            if hunk.consume(content) {
                out.push_str(line);
                continue;
            }

            if content.starts_with("@@ ") {
                hunk = HunkCursor::parse(content)?;
                out.push_str(line);
                continue;
            }

            if is_banner(content) {
                continue;
            }

            match content
                .strip_prefix("--- ")
                .map(|rest| ("--- ", rest))
                .or_else(|| content.strip_prefix("+++ ").map(|rest| ("+++ ", rest)))
            {
                Some((marker, rest)) => {
                    out.push_str(marker);
                    out.push_str(&self.rewrite_header_path(rest)?);
                    out.push('\n');
                }
                None => out.push_str(line),
            }
        }

        Ok(out)
    }

    fn rewrite_header_path(&self, field: &str) -> Result<String, VcsError> {
        let path = field.split('\t').next().unwrap_or(field).trim_end();
        let lookup = strip_revision(path);

        if let Some(repo_path) = self.mappings.get(lookup) {
            return Ok(repo_path.to_string());
        }
        if lookup == DEV_NULL {
            return Ok(DEV_NULL.to_string());
        }
        if lookup.starts_with("//") || Path::new(lookup).is_absolute() {
            return Err(VcsError::path_normalization(
                lookup,
                "native diff names a file that status did not report",
            ));
        }
        Ok(field.to_string())
    }
}

/// `==== //depot/a.c#3 - /ws/a.c ====` style banners
fn is_banner(line: &str) -> bool {
    line.len() > 10 && line.starts_with("==== ") && line.ends_with(" ====")
}

/// Drop a trailing `#<rev>` (or `#none`/`#have`) from a depot path
fn strip_revision(path: &str) -> &str {
    match path.rfind('#') {
        Some(idx) if path.starts_with("//") => &path[..idx],
        _ => path,
    }
}

/// Tracks how many body lines of the current hunk are still expected
#[derive(Debug, Default, Clone, Copy)]
struct HunkCursor {
    old_remaining: usize,
    new_remaining: usize,
}

impl HunkCursor {
    /// Parse `@@ -l[,s] +l[,s] @@ ...`
    fn parse(header: &str) -> Result<Self, VcsError> {
        let mut parts = header.split_whitespace().skip(1);
        let old = parts.next().and_then(|p| p.strip_prefix('-'));
        let new = parts.next().and_then(|p| p.strip_prefix('+'));

        match (old.and_then(range_len), new.and_then(range_len)) {
            (Some(old_remaining), Some(new_remaining)) => Ok(Self {
                old_remaining,
                new_remaining,
            }),
            _ => Err(VcsError::unparseable(
                "native diff",
                format!("bad hunk header {header:?}"),
            )),
        }
    }

    /// Returns true if `line` belongs to the current hunk body
    fn consume(&mut self, line: &str) -> bool {
        if self.old_remaining == 0 && self.new_remaining == 0 {
            return false;
        }
        match line.chars().next() {
            Some(' ') => {
                self.old_remaining = self.old_remaining.saturating_sub(1);
                self.new_remaining = self.new_remaining.saturating_sub(1);
            }
            Some('-') if self.old_remaining > 0 => self.old_remaining -= 1,
            Some('+') if self.new_remaining > 0 => self.new_remaining -= 1,
            Some('\\') => {}
            _ => {
                *self = Self::default();
                return false;
            }
        }
        true
    }
}

fn range_len(range: &str) -> Option<usize> {
    match range.split_once(',') {
        Some((start, len)) => {
            start.parse::<usize>().ok()?;
            len.parse().ok()
        }
        None => range.parse::<usize>().ok().map(|_| 1),
    }
}

/// What a review request needs from the working copy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkingCopySnapshot {
    pub backend: VcsBackendType,
    pub revision: Option<String>,
    pub patches: PatchSet,
}

/// Capture the base revision and the pending patch set in one go
pub fn snapshot(backend: &mut dyn VcsBackend) -> Result<WorkingCopySnapshot, VcsError> {
    let revision = backend.current_revision()?;
    let patches = backend.patches()?;
    Ok(WorkingCopySnapshot {
        backend: backend.backend_type(),
        revision,
        patches,
    })
}
