//! Unified diffs for files the VCS cannot diff itself.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use similar::TextDiff;

use crate::error::VcsError;
use crate::paths::RepoPath;
use crate::types::DiffBlock;

/// "Before" side of a newly created file
pub const DEV_NULL: &str = "/dev/null";

/// Render `content` as a pure insertion against an empty file, with zero
/// lines of context.
pub fn added_file_diff(content: &str, new_name: &str) -> String {
    TextDiff::from_lines("", content)
        .unified_diff()
        .context_radius(0)
        .header(DEV_NULL, new_name)
        .to_string()
}

/// Build the diff block for a file that exists only in the working copy.
///
/// The status listing said this file was added, so a missing or blank file
/// means the VCS and the filesystem disagree; that is reported as
/// [`VcsError::MissingFile`] rather than skipped.
pub fn synthesize_added_file(local_path: &Path, repo_path: &RepoPath) -> Result<DiffBlock, VcsError> {
    let display = local_path.display().to_string();

    let bytes = match fs::read(local_path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Err(VcsError::MissingFile(display)),
        Err(e) => return Err(e.into()),
    };

    let content = String::from_utf8(bytes).map_err(|_| VcsError::BinaryFile(display.clone()))?;
    if content.contains('\0') {
        return Err(VcsError::BinaryFile(display));
    }
    if content.trim().is_empty() {
        return Err(VcsError::MissingFile(display));
    }

    tracing::trace!(path = %repo_path, bytes = content.len(), "synthesized added-file diff");
    Ok(DiffBlock::Diff(added_file_diff(&content, &repo_path.to_string())))
}
