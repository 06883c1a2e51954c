//! Path types for translating VCS-internal paths into repository-relative ones.
//!
//! A [`DepotPath`] is the backend's own name for a file (a Perforce depot path
//! such as `//depot/main/proj/pkg/foo.go`). A [`RepoPath`] is the same file
//! relative to the top of the versioned tree (`proj/pkg/foo.go`). The
//! [`PathNormalizer`] converts one into the other according to a configured
//! [`PathRoot`].

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::VcsError;

/// Wildcard token that separates a mapping root from its file-bearing suffix
pub const ROOT_MARKER: &str = "...";

/// A VCS-internal path as an ordered list of segments
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DepotPath {
    segments: Vec<String>,
}

impl DepotPath {
    /// Parse a depot path, dropping the leading `//` and anything from the
    /// first [`ROOT_MARKER`] onwards.
    pub fn parse(raw: &str) -> Result<Self, VcsError> {
        let trimmed = raw.trim();
        let before_marker = match trimmed.find(ROOT_MARKER) {
            Some(idx) => &trimmed[..idx],
            None => trimmed,
        };
        let body = before_marker
            .strip_prefix("//")
            .unwrap_or(before_marker)
            .trim_end_matches('/');

        if body.is_empty() {
            return Err(VcsError::path_normalization(raw, "path has no segments"));
        }

        let segments = split_segments(raw, body)?;
        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn starts_with(&self, root: &DepotPath) -> bool {
        self.segments.len() >= root.segments.len()
            && self.segments[..root.segments.len()] == root.segments[..]
    }

    /// Split into `(root, relative)` after `depth` leading segments.
    ///
    /// The relative part must keep at least one segment (the file name).
    pub fn split_root(&self, depth: usize) -> Result<(DepotPath, RepoPath), VcsError> {
        if self.segments.len() <= depth {
            return Err(VcsError::path_normalization(
                self.to_string(),
                format!(
                    "expected more than {depth} segments below the root, found {}",
                    self.segments.len()
                ),
            ));
        }

        let (root, rest) = self.segments.split_at(depth);
        Ok((
            DepotPath {
                segments: root.to_vec(),
            },
            RepoPath {
                segments: rest.to_vec(),
            },
        ))
    }

    /// Re-attach a repository-relative path below `root`.
    pub fn rebase(root: &DepotPath, relative: &RepoPath) -> DepotPath {
        let mut segments = root.segments.clone();
        segments.extend(relative.segments.iter().cloned());
        DepotPath { segments }
    }
}

impl fmt::Display for DepotPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "//{}", self.segments.join("/"))
    }
}

/// A path relative to the top of the versioned tree
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RepoPath {
    segments: Vec<String>,
}

impl RepoPath {
    /// Parse a `/`-separated relative path. Absolute paths and `.`/`..`
    /// segments are rejected.
    pub fn parse(raw: &str) -> Result<Self, VcsError> {
        let body = raw.strip_prefix("./").unwrap_or(raw);
        if body.is_empty() {
            return Err(VcsError::path_normalization(raw, "path is empty"));
        }
        if body.starts_with('/') {
            return Err(VcsError::path_normalization(raw, "path is absolute"));
        }

        let segments = split_segments(raw, body)?;
        Ok(Self { segments })
    }

    pub fn from_segments(segments: Vec<String>) -> Result<Self, VcsError> {
        let joined = segments.join("/");
        if segments.is_empty() {
            return Err(VcsError::path_normalization(joined, "path is empty"));
        }
        if segments
            .iter()
            .any(|s| s.is_empty() || s == "." || s == ".." || s.contains('/'))
        {
            return Err(VcsError::path_normalization(joined, "invalid path segment"));
        }
        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn file_name(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or_default()
    }

    /// Location of this path inside a checkout rooted at `root`
    pub fn to_local(&self, root: &Path) -> PathBuf {
        self.segments
            .iter()
            .fold(root.to_path_buf(), |acc, segment| acc.join(segment))
    }
}

impl fmt::Display for RepoPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("/"))
    }
}

fn split_segments(raw: &str, body: &str) -> Result<Vec<String>, VcsError> {
    let mut segments = Vec::new();
    for segment in body.split('/') {
        match segment {
            "" => return Err(VcsError::path_normalization(raw, "empty path segment")),
            "." | ".." => {
                return Err(VcsError::path_normalization(
                    raw,
                    "relative segments are not allowed",
                ))
            }
            s => segments.push(s.to_string()),
        }
    }
    Ok(segments)
}

/// Where the versioned tree starts inside a depot path
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathRoot {
    /// Drop this many leading segments (depot, branch, ...)
    Depth(usize),
    /// Strip this explicit depot prefix, e.g. `//depot/main`
    Prefix(String),
}

impl Default for PathRoot {
    fn default() -> Self {
        Self::Depth(2)
    }
}

/// Converts depot paths into repository-relative paths
#[derive(Debug, Clone, Default)]
pub struct PathNormalizer {
    root: PathRoot,
}

impl PathNormalizer {
    pub fn new(root: PathRoot) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &PathRoot {
        &self.root
    }

    pub fn normalize(&self, depot_path: &str) -> Result<RepoPath, VcsError> {
        let depot = DepotPath::parse(depot_path)?;
        let (_, relative) = self.split(&depot)?;
        Ok(relative)
    }

    /// Split a depot path into the configured root and the relative remainder
    pub fn split(&self, depot: &DepotPath) -> Result<(DepotPath, RepoPath), VcsError> {
        match &self.root {
            PathRoot::Depth(depth) => depot.split_root(*depth),
            PathRoot::Prefix(prefix) => {
                let root = DepotPath::parse(prefix)?;
                if !depot.starts_with(&root) {
                    return Err(VcsError::path_normalization(
                        depot.to_string(),
                        format!("not under root {root}"),
                    ));
                }
                depot.split_root(root.len())
            }
        }
    }
}
