use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::PathBuf;

use crate::paths::RepoPath;

/// What happened to a file in the working copy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ChangeAction {
    Modify,
    Add,
    Delete,
}

impl ChangeAction {
    /// Precedence when one path shows up under several actions; higher wins.
    fn precedence(self) -> u8 {
        match self {
            Self::Modify => 0,
            Self::Add => 1,
            Self::Delete => 2,
        }
    }
}

impl fmt::Display for ChangeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Modify => "modify",
            Self::Add => "add",
            Self::Delete => "delete",
        };
        f.write_str(s)
    }
}

/// A single pending change reported by a backend's status listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeRecord {
    pub action: ChangeAction,
    /// Backend-internal path (depot path, or repo-relative path for git)
    pub depot_path: String,
    /// Local filesystem location, when the status output carries it
    pub local_path: Option<PathBuf>,
}

impl ChangeRecord {
    pub fn new(action: ChangeAction, depot_path: impl Into<String>) -> Self {
        Self {
            action,
            depot_path: depot_path.into(),
            local_path: None,
        }
    }

    pub fn with_local_path(mut self, local_path: impl Into<PathBuf>) -> Self {
        self.local_path = Some(local_path.into());
        self
    }
}

/// A change whose paths have been resolved and normalized
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedChange {
    pub action: ChangeAction,
    pub depot_path: String,
    /// `None` for deletions, which have nothing on disk
    pub local_path: Option<PathBuf>,
    pub repo_path: RepoPath,
}

/// Resolved correspondence between a depot path and its file on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathMapping {
    pub depot_path: String,
    pub local_path: PathBuf,
}

/// Status records grouped by action
#[derive(Debug, Clone, Default)]
pub struct ChangeSet {
    modified: Vec<ChangeRecord>,
    added: Vec<ChangeRecord>,
    deleted: Vec<ChangeRecord>,
}

impl ChangeSet {
    /// Group records by action, keeping discovery order within each group.
    ///
    /// A path listed as both deleted and added is a replacement and keeps
    /// both records, so it yields a `delete` block followed by the new
    /// content. Any other repeat keeps only the highest-precedence action
    /// (delete, then add, then modify).
    pub fn from_records(records: Vec<ChangeRecord>) -> Self {
        // first index seen per path, one slot per action
        let mut seen: BTreeMap<&str, [Option<usize>; 3]> = BTreeMap::new();
        for (idx, record) in records.iter().enumerate() {
            let slots = seen.entry(record.depot_path.as_str()).or_default();
            let slot = &mut slots[record.action.precedence() as usize];
            if slot.is_none() {
                *slot = Some(idx);
            }
        }

        let mut kept = HashSet::new();
        for (path, slots) in &seen {
            let [modify, add, delete] = *slots;
            match (delete, add) {
                (Some(delete), Some(add)) => {
                    tracing::debug!(%path, "path deleted and re-added, treating as replacement");
                    kept.insert(delete);
                    kept.insert(add);
                }
                _ => {
                    if let Some(winner) = delete.or(add).or(modify) {
                        kept.insert(winner);
                    }
                }
            }
        }

        let mut set = Self::default();
        for (idx, record) in records.into_iter().enumerate() {
            if !kept.contains(&idx) {
                tracing::warn!(
                    path = %record.depot_path,
                    action = %record.action,
                    "dropping duplicate status entry"
                );
                continue;
            }
            match record.action {
                ChangeAction::Modify => set.modified.push(record),
                ChangeAction::Add => set.added.push(record),
                ChangeAction::Delete => set.deleted.push(record),
            }
        }
        set
    }

    /// Split into `(modified, deleted, added)`
    pub fn into_parts(self) -> (Vec<ChangeRecord>, Vec<ChangeRecord>, Vec<ChangeRecord>) {
        (self.modified, self.deleted, self.added)
    }
}

/// One unit of a patch set
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffBlock {
    /// Unified-diff text with `---`/`+++` headers
    Diff(String),
    /// A deleted file, sent as the literal line `delete <path>`
    Deletion(RepoPath),
}

impl fmt::Display for DiffBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Diff(text) => f.write_str(text),
            Self::Deletion(path) => write!(f, "delete {path}"),
        }
    }
}

/// Ordered diff blocks: native diff, then deletions, then additions.
///
/// An empty set means the working copy has no pending changes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatchSet {
    blocks: Vec<DiffBlock>,
}

impl PatchSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, block: DiffBlock) {
        self.blocks.push(block);
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DiffBlock> {
        self.blocks.iter()
    }

    pub fn blocks(&self) -> &[DiffBlock] {
        &self.blocks
    }

    /// Wire form: one string per block, in order
    pub fn into_strings(self) -> Vec<String> {
        self.blocks.into_iter().map(|b| b.to_string()).collect()
    }
}

impl fmt::Display for PatchSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, block) in self.blocks.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "{block}")?;
        }
        Ok(())
    }
}

impl IntoIterator for PatchSet {
    type Item = DiffBlock;
    type IntoIter = std::vec::IntoIter<DiffBlock>;

    fn into_iter(self) -> Self::IntoIter {
        self.blocks.into_iter()
    }
}
