//! VCS Patch Extraction Layer
//!
//! This crate turns the pending changes of a working copy into an ordered
//! list of unified-diff blocks, over a trait-based abstraction of version
//! control systems. Two backends are provided: Git, which diffs natively,
//! and Perforce, whose pending state has to be scraped from tagged status
//! output and whose additions are synthesized from the working tree.
//!
//! # Design Goals
//!
//! - **Clean trait interface**: Operations are grouped by concern
//! - **Repository-relative output**: Every block names files relative to the
//!   top of the versioned tree, never by depot or absolute path
//! - **Typed parsing**: Status output is parsed into records, not grepped
//! - **All or nothing**: The first failure aborts an extraction
//!
//! # Patch set layout
//!
//! 1. the native diff of modified files (one block, may cover many files)
//! 2. one `delete <path>` block per deleted file
//! 3. one synthesized diff per added file
//!
//! # Example
//!
//! ```no_run
//! use vcs::{VcsBackend, VcsBackendType, VcsConfig, VcsFactory};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = VcsConfig::new(VcsBackendType::Perforce, "/home/dev/ws");
//!
//! let mut vcs = VcsFactory::create(&config)?;
//! for block in vcs.patches()? {
//!     println!("{block}");
//! }
//! # Ok(())
//! # }
//! ```

mod error;
mod factory;
mod paths;
mod patch;
mod process;
mod status;
mod synth;
mod traits;
mod types;

mod backend;

pub use error::VcsError;
pub use factory::{GitConfig, PerforceConfig, VcsBackendType, VcsConfig, VcsFactory};
pub use paths::{DepotPath, PathNormalizer, PathRoot, RepoPath, ROOT_MARKER};
pub use patch::{collect_patches, snapshot, HeaderRewriter, WorkingCopySnapshot};
pub use process::{command_line, CommandRunner, ProcessOutput, SystemRunner, Tool};
pub use status::{
    p4_action, parse_porcelain_status, parse_tagged, parse_ztag_change, parse_ztag_status,
    parse_ztag_where, TaggedRecord,
};
pub use synth::{added_file_diff, synthesize_added_file, DEV_NULL};
pub use traits::{VcsBackend, VcsChanges, VcsDiff, VcsRepository};
pub use types::{
    ChangeAction, ChangeRecord, ChangeSet, DiffBlock, PatchSet, PathMapping, ResolvedChange,
};

#[cfg(feature = "git")]
pub use backend::git::GitRepository;
#[cfg(feature = "perforce")]
pub use backend::perforce::PerforceRepository;
