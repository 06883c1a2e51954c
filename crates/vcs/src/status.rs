//! Parsers for status listings.
//!
//! All functions here are pure: they take the captured text of a VCS command
//! and turn it into typed records, so they can be tested against fixture
//! output without the VCS installed.

use std::collections::BTreeMap;

use crate::error::VcsError;
use crate::types::{ChangeAction, ChangeRecord, PathMapping};

/// One record of Perforce tagged (`-ztag`) output
pub type TaggedRecord = BTreeMap<String, String>;

const TAG_PREFIX: &str = "... ";

/// Split tagged output into records.
///
/// Records are runs of `... <tag> <value>` lines separated by blank lines.
/// Nested tags (`... ... <tag>`) and untagged informational lines are ignored.
pub fn parse_tagged(output: &str) -> Vec<TaggedRecord> {
    let mut records = Vec::new();
    let mut current = TaggedRecord::new();

    for line in output.lines() {
        let line = line.trim_end_matches('\r');

        if line.trim().is_empty() {
            if !current.is_empty() {
                records.push(std::mem::take(&mut current));
            }
            continue;
        }

        let Some(rest) = line.strip_prefix(TAG_PREFIX) else {
            continue;
        };
        if rest.starts_with("...") {
            continue;
        }

        let (tag, value) = rest.split_once(' ').unwrap_or((rest, ""));
        if current.contains_key(tag) {
            records.push(std::mem::take(&mut current));
        }
        current.insert(tag.to_string(), value.to_string());
    }

    if !current.is_empty() {
        records.push(current);
    }
    records
}

/// Map a Perforce open/reconcile action onto a change category
pub fn p4_action(action: &str) -> Option<ChangeAction> {
    match action {
        "edit" | "integrate" => Some(ChangeAction::Modify),
        "add" | "move/add" | "branch" => Some(ChangeAction::Add),
        "delete" | "move/delete" => Some(ChangeAction::Delete),
        _ => None,
    }
}

/// Parse `p4 -ztag status` output into change records
pub fn parse_ztag_status(command: &str, output: &str) -> Result<Vec<ChangeRecord>, VcsError> {
    let mut changes = Vec::new();

    for record in parse_tagged(output) {
        let Some(action) = record.get("action") else {
            continue;
        };
        let depot_file = record
            .get("depotFile")
            .filter(|p| !p.is_empty())
            .ok_or_else(|| {
                VcsError::unparseable(command, format!("'{action}' record without depotFile"))
            })?;

        let Some(kind) = p4_action(action) else {
            tracing::warn!(%action, path = %depot_file, "skipping unsupported p4 action");
            continue;
        };

        let mut change = ChangeRecord::new(kind, depot_file.clone());
        if let Some(local) = record.get("localFile").or_else(|| record.get("path")) {
            if !local.is_empty() {
                change = change.with_local_path(local);
            }
        }
        changes.push(change);
    }

    Ok(changes)
}

/// Parse `p4 -ztag where <file>` output into a path mapping.
///
/// Exclusion (`unmap`) records are skipped.
pub fn parse_ztag_where(command: &str, output: &str) -> Result<PathMapping, VcsError> {
    parse_tagged(output)
        .into_iter()
        .filter(|record| !record.contains_key("unmap"))
        .find_map(|record| {
            let depot_path = record.get("depotFile")?.clone();
            let local_path = record.get("path")?.into();
            Some(PathMapping {
                depot_path,
                local_path,
            })
        })
        .ok_or_else(|| VcsError::unparseable(command, "no mapped depotFile/path record"))
}

/// First `change` field of `p4 -ztag changes` output
pub fn parse_ztag_change(output: &str) -> Option<String> {
    parse_tagged(output)
        .into_iter()
        .find_map(|record| record.get("change").cloned())
}

/// Parse `git status --porcelain=v1 -z` output into change records.
///
/// Paths are relative to the repository root.
pub fn parse_porcelain_status(command: &str, output: &str) -> Result<Vec<ChangeRecord>, VcsError> {
    let mut changes = Vec::new();
    let mut entries = output.split('\0').filter(|e| !e.is_empty());

    while let Some(entry) = entries.next() {
        if entry.len() < 4 || entry.as_bytes()[2] != b' ' {
            return Err(VcsError::unparseable(
                command,
                format!("malformed status entry {entry:?}"),
            ));
        }

        let (code, path) = entry.split_at(3);
        let mut code_chars = code.chars();
        let x = code_chars.next().unwrap_or(' ');
        let y = code_chars.next().unwrap_or(' ');

        match (x, y) {
            ('!', '!') => {}
            ('?', '?') => changes.push(ChangeRecord::new(ChangeAction::Add, path)),
            // Added to the index, then removed from disk: nothing relative to HEAD.
            ('A', 'D') => {}
            ('R', _) | ('C', _) => {
                let origin = entries.next().ok_or_else(|| {
                    VcsError::unparseable(command, format!("missing origin for {path:?}"))
                })?;
                changes.push(ChangeRecord::new(ChangeAction::Add, path));
                if x == 'R' {
                    changes.push(ChangeRecord::new(ChangeAction::Delete, origin));
                }
            }
            ('D', _) | (_, 'D') => changes.push(ChangeRecord::new(ChangeAction::Delete, path)),
            ('A', _) | (_, 'A') => changes.push(ChangeRecord::new(ChangeAction::Add, path)),
            ('M' | 'T' | 'U' | ' ', 'M' | 'T' | 'U' | ' ') => {
                changes.push(ChangeRecord::new(ChangeAction::Modify, path))
            }
            _ => {
                return Err(VcsError::unparseable(
                    command,
                    format!("unknown status code {code:?}"),
                ))
            }
        }
    }

    Ok(changes)
}
