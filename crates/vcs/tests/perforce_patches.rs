
use std::path::Path;
use std::sync::Arc;

use pretty_assertions::assert_eq;
use tempfile::TempDir;
use vcs::{
    snapshot, DiffBlock, PathRoot, RepoPath, VcsBackend, VcsBackendType, VcsConfig, VcsError,
    VcsFactory,
};
use vcs_test_utils::{write_file, ztag, ScriptedRunner};

const RECONCILE: &str = "p4 reconcile -e";
const DIFF: &str = "p4 diff -du0";
const STATUS: &str = "p4 -ztag status";

const NOT_OPENED: &str = "File(s) not opened on this client.\n";
const NOTHING_TO_RECONCILE: &str = "No file(s) to reconcile.\n";

fn open(ws: &Path, runner: &Arc<ScriptedRunner>) -> Box<dyn VcsBackend> {
    let config = VcsConfig::new(VcsBackendType::Perforce, ws);
    VcsFactory::create_with_runner(&config, runner.clone()).expect("open perforce backend")
}

fn local(ws: &Path, rel: &str) -> String {
    ws.join(rel).display().to_string()
}

fn edit_diff(ws: &Path, rel: &str, old: &str, new: &str) -> String {
    format!(
        "==== //depot/main/{rel}#3 - {local} ====\n\
         --- //depot/main/{rel}\t2024-05-01 10:00:00.000000000 +0000\n\
         +++ {local}\t2024-05-02 11:00:00.000000000 +0000\n\
         @@ -1 +1 @@\n\
         -{old}\n\
         +{new}\n",
        local = local(ws, rel),
    )
}

fn status_record(ws: &Path, action: &str, rel: &str) -> String {
    ztag(&[
        ("depotFile", &format!("//depot/main/{rel}")),
        ("clientFile", &format!("//dev-ws/{rel}")),
        ("localFile", &local(ws, rel)),
        ("action", action),
    ])
}

#[test]
fn test_clean_workspace_yields_no_patches() {
    let ws = TempDir::new().unwrap();
    let runner = ScriptedRunner::new();
    runner
        .fail(RECONCILE, NOTHING_TO_RECONCILE)
        .fail(DIFF, NOT_OPENED)
        .fail(STATUS, NOTHING_TO_RECONCILE);

    let patches = open(ws.path(), &runner).patches().unwrap();
    assert!(patches.is_empty());
}

#[test]
fn test_modified_file_at_any_depth() {
    let ws = TempDir::new().unwrap();
    let rel = "a/b/c/d/e.c";
    let runner = ScriptedRunner::new();
    runner
        .ok(RECONCILE, "")
        .ok(DIFF, edit_diff(ws.path(), rel, "int x = 1;", "int x = 2;"))
        .ok(STATUS, status_record(ws.path(), "edit", rel));

    let patches = open(ws.path(), &runner).patches().unwrap();
    assert_eq!(
        patches.into_strings(),
        vec!["--- a/b/c/d/e.c\n+++ a/b/c/d/e.c\n@@ -1 +1 @@\n-int x = 1;\n+int x = 2;\n"]
    );
}

#[test]
fn test_added_file_is_synthesized() {
    let ws = TempDir::new().unwrap();
    write_file(ws.path(), "pkg/new.txt", "hello\n");
    let runner = ScriptedRunner::new();
    runner
        .ok(RECONCILE, "")
        .fail(DIFF, NOT_OPENED)
        .ok(STATUS, status_record(ws.path(), "add", "pkg/new.txt"));

    let patches = open(ws.path(), &runner).patches().unwrap();
    assert_eq!(
        patches.into_strings(),
        vec!["--- /dev/null\n+++ pkg/new.txt\n@@ -0,0 +1 @@\n+hello\n"]
    );
}

#[test]
fn test_added_file_without_local_path_uses_where() {
    let ws = TempDir::new().unwrap();
    write_file(ws.path(), "pkg/new.txt", "hello\n");
    let runner = ScriptedRunner::new();
    runner
        .ok(RECONCILE, "")
        .fail(DIFF, NOT_OPENED)
        .ok(
            STATUS,
            ztag(&[("depotFile", "//depot/main/pkg/new.txt"), ("action", "add")]),
        )
        .ok(
            "p4 -ztag where //depot/main/pkg/new.txt",
            ztag(&[
                ("depotFile", "//depot/main/pkg/new.txt"),
                ("clientFile", "//dev-ws/pkg/new.txt"),
                ("path", &local(ws.path(), "pkg/new.txt")),
            ]),
        );

    let patches = open(ws.path(), &runner).patches().unwrap();
    assert_eq!(patches.len(), 1);
    assert_eq!(runner.count("p4 -ztag where //depot/main/pkg/new.txt"), 1);
}

#[test]
fn test_modified_file_without_local_path_uses_where() {
    let ws = TempDir::new().unwrap();
    let runner = ScriptedRunner::new();
    runner
        .ok(RECONCILE, "")
        .ok(DIFF, edit_diff(ws.path(), "proj/a.c", "old", "new"))
        .ok(
            STATUS,
            ztag(&[("depotFile", "//depot/main/proj/a.c"), ("action", "edit")]),
        )
        .ok(
            "p4 -ztag where //depot/main/proj/a.c",
            ztag(&[
                ("depotFile", "//depot/main/proj/a.c"),
                ("clientFile", "//dev-ws/proj/a.c"),
                ("path", &local(ws.path(), "proj/a.c")),
            ]),
        );

    let patches = open(ws.path(), &runner).patches().unwrap();
    assert_eq!(
        patches.into_strings(),
        vec!["--- proj/a.c\n+++ proj/a.c\n@@ -1 +1 @@\n-old\n+new\n"]
    );
    assert_eq!(runner.count("p4 -ztag where //depot/main/proj/a.c"), 1);
}

#[test]
fn test_deleted_file_becomes_sentinel() {
    let ws = TempDir::new().unwrap();
    let runner = ScriptedRunner::new();
    runner
        .ok(RECONCILE, "")
        .fail(DIFF, NOT_OPENED)
        .ok(STATUS, status_record(ws.path(), "delete", "pkg/foo.go"));

    let patches = open(ws.path(), &runner).patches().unwrap();
    assert_eq!(
        patches.blocks(),
        &[DiffBlock::Deletion(RepoPath::parse("pkg/foo.go").unwrap())]
    );
    assert_eq!(patches.into_strings(), vec!["delete pkg/foo.go"]);
}

#[test]
fn test_blocks_are_ordered_modified_deleted_added() {
    let ws = TempDir::new().unwrap();
    write_file(ws.path(), "pkg/new.txt", "hello\n");
    let status = [
        status_record(ws.path(), "add", "pkg/new.txt"),
        status_record(ws.path(), "delete", "pkg/foo.go"),
        status_record(ws.path(), "edit", "proj/src/lib.c"),
    ]
    .concat();

    let runner = ScriptedRunner::new();
    runner
        .ok(RECONCILE, "")
        .ok(DIFF, edit_diff(ws.path(), "proj/src/lib.c", "a", "b"))
        .ok(STATUS, status);

    let patches = open(ws.path(), &runner).patches().unwrap();
    assert_eq!(
        patches.into_strings(),
        vec![
            "--- proj/src/lib.c\n+++ proj/src/lib.c\n@@ -1 +1 @@\n-a\n+b\n".to_string(),
            "delete pkg/foo.go".to_string(),
            "--- /dev/null\n+++ pkg/new.txt\n@@ -0,0 +1 @@\n+hello\n".to_string(),
        ]
    );
    assert_eq!(runner.calls(), vec![RECONCILE, DIFF, STATUS]);
}

#[test]
fn test_repeated_extraction_is_identical() {
    let ws = TempDir::new().unwrap();
    write_file(ws.path(), "docs/readme.md", "# title\n\nbody\n");
    let status = [
        status_record(ws.path(), "edit", "src/main.go"),
        status_record(ws.path(), "add", "docs/readme.md"),
    ]
    .concat();

    let runner = ScriptedRunner::new();
    runner
        .ok(RECONCILE, "")
        .ok(DIFF, edit_diff(ws.path(), "src/main.go", "x", "y"))
        .ok(STATUS, status);

    let mut vcs = open(ws.path(), &runner);
    let first = vcs.patches().unwrap();
    let second = vcs.patches().unwrap();
    assert_eq!(first, second);
    assert_eq!(runner.count(RECONCILE), 2);
}

#[test]
fn test_missing_added_file_fails_whole_extraction() {
    let ws = TempDir::new().unwrap();
    let status = [
        status_record(ws.path(), "edit", "src/main.go"),
        status_record(ws.path(), "add", "pkg/ghost.txt"),
    ]
    .concat();

    let runner = ScriptedRunner::new();
    runner
        .ok(RECONCILE, "")
        .ok(DIFF, edit_diff(ws.path(), "src/main.go", "x", "y"))
        .ok(STATUS, status);

    let err = open(ws.path(), &runner).patches().unwrap_err();
    assert!(matches!(err, VcsError::MissingFile(ref path) if path.ends_with("ghost.txt")));
}

#[test]
fn test_empty_added_file_is_missing() {
    let ws = TempDir::new().unwrap();
    write_file(ws.path(), "pkg/empty.txt", "");
    let runner = ScriptedRunner::new();
    runner
        .ok(RECONCILE, "")
        .fail(DIFF, NOT_OPENED)
        .ok(STATUS, status_record(ws.path(), "add", "pkg/empty.txt"));

    let err = open(ws.path(), &runner).patches().unwrap_err();
    assert!(matches!(err, VcsError::MissingFile(_)));
}

#[test]
fn test_delete_wins_over_edit_for_same_file() {
    let ws = TempDir::new().unwrap();
    let status = [
        status_record(ws.path(), "edit", "pkg/foo.go"),
        status_record(ws.path(), "delete", "pkg/foo.go"),
    ]
    .concat();

    let runner = ScriptedRunner::new();
    runner
        .ok(RECONCILE, "")
        .fail(DIFF, NOT_OPENED)
        .ok(STATUS, status);

    let patches = open(ws.path(), &runner).patches().unwrap();
    assert_eq!(patches.into_strings(), vec!["delete pkg/foo.go"]);
}

#[test]
fn test_shallow_depot_path_is_rejected() {
    let ws = TempDir::new().unwrap();
    let runner = ScriptedRunner::new();
    runner.ok(RECONCILE, "").fail(DIFF, NOT_OPENED).ok(
        STATUS,
        ztag(&[
            ("depotFile", "//depot/main"),
            ("localFile", &local(ws.path(), "main")),
            ("action", "delete"),
        ]),
    );

    let err = open(ws.path(), &runner).patches().unwrap_err();
    assert!(matches!(err, VcsError::PathNormalization { .. }));
}

#[test]
fn test_prefix_root_and_global_args() {
    let ws = TempDir::new().unwrap();
    let runner = ScriptedRunner::new();
    runner
        .ok("p4 -c dev-ws reconcile -e", "")
        .fail("p4 -c dev-ws diff -du0", NOT_OPENED)
        .ok(
            "p4 -c dev-ws -ztag status",
            ztag(&[
                ("depotFile", "//depot/projects/game/assets/user%40home.png"),
                ("action", "delete"),
            ]),
        );

    let mut config = VcsConfig::new(VcsBackendType::Perforce, ws.path());
    config.perforce.root = PathRoot::Prefix("//depot/projects/game".into());
    config.perforce.client = Some("dev-ws".into());

    let patches = VcsFactory::create_with_runner(&config, runner.clone())
        .unwrap()
        .patches()
        .unwrap();
    assert_eq!(patches.into_strings(), vec!["delete assets/user@home.png"]);
}

#[test]
fn test_tool_failure_is_reported() {
    let ws = TempDir::new().unwrap();
    let runner = ScriptedRunner::new();
    runner.fail(
        RECONCILE,
        "Perforce password (P4PASSWD) invalid or unset.\n",
    );

    let err = open(ws.path(), &runner).patches().unwrap_err();
    assert!(err.is_external_tool());
    assert!(err.user_message().contains("p4 login"));
    assert_eq!(runner.calls(), vec![RECONCILE]);
}

#[test]
fn test_snapshot_records_have_revision() {
    let ws = TempDir::new().unwrap();
    let runner = ScriptedRunner::new();
    runner
        .ok(
            "p4 -ztag changes -m1 ...#have",
            ztag(&[("change", "4182"), ("status", "submitted")]),
        )
        .ok(RECONCILE, "")
        .fail(DIFF, NOT_OPENED)
        .ok(STATUS, status_record(ws.path(), "delete", "pkg/foo.go"));

    let mut vcs = open(ws.path(), &runner);
    let snap = snapshot(vcs.as_mut()).unwrap();
    assert_eq!(snap.backend, VcsBackendType::Perforce);
    assert_eq!(snap.revision.as_deref(), Some("4182"));
    assert_eq!(snap.patches.len(), 1);
}

#[test]
fn test_open_missing_workspace() {
    let runner = ScriptedRunner::new();
    let config = VcsConfig::new(VcsBackendType::Perforce, "/definitely/not/a/workspace");
    let err = VcsFactory::create_with_runner(&config, runner.clone()).err().unwrap();
    assert!(matches!(err, VcsError::RepositoryNotFound(_)));
    assert!(runner.calls().is_empty());
}
