//! Integration tests that exercise the sandbox against a real throwaway
//! git repository.

use std::path::Path;
use std::process::Command;
use tempfile::TempDir;
use uuid::Uuid;
use vcs::{GitRepo, SandboxRunner};

use taskforge_core::TestStatus;

fn git(dir: &Path, args: &[&str]) {
    let status = Command::new("git")
        .args(args)
        .current_dir(dir)
        .status()
        .expect("git not available");
    assert!(status.success(), "git {args:?} failed");
}

fn init_repo() -> TempDir {
    let dir = TempDir::new().unwrap();
    git(dir.path(), &["init", "-b", "main"]);
    git(dir.path(), &["config", "user.email", "tests@example.com"]);
    git(dir.path(), &["config", "user.name", "Tests"]);
    std::fs::write(dir.path().join("greeting.txt"), "hello\n").unwrap();
    git(dir.path(), &["add", "-A"]);
    git(dir.path(), &["commit", "-m", "initial"]);
    dir
}

fn head_of(dir: &Path) -> String {
    let out = Command::new("git")
        .args(["rev-parse", "HEAD"])
        .current_dir(dir)
        .output()
        .unwrap();
    String::from_utf8_lossy(&out.stdout).trim().to_string()
}

const GREETING_PATCH: &str = "\
--- a/greeting.txt
+++ b/greeting.txt
@@ -1 +1 @@
-hello
+goodbye
";

#[tokio::test]
async fn run_isolated_restores_branch_and_commit() {
    let dir = init_repo();
    let head_before = head_of(dir.path());

    let repo = GitRepo::open(dir.path()).unwrap();
    let runner = SandboxRunner::new(repo, vec!["true".to_string()]);

    let task_id = Uuid::new_v4();
    let report = runner.run_isolated(task_id, GREETING_PATCH).await;
    assert_eq!(report.outcome, TestStatus::Pass);

    // Round-trip invariant: same branch, same commit, no surviving
    // ephemeral branch, original content intact.
    let repo = GitRepo::open(dir.path()).unwrap();
    assert_eq!(repo.current_ref().await.unwrap(), "main");
    assert_eq!(head_of(dir.path()), head_before);

    let branches = Command::new("git")
        .args(["branch", "--list"])
        .current_dir(dir.path())
        .output()
        .unwrap();
    let branches = String::from_utf8_lossy(&branches.stdout).into_owned();
    assert!(!branches.contains(&task_id.to_string()));

    let content = std::fs::read_to_string(dir.path().join("greeting.txt")).unwrap();
    assert_eq!(content, "hello\n");
}

#[tokio::test]
async fn failing_tests_are_an_outcome_not_an_error() {
    let dir = init_repo();
    let repo = GitRepo::open(dir.path()).unwrap();
    let runner = SandboxRunner::new(repo, vec!["false".to_string()]);

    let report = runner.run_isolated(Uuid::new_v4(), "").await;
    assert_eq!(report.outcome, TestStatus::Fail);

    let repo = GitRepo::open(dir.path()).unwrap();
    assert_eq!(repo.current_ref().await.unwrap(), "main");
}

#[tokio::test]
async fn empty_patch_skips_apply_and_still_tests() {
    let dir = init_repo();
    let repo = GitRepo::open(dir.path()).unwrap();
    let runner = SandboxRunner::new(repo, vec!["true".to_string()]);

    let report = runner.run_isolated(Uuid::new_v4(), "   \n").await;
    assert_eq!(report.outcome, TestStatus::Pass);
}

#[tokio::test]
async fn broken_patch_reports_fail_with_message() {
    let dir = init_repo();
    let repo = GitRepo::open(dir.path()).unwrap();
    let runner = SandboxRunner::new(repo, vec!["true".to_string()]);

    let report = runner
        .run_isolated(Uuid::new_v4(), "this is not a unified diff")
        .await;
    assert_eq!(report.outcome, TestStatus::Fail);
    assert!(!report.output.is_empty());

    let repo = GitRepo::open(dir.path()).unwrap();
    assert_eq!(repo.current_ref().await.unwrap(), "main");
}

#[tokio::test]
async fn dirty_tree_is_shelved_before_sandbox_run() {
    let dir = init_repo();
    std::fs::write(dir.path().join("scratch.txt"), "uncommitted\n").unwrap();

    let repo = GitRepo::open(dir.path()).unwrap();
    let runner = SandboxRunner::new(repo, vec!["true".to_string()]);

    let report = runner.run_isolated(Uuid::new_v4(), "").await;
    assert_eq!(report.outcome, TestStatus::Pass);

    // The shelved change is recoverable from the stash.
    let stashes = Command::new("git")
        .args(["stash", "list"])
        .current_dir(dir.path())
        .output()
        .unwrap();
    assert!(String::from_utf8_lossy(&stashes.stdout).contains("task-autostash-test-"));
}
