use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use taskforge_core::TestStatus;
use tokio::process::Command;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::git::GitRepo;

const DEFAULT_TEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Result of one isolated trial run: the test outcome and the captured
/// combined output. A failing test run is a recorded outcome for human
/// judgment, never an error.
#[derive(Debug, Clone)]
pub struct SandboxReport {
    pub outcome: TestStatus,
    pub output: String,
}

impl SandboxReport {
    fn fail(output: impl Into<String>) -> Self {
        Self {
            outcome: TestStatus::Fail,
            output: output.into(),
        }
    }
}

/// Evaluates a candidate patch on an ephemeral branch and runs the test
/// suite, restoring the original branch/commit on every exit path.
pub struct SandboxRunner {
    repo: GitRepo,
    test_command: Vec<String>,
    test_dir: Option<PathBuf>,
    test_timeout: Duration,
}

impl SandboxRunner {
    pub fn new(repo: GitRepo, test_command: Vec<String>) -> Self {
        Self {
            repo,
            test_command,
            test_dir: None,
            test_timeout: DEFAULT_TEST_TIMEOUT,
        }
    }

    /// Run tests from a subdirectory of the repository root.
    pub fn with_test_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.test_dir = Some(dir.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.test_timeout = timeout;
        self
    }

    /// Apply `patch` on an ephemeral branch, run the test suite, and
    /// restore the original working state. An empty or whitespace-only
    /// patch skips the apply step and tests the tree as-is.
    pub async fn run_isolated(&self, task_id: Uuid, patch: &str) -> SandboxReport {
        let original_ref = match self.repo.current_ref().await {
            Ok(r) => r,
            Err(e) => return SandboxReport::fail(format!("Could not resolve current ref: {e}")),
        };

        match self.repo.is_dirty().await {
            Ok(true) => {
                warn!(%task_id, "Working tree dirty before sandbox run, shelving changes");
                if let Err(e) = self
                    .repo
                    .stash_push(&format!("task-autostash-test-{task_id}"))
                    .await
                {
                    return SandboxReport::fail(format!("Could not shelve dirty tree: {e}"));
                }
            }
            Ok(false) => {}
            Err(e) => return SandboxReport::fail(format!("Could not check tree state: {e}")),
        }

        // Uniqueness, not secrecy.
        let branch = format!(
            "task-test-{}-{}",
            task_id,
            chrono::Utc::now().timestamp()
        );
        let patch_file = self.repo.path().join(format!(".task-{task_id}.patch"));

        let result = self.run_inner(&branch, &patch_file, patch).await;

        // Restoration is unconditional: it runs on every exit path of
        // run_inner, success or failure.
        self.restore(&original_ref, &branch, &patch_file).await;

        match result {
            Ok(report) => report,
            Err(message) => SandboxReport::fail(message),
        }
    }

    async fn run_inner(
        &self,
        branch: &str,
        patch_file: &Path,
        patch: &str,
    ) -> std::result::Result<SandboxReport, String> {
        self.repo
            .create_branch(branch)
            .await
            .map_err(|e| format!("Could not create sandbox branch: {e}"))?;

        if !patch.trim().is_empty() {
            tokio::fs::write(patch_file, patch)
                .await
                .map_err(|e| format!("Could not write patch file: {e}"))?;
            self.repo
                .apply_patch(patch_file)
                .await
                .map_err(|e| format!("Patch did not apply cleanly: {e}"))?;
            info!(branch, "Applied candidate patch to sandbox branch");
        } else {
            info!(branch, "Empty patch, testing tree as-is");
        }

        self.run_tests().await
    }

    async fn run_tests(&self) -> std::result::Result<SandboxReport, String> {
        let Some((program, args)) = self.test_command.split_first() else {
            return Err("No test command configured".to_string());
        };

        let cwd = match &self.test_dir {
            Some(dir) => self.repo.path().join(dir),
            None => self.repo.path().to_path_buf(),
        };
        if !cwd.is_dir() {
            return Err(format!("Test directory not found: {}", cwd.display()));
        }

        info!(command = ?self.test_command, cwd = %cwd.display(), "Running test suite");

        let child = Command::new(program)
            .args(args)
            .current_dir(&cwd)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output();

        let output = match tokio::time::timeout(self.test_timeout, child).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => return Err(format!("Could not spawn test command: {e}")),
            Err(_) => {
                return Err(format!(
                    "Test run timed out after {}s",
                    self.test_timeout.as_secs()
                ))
            }
        };

        let combined = format!(
            "--- STDOUT ---\n{}\n\n--- STDERR ---\n{}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );

        let outcome = if output.status.success() {
            TestStatus::Pass
        } else {
            TestStatus::Fail
        };

        Ok(SandboxReport {
            outcome,
            output: combined,
        })
    }

    async fn restore(&self, original_ref: &str, branch: &str, patch_file: &Path) {
        if let Err(e) = self.repo.checkout_force(original_ref).await {
            error!(original_ref, "Could not restore original ref: {e}");
        }
        if self.repo.branch_exists(branch).await {
            if let Err(e) = self.repo.delete_branch(branch).await {
                error!(branch, "Could not delete sandbox branch: {e}");
            }
        }
        if patch_file.exists() {
            if let Err(e) = tokio::fs::remove_file(patch_file).await {
                error!(patch_file = %patch_file.display(), "Could not remove patch file: {e}");
            }
        }
    }
}
