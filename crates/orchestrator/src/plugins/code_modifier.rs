use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use llm::TextGenerator;
use serde::Deserialize;
use taskforge_core::{Task, TaskStatus, TaskUpdate};
use tokio::fs;
use tracing::{info, warn};
use vcs::{GitRepo, SandboxRunner};

use crate::diff;
use crate::error::{OrchestratorError, Result};
use crate::format::CodeFormatter;
use crate::permissions::{self, PermissionPolicy};
use crate::plugin::Plugin;
use crate::prompts;

pub const CODE_MODIFIER_ID: &str = "code-modifier";

/// Result of applying an approved proposal to the working tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// A commit was created with this sha.
    Committed(String),
    /// The diff applied cleanly but changed nothing; no commit was made.
    NothingToCommit,
}

/// Strategy that proposes source changes for explicit target files,
/// verifies them in an isolated sandbox and parks the task for review.
/// Nothing touches the real branch until [`CodeModifierPlugin::apply_approved`].
pub struct CodeModifierPlugin {
    llm: Arc<dyn TextGenerator>,
    permissions: PermissionPolicy,
    repo: GitRepo,
    sandbox: SandboxRunner,
    formatter: CodeFormatter,
}

#[derive(Debug, Deserialize)]
struct ModificationResponse {
    #[serde(default)]
    explanation: String,
    #[serde(default)]
    modifications: Vec<ProposedModification>,
}

#[derive(Debug, Deserialize)]
struct ProposedModification {
    path: String,
    new_content: String,
}

impl CodeModifierPlugin {
    pub fn new(
        llm: Arc<dyn TextGenerator>,
        permissions: PermissionPolicy,
        repo: GitRepo,
        sandbox: SandboxRunner,
    ) -> Self {
        Self {
            llm,
            permissions,
            repo,
            sandbox,
            formatter: CodeFormatter::new(),
        }
    }

    fn parse_targets(task: &Task) -> Result<Vec<String>> {
        let targets: Vec<String> = task
            .target_files
            .as_deref()
            .unwrap_or("")
            .split(',')
            .map(|s| permissions::normalize(s))
            .filter(|s| !s.is_empty())
            .collect();

        if targets.is_empty() {
            return Err(OrchestratorError::InvalidInput(
                "task has no target files".to_string(),
            ));
        }
        Ok(targets)
    }

    /// Maps a repository-relative path onto the working tree, rejecting
    /// anything that would escape the repository root.
    fn resolve(&self, relative: &str) -> Result<PathBuf> {
        let p = Path::new(relative);
        let escapes = p.is_absolute()
            || p.components()
                .any(|c| matches!(c, Component::ParentDir | Component::Prefix(_)));
        if escapes {
            return Err(OrchestratorError::InvalidInput(format!(
                "path escapes the repository: {relative}"
            )));
        }
        Ok(self.repo.path().join(p))
    }

    async fn read_target(&self, relative: &str) -> Result<String> {
        let abs = self.resolve(relative)?;
        match fs::read_to_string(&abs).await {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = relative, "target does not exist yet, treating as new file");
                Ok(String::new())
            }
            Err(e) => Err(e.into()),
        }
    }

    fn parked_for_review(explanation: String, note: &str) -> TaskUpdate {
        TaskUpdate {
            status: Some(TaskStatus::AwaitingReview),
            explanation: Some(explanation),
            proposed_diff: Some(diff::NO_CHANGES_PLACEHOLDER.to_string()),
            test_status: Some(taskforge_core::TestStatus::NotRun),
            test_output: Some(note.to_string()),
            ..TaskUpdate::default()
        }
    }

    /// Apply a reviewed proposal to the real branch and commit it.
    ///
    /// Any uncommitted operator changes are shelved to the stash first.
    /// If application or the commit fails the working tree is hard-reset,
    /// so the branch is never left with a partial change.
    pub async fn apply_approved(&self, task: &Task, approver: &str) -> Result<ApplyOutcome> {
        let diff_text = task.proposed_diff.as_deref().unwrap_or("");
        if diff::is_empty_artifact(diff_text) {
            return Err(OrchestratorError::NothingToApply);
        }

        if self.repo.is_dirty().await? {
            self.repo
                .stash_push(&format!("task-autostash-apply-{}", task.id))
                .await?;
        }

        // Written outside the repository so `add_all` never stages it.
        let patch_path = std::env::temp_dir().join(format!(".task-{}-apply.patch", task.id));
        fs::write(&patch_path, diff_text).await?;

        let outcome = self.apply_inner(task, approver, &patch_path).await;

        if let Err(e) = fs::remove_file(&patch_path).await {
            warn!(task_id = %task.id, error = %e, "failed to remove apply patch file");
        }
        outcome
    }

    async fn apply_inner(
        &self,
        task: &Task,
        approver: &str,
        patch_path: &Path,
    ) -> Result<ApplyOutcome> {
        if let Err(e) = self.repo.apply_patch(patch_path).await {
            self.rollback(task).await;
            return Err(e.into());
        }

        if !self.repo.is_dirty().await? {
            info!(task_id = %task.id, "approved diff changed nothing, skipping commit");
            return Ok(ApplyOutcome::NothingToCommit);
        }

        if let Err(e) = self.repo.add_all().await {
            self.rollback(task).await;
            return Err(e.into());
        }

        let message = format!(
            "task({}): {}\n\nApproved-by: {}",
            task.id, task.prompt, approver
        );
        match self.repo.commit(&message, None).await {
            Ok(sha) => {
                info!(task_id = %task.id, commit = %sha, "approved changes committed");
                Ok(ApplyOutcome::Committed(sha))
            }
            Err(e) => {
                self.rollback(task).await;
                Err(e.into())
            }
        }
    }

    async fn rollback(&self, task: &Task) {
        if let Err(e) = self.repo.hard_reset().await {
            warn!(task_id = %task.id, error = %e, "rollback hard reset failed");
        }
    }
}

#[async_trait]
impl Plugin for CodeModifierPlugin {
    fn id(&self) -> &'static str {
        CODE_MODIFIER_ID
    }

    fn name(&self) -> &'static str {
        "Code Modifier"
    }

    fn description(&self) -> &'static str {
        "Proposes changes to explicitly listed files, runs the test suite \
         against them in an isolated branch and waits for human review."
    }

    async fn execute(&self, task: &Task) -> Result<TaskUpdate> {
        let targets = Self::parse_targets(task)?;
        self.permissions.authorize(&targets).await?;

        let mut files = Vec::with_capacity(targets.len());
        for target in &targets {
            files.push((target.clone(), self.read_target(target).await?));
        }

        let prompt = prompts::code_modification(&task.prompt, &files);
        let value = self.llm.generate_json(&prompt).await?;
        let response: ModificationResponse = serde_json::from_value(value)
            .map_err(|e| OrchestratorError::MalformedResponse(e.to_string()))?;

        let explanation = if response.explanation.trim().is_empty() {
            "No explanation provided.".to_string()
        } else {
            response.explanation.clone()
        };

        if response.modifications.is_empty() {
            info!(task_id = %task.id, "model proposed no modifications");
            return Ok(Self::parked_for_review(explanation, "No changes to test."));
        }

        // The model may only touch paths the operator authorized; a
        // response naming anything else is rejected wholesale.
        let proposed_paths: Vec<String> = response
            .modifications
            .iter()
            .map(|m| permissions::normalize(&m.path))
            .collect();
        self.permissions.authorize(&proposed_paths).await?;

        let mut changes = Vec::with_capacity(response.modifications.len());
        for modification in &response.modifications {
            let path = permissions::normalize(&modification.path);
            let original = match files.iter().find(|(p, _)| *p == path) {
                Some((_, content)) => content.clone(),
                None => self.read_target(&path).await?,
            };

            let mut formatted = self.formatter.format(&path, &modification.new_content).await;
            if !formatted.is_empty() && !formatted.ends_with('\n') {
                formatted.push('\n');
            }
            changes.push((path, original, formatted));
        }

        let artifact = diff::build_artifact(&changes);
        if diff::is_empty_artifact(&artifact) {
            return Ok(Self::parked_for_review(
                explanation,
                "Proposed contents are identical to the current files.",
            ));
        }

        let report = self.sandbox.run_isolated(task.id, &artifact).await;

        Ok(TaskUpdate {
            status: Some(TaskStatus::AwaitingReview),
            explanation: Some(explanation),
            proposed_diff: Some(artifact),
            test_status: Some(report.outcome),
            test_output: Some(report.output),
            ..TaskUpdate::default()
        })
    }
}
