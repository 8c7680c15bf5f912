use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::debug;

use crate::error::{Result, VcsError};

/// Wrapper around the `git` CLI for one repository root.
///
/// The repository working tree is a single shared mutable resource: all
/// mutating operations (stash, branch, apply, commit, reset) go through
/// this type so callers can sequence them.
#[derive(Debug, Clone)]
pub struct GitRepo {
    repo_path: PathBuf,
}

impl GitRepo {
    /// Open an existing repository. Fails if `repo_path` is not a git root.
    pub fn open(repo_path: impl Into<PathBuf>) -> Result<Self> {
        let repo_path = repo_path.into();
        if !repo_path.is_dir() {
            return Err(VcsError::InvalidPath(repo_path.display().to_string()));
        }
        if !repo_path.join(".git").exists() {
            return Err(VcsError::NotARepository(repo_path.display().to_string()));
        }
        Ok(Self { repo_path })
    }

    pub fn path(&self) -> &Path {
        &self.repo_path
    }

    async fn run_git(&self, args: &[&str]) -> Result<String> {
        debug!("Running git {:?} in {:?}", args, self.repo_path);

        let output = Command::new("git")
            .args(args)
            .current_dir(&self.repo_path)
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
            return Err(VcsError::CommandFailed {
                command: format!("git {}", args.join(" ")),
                stderr,
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Current branch name, or the commit sha when HEAD is detached.
    pub async fn current_ref(&self) -> Result<String> {
        match self.run_git(&["symbolic-ref", "--short", "-q", "HEAD"]).await {
            Ok(branch) if !branch.trim().is_empty() => Ok(branch.trim().to_string()),
            _ => self.current_commit().await,
        }
    }

    pub async fn current_commit(&self) -> Result<String> {
        let sha = self.run_git(&["rev-parse", "HEAD"]).await?;
        Ok(sha.trim().to_string())
    }

    /// True when the working tree has uncommitted changes, untracked
    /// files included.
    pub async fn is_dirty(&self) -> Result<bool> {
        let status = self.run_git(&["status", "--porcelain"]).await?;
        Ok(!status.trim().is_empty())
    }

    /// Shelve uncommitted changes (untracked included). The stash entry is
    /// left in place for the operator to recover; nothing pops it.
    pub async fn stash_push(&self, message: &str) -> Result<()> {
        self.run_git(&["stash", "push", "-u", "-m", message]).await?;
        Ok(())
    }

    pub async fn create_branch(&self, name: &str) -> Result<()> {
        self.run_git(&["checkout", "-b", name]).await?;
        Ok(())
    }

    pub async fn checkout_force(&self, git_ref: &str) -> Result<()> {
        self.run_git(&["checkout", "--force", git_ref]).await?;
        Ok(())
    }

    pub async fn delete_branch(&self, name: &str) -> Result<()> {
        self.run_git(&["branch", "-D", name]).await?;
        Ok(())
    }

    pub async fn branch_exists(&self, name: &str) -> bool {
        self.run_git(&["rev-parse", "--verify", "-q", &format!("refs/heads/{name}")])
            .await
            .is_ok()
    }

    /// Apply a patch file to the working tree, tolerating whitespace and
    /// EOF irregularities in generated diffs.
    pub async fn apply_patch(&self, patch_file: &Path) -> Result<()> {
        let patch = patch_file
            .to_str()
            .ok_or_else(|| VcsError::InvalidPath(patch_file.display().to_string()))?;
        self.run_git(&["apply", "--recount", "--allow-empty", patch])
            .await?;
        Ok(())
    }

    pub async fn add_all(&self) -> Result<()> {
        self.run_git(&["add", "-A"]).await?;
        Ok(())
    }

    /// Commit staged changes and return the new commit sha.
    pub async fn commit(&self, message: &str, author: Option<&str>) -> Result<String> {
        match author {
            Some(author) => {
                self.run_git(&["commit", "-m", message, "--author", author])
                    .await?
            }
            None => self.run_git(&["commit", "-m", message]).await?,
        };
        self.current_commit().await
    }

    /// Discard all uncommitted changes, returning the tree to HEAD.
    pub async fn hard_reset(&self) -> Result<()> {
        self.run_git(&["reset", "--hard", "HEAD"]).await?;
        Ok(())
    }

    pub async fn status(&self) -> Result<String> {
        self.run_git(&["status", "--porcelain"]).await
    }
}
