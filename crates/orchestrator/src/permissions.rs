use std::sync::Arc;

use db::PermissionRepository;
use tracing::debug;

use crate::error::{OrchestratorError, Result};

/// Path allow-list enforcement for file-touching strategies.
///
/// Rules are repository-relative paths. A rule ending in `/` authorizes
/// everything under that directory by literal prefix; any other rule
/// authorizes exactly one file. No rules means nothing is authorized.
pub struct PermissionPolicy {
    rules: Arc<PermissionRepository>,
}

impl PermissionPolicy {
    pub fn new(rules: Arc<PermissionRepository>) -> Self {
        Self { rules }
    }

    /// Checks every requested path against the current allow-list and
    /// fails closed, naming the first offending path.
    pub async fn authorize(&self, paths: &[String]) -> Result<()> {
        if paths.is_empty() {
            return Err(OrchestratorError::InvalidInput(
                "no target paths to authorize".to_string(),
            ));
        }

        let rules: Vec<String> = self
            .rules
            .find_all()
            .await?
            .into_iter()
            .map(|r| normalize(&r.path))
            .collect();

        for path in paths {
            let candidate = normalize(path);
            if !is_allowed(&rules, &candidate) {
                return Err(OrchestratorError::PermissionDenied(candidate));
            }
            debug!(path = %candidate, "path authorized");
        }
        Ok(())
    }
}

/// Normalizes a repository-relative path for comparison: backslashes
/// become forward slashes, surrounding whitespace and a leading `./`
/// are stripped.
pub fn normalize(path: &str) -> String {
    let p = path.trim().replace('\\', "/");
    p.strip_prefix("./").unwrap_or(&p).to_string()
}

/// Pure matching core. `rules` and `candidate` must already be normalized.
pub fn is_allowed(rules: &[String], candidate: &str) -> bool {
    rules.iter().any(|rule| {
        if rule.ends_with('/') {
            candidate.starts_with(rule.as_str())
        } else {
            candidate == rule
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn exact_rule_matches_only_that_file() {
        let rules = rules(&["src/main.rs"]);
        assert!(is_allowed(&rules, "src/main.rs"));
        assert!(!is_allowed(&rules, "src/main.rs.bak"));
        assert!(!is_allowed(&rules, "src/lib.rs"));
    }

    #[test]
    fn directory_rule_matches_by_prefix() {
        let rules = rules(&["src/"]);
        assert!(is_allowed(&rules, "src/main.rs"));
        assert!(is_allowed(&rules, "src/nested/deep.rs"));
        assert!(!is_allowed(&rules, "tests/main.rs"));
        // The directory entry itself is not a file match.
        assert!(!is_allowed(&rules, "src"));
    }

    #[test]
    fn empty_rule_set_denies_everything() {
        assert!(!is_allowed(&[], "src/main.rs"));
    }

    #[test]
    fn unrelated_rules_never_widen_the_outcome() {
        let before = rules(&["docs/"]);
        let after = rules(&["docs/", "README.md", "scripts/deploy.sh"]);

        for candidate in ["src/main.rs", "docs/guide.md", "README.md.bak"] {
            assert_eq!(is_allowed(&before, candidate), is_allowed(&after, candidate));
        }
    }

    #[test]
    fn normalization_unifies_separators() {
        assert_eq!(normalize("src\\app\\main.rs"), "src/app/main.rs");
        assert_eq!(normalize("  ./src/main.rs "), "src/main.rs");
    }

    #[tokio::test]
    async fn policy_fails_closed_naming_the_path() {
        let pool = db::create_pool("sqlite::memory:").await.unwrap();
        db::run_migrations(&pool).await.unwrap();
        let repo = Arc::new(PermissionRepository::new(pool));
        repo.create(&taskforge_core::PermissionRule::new("src/", None))
            .await
            .unwrap();

        let policy = PermissionPolicy::new(repo);
        policy
            .authorize(&["src/main.rs".to_string()])
            .await
            .unwrap();

        let err = policy
            .authorize(&["secrets/key.pem".to_string()])
            .await
            .unwrap_err();
        match err {
            OrchestratorError::PermissionDenied(path) => {
                assert_eq!(path, "secrets/key.pem");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn empty_request_is_invalid_input() {
        let pool = db::create_pool("sqlite::memory:").await.unwrap();
        db::run_migrations(&pool).await.unwrap();
        let policy = PermissionPolicy::new(Arc::new(PermissionRepository::new(pool)));

        let err = policy.authorize(&[]).await.unwrap_err();
        assert!(matches!(err, OrchestratorError::InvalidInput(_)));
    }
}
