use std::fmt::Write as _;

use similar::TextDiff;

/// Placeholder stored on the task when a proposal produced no textual
/// changes. The review surface always has something to show.
pub const NO_CHANGES_PLACEHOLDER: &str = "-- no changes detected --";

/// Unified diff for a single file, with `a/` and `b/` path prefixes so the
/// artifact can later be fed back to `git apply`. Returns `None` when the
/// contents are identical.
pub fn unified_diff(path: &str, original: &str, updated: &str) -> Option<String> {
    if original == updated {
        return None;
    }

    let diff = TextDiff::from_lines(original, updated);
    let mut out = String::new();
    let _ = write!(
        out,
        "{}",
        diff.unified_diff()
            .context_radius(3)
            .header(&format!("a/{path}"), &format!("b/{path}"))
    );
    Some(out)
}

/// Concatenates per-file diffs into the reviewable artifact. Unchanged
/// files contribute nothing; if every file is unchanged the placeholder
/// is returned instead of an empty string.
pub fn build_artifact(files: &[(String, String, String)]) -> String {
    let mut artifact = String::new();
    for (path, original, updated) in files {
        if let Some(diff) = unified_diff(path, original, updated) {
            artifact.push_str(&diff);
            if !artifact.ends_with('\n') {
                artifact.push('\n');
            }
        }
    }

    if artifact.trim().is_empty() {
        NO_CHANGES_PLACEHOLDER.to_string()
    } else {
        artifact
    }
}

/// True when the artifact carries no applicable hunks.
pub fn is_empty_artifact(artifact: &str) -> bool {
    let trimmed = artifact.trim();
    trimmed.is_empty() || trimmed == NO_CHANGES_PLACEHOLDER
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diff_carries_git_style_headers() {
        let diff = unified_diff("src/app.txt", "hello\n", "goodbye\n").unwrap();
        assert!(diff.contains("--- a/src/app.txt"));
        assert!(diff.contains("+++ b/src/app.txt"));
        assert!(diff.contains("-hello"));
        assert!(diff.contains("+goodbye"));
    }

    #[test]
    fn identical_contents_produce_no_diff() {
        assert!(unified_diff("x.txt", "same\n", "same\n").is_none());
    }

    #[test]
    fn artifact_for_unchanged_files_is_the_placeholder() {
        let artifact = build_artifact(&[(
            "x.txt".to_string(),
            "same\n".to_string(),
            "same\n".to_string(),
        )]);
        assert_eq!(artifact, NO_CHANGES_PLACEHOLDER);
        assert!(is_empty_artifact(&artifact));
    }

    #[test]
    fn artifact_concatenates_changed_files() {
        let artifact = build_artifact(&[
            ("a.txt".to_string(), "1\n".to_string(), "2\n".to_string()),
            ("b.txt".to_string(), "x\n".to_string(), "x\n".to_string()),
            ("c.txt".to_string(), "old\n".to_string(), "new\n".to_string()),
        ]);
        assert!(artifact.contains("a/a.txt"));
        assert!(!artifact.contains("a/b.txt"));
        assert!(artifact.contains("a/c.txt"));
        assert!(!is_empty_artifact(&artifact));
    }
}
