use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One entry of the path allow-list consulted before any file access.
///
/// A path ending with `/` is a directory rule and allows everything under
/// it; any other path must match exactly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PermissionRule {
    pub id: Uuid,
    pub path: String,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl PermissionRule {
    pub fn new(path: impl Into<String>, comment: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            path: path.into(),
            comment,
            created_at: Utc::now(),
        }
    }

    pub fn is_directory_rule(&self) -> bool {
        self.path.ends_with('/')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directory_rule_detection() {
        assert!(PermissionRule::new("src/", None).is_directory_rule());
        assert!(!PermissionRule::new("src/main.rs", None).is_directory_rule());
    }
}
