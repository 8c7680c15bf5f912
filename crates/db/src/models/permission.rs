use chrono::{TimeZone, Utc};
use taskforge_core::PermissionRule;
use uuid::Uuid;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PermissionRow {
    pub id: String,
    pub path: String,
    pub comment: Option<String>,
    pub created_at: i64,
}

impl PermissionRow {
    pub fn into_domain(self) -> PermissionRule {
        PermissionRule {
            id: Uuid::parse_str(&self.id).unwrap_or_default(),
            path: self.path,
            comment: self.comment,
            created_at: Utc.timestamp_opt(self.created_at, 0).unwrap(),
        }
    }
}

impl From<&PermissionRule> for PermissionRow {
    fn from(rule: &PermissionRule) -> Self {
        Self {
            id: rule.id.to_string(),
            path: rule.path.clone(),
            comment: rule.comment.clone(),
            created_at: rule.created_at.timestamp(),
        }
    }
}
