use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Pending,
    Analyzing,
    Planning,
    ExecutingMilestone,
    AwaitingReview,
    Applied,
    Rejected,
    Completed,
    Cancelled,
    Error,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Analyzing => "analyzing",
            Self::Planning => "planning",
            Self::ExecutingMilestone => "executing_milestone",
            Self::AwaitingReview => "awaiting_review",
            Self::Applied => "applied",
            Self::Rejected => "rejected",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Error => "error",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "analyzing" => Some(Self::Analyzing),
            "planning" => Some(Self::Planning),
            "executing_milestone" => Some(Self::ExecutingMilestone),
            "awaiting_review" => Some(Self::AwaitingReview),
            "applied" => Some(Self::Applied),
            "rejected" => Some(Self::Rejected),
            "completed" => Some(Self::Completed),
            "cancelled" => Some(Self::Cancelled),
            "error" => Some(Self::Error),
            _ => None,
        }
    }

    /// Terminal states can only be left by re-creating the task.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Applied | Self::Rejected | Self::Completed | Self::Cancelled | Self::Error
        )
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TestStatus {
    #[default]
    NotRun,
    Pass,
    Fail,
}

impl TestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotRun => "not_run",
            Self::Pass => "pass",
            Self::Fail => "fail",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "not_run" => Some(Self::NotRun),
            "pass" => Some(Self::Pass),
            "fail" => Some(Self::Fail),
            _ => None,
        }
    }
}

/// One unit of submitted work, tracked through the status state machine.
///
/// `context` is strategy-private serialized state. It is owned exclusively
/// by the plugin named in `plugin_id`; nothing at this layer interprets it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub prompt: String,
    pub plugin_id: String,
    pub status: TaskStatus,
    /// Comma-separated relative paths, used by the code-modification strategy.
    pub target_files: Option<String>,
    pub explanation: Option<String>,
    pub proposed_diff: Option<String>,
    pub test_status: TestStatus,
    pub test_output: Option<String>,
    pub error_message: Option<String>,
    pub commit_id: Option<String>,
    pub context: Option<String>,
    pub owner: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    pub fn new(prompt: impl Into<String>, plugin_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            prompt: prompt.into(),
            plugin_id: plugin_id.into(),
            status: TaskStatus::default(),
            target_files: None,
            explanation: None,
            proposed_diff: None,
            test_status: TestStatus::default(),
            test_output: None,
            error_message: None,
            commit_id: None,
            context: None,
            owner: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = id;
        self
    }

    pub fn with_target_files(mut self, targets: impl Into<String>) -> Self {
        self.target_files = Some(targets.into());
        self
    }

    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    /// Merge a plugin's partial update. Fields the plugin omitted are
    /// left unchanged.
    pub fn apply(&mut self, update: &TaskUpdate) {
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(explanation) = &update.explanation {
            self.explanation = Some(explanation.clone());
        }
        if let Some(diff) = &update.proposed_diff {
            self.proposed_diff = Some(diff.clone());
        }
        if let Some(test_status) = update.test_status {
            self.test_status = test_status;
        }
        if let Some(output) = &update.test_output {
            self.test_output = Some(output.clone());
        }
        if let Some(message) = &update.error_message {
            self.error_message = Some(message.clone());
        }
        if let Some(commit_id) = &update.commit_id {
            self.commit_id = Some(commit_id.clone());
        }
        if let Some(context) = &update.context {
            self.context = Some(context.clone());
        }
        self.updated_at = Utc::now();
    }
}

/// Sparse update returned by a plugin's `execute`. Any `None` field is
/// left untouched when merged into the task record.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct TaskUpdate {
    pub status: Option<TaskStatus>,
    pub explanation: Option<String>,
    pub proposed_diff: Option<String>,
    pub test_status: Option<TestStatus>,
    pub test_output: Option<String>,
    pub error_message: Option<String>,
    pub commit_id: Option<String>,
    pub context: Option<String>,
}

impl TaskUpdate {
    /// An update that touches nothing. Returned by strategies parked at a
    /// review checkpoint.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: Some(TaskStatus::Error),
            error_message: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_explanation(mut self, explanation: impl Into<String>) -> Self {
        self.explanation = Some(explanation.into());
        self
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_creation() {
        let task = Task::new("Add a greeting function", "code-modifier");

        assert_eq!(task.prompt, "Add a greeting function");
        assert_eq!(task.plugin_id, "code-modifier");
        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.test_status, TestStatus::NotRun);
        assert!(task.context.is_none());
    }

    #[test]
    fn test_status_round_trip() {
        for status in [
            TaskStatus::Pending,
            TaskStatus::AwaitingReview,
            TaskStatus::ExecutingMilestone,
            TaskStatus::Error,
        ] {
            assert_eq!(TaskStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(TaskStatus::parse("bogus"), None);
    }

    #[test]
    fn test_terminal_states() {
        assert!(TaskStatus::Applied.is_terminal());
        assert!(TaskStatus::Rejected.is_terminal());
        assert!(TaskStatus::Cancelled.is_terminal());
        assert!(!TaskStatus::AwaitingReview.is_terminal());
        assert!(!TaskStatus::Pending.is_terminal());
    }

    #[test]
    fn test_apply_merges_sparse_fields() {
        let mut task = Task::new("prompt", "code-modifier");
        task.explanation = Some("original".to_string());

        let update = TaskUpdate {
            status: Some(TaskStatus::AwaitingReview),
            proposed_diff: Some("diff text".to_string()),
            ..Default::default()
        };
        task.apply(&update);

        assert_eq!(task.status, TaskStatus::AwaitingReview);
        assert_eq!(task.proposed_diff.as_deref(), Some("diff text"));
        // Omitted field untouched.
        assert_eq!(task.explanation.as_deref(), Some("original"));
    }

    #[test]
    fn test_empty_update_is_noop() {
        let update = TaskUpdate::none();
        assert!(update.is_empty());

        let mut task = Task::new("prompt", "milestone-planner");
        let before_status = task.status;
        task.apply(&update);
        assert_eq!(task.status, before_status);
    }

    #[test]
    fn test_error_update() {
        let update = TaskUpdate::error("plugin exploded");
        assert_eq!(update.status, Some(TaskStatus::Error));
        assert_eq!(update.error_message.as_deref(), Some("plugin exploded"));
    }
}
