use chrono::{DateTime, TimeZone, Utc};
use taskforge_core::{Task, TaskStatus, TestStatus};
use uuid::Uuid;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TaskRow {
    pub id: String,
    pub prompt: String,
    pub plugin_id: String,
    pub status: String,
    pub target_files: Option<String>,
    pub explanation: Option<String>,
    pub proposed_diff: Option<String>,
    pub test_status: String,
    pub test_output: Option<String>,
    pub error_message: Option<String>,
    pub commit_id: Option<String>,
    pub context: Option<String>,
    pub owner: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl TaskRow {
    pub fn into_domain(self) -> Task {
        Task {
            id: Uuid::parse_str(&self.id).unwrap_or_default(),
            prompt: self.prompt,
            plugin_id: self.plugin_id,
            status: TaskStatus::parse(&self.status).unwrap_or_default(),
            target_files: self.target_files,
            explanation: self.explanation,
            proposed_diff: self.proposed_diff,
            test_status: TestStatus::parse(&self.test_status).unwrap_or_default(),
            test_output: self.test_output,
            error_message: self.error_message,
            commit_id: self.commit_id,
            context: self.context,
            owner: self.owner,
            created_at: timestamp_to_datetime(self.created_at),
            updated_at: timestamp_to_datetime(self.updated_at),
        }
    }
}

impl From<&Task> for TaskRow {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id.to_string(),
            prompt: task.prompt.clone(),
            plugin_id: task.plugin_id.clone(),
            status: task.status.as_str().to_string(),
            target_files: task.target_files.clone(),
            explanation: task.explanation.clone(),
            proposed_diff: task.proposed_diff.clone(),
            test_status: task.test_status.as_str().to_string(),
            test_output: task.test_output.clone(),
            error_message: task.error_message.clone(),
            commit_id: task.commit_id.clone(),
            context: task.context.clone(),
            owner: task.owner.clone(),
            created_at: datetime_to_timestamp(task.created_at),
            updated_at: datetime_to_timestamp(task.updated_at),
        }
    }
}

fn timestamp_to_datetime(ts: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(ts, 0).single().unwrap_or_default()
}

fn datetime_to_timestamp(dt: DateTime<Utc>) -> i64 {
    dt.timestamp()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stored_timestamps_round_trip() {
        let now = Utc::now();
        let decoded = timestamp_to_datetime(datetime_to_timestamp(now));
        assert_eq!(decoded.timestamp(), now.timestamp());
    }

    #[test]
    fn out_of_range_timestamp_falls_back_instead_of_panicking() {
        assert_eq!(timestamp_to_datetime(i64::MAX), DateTime::<Utc>::default());
        assert_eq!(timestamp_to_datetime(i64::MIN), DateTime::<Utc>::default());
    }
}

