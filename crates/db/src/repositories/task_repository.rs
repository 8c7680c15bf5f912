use crate::error::DbError;
use crate::models::TaskRow;
use chrono::Utc;
use sqlx::SqlitePool;
use taskforge_core::{Task, TaskUpdate};
use uuid::Uuid;

#[derive(Clone)]
pub struct TaskRepository {
    pool: SqlitePool,
}

impl TaskRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, task: &Task) -> Result<Task, DbError> {
        let row = TaskRow::from(task);

        sqlx::query(
            r#"
            INSERT INTO tasks (id, prompt, plugin_id, status, target_files, explanation,
                               proposed_diff, test_status, test_output, error_message,
                               commit_id, context, owner, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&row.id)
        .bind(&row.prompt)
        .bind(&row.plugin_id)
        .bind(&row.status)
        .bind(&row.target_files)
        .bind(&row.explanation)
        .bind(&row.proposed_diff)
        .bind(&row.test_status)
        .bind(&row.test_output)
        .bind(&row.error_message)
        .bind(&row.commit_id)
        .bind(&row.context)
        .bind(&row.owner)
        .bind(row.created_at)
        .bind(row.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(task.clone())
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Task>, DbError> {
        let row: Option<TaskRow> = sqlx::query_as(
            r#"
            SELECT id, prompt, plugin_id, status, target_files, explanation,
                   proposed_diff, test_status, test_output, error_message,
                   commit_id, context, owner, created_at, updated_at
            FROM tasks
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into_domain()))
    }

    pub async fn find_all(&self) -> Result<Vec<Task>, DbError> {
        let rows: Vec<TaskRow> = sqlx::query_as(
            r#"
            SELECT id, prompt, plugin_id, status, target_files, explanation,
                   proposed_diff, test_status, test_output, error_message,
                   commit_id, context, owner, created_at, updated_at
            FROM tasks
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.into_domain()).collect())
    }

    /// Merge a sparse plugin update into the stored task and persist it.
    pub async fn apply_update(&self, id: Uuid, update: &TaskUpdate) -> Result<Task, DbError> {
        let existing = self.find_by_id(id).await?;
        let Some(mut task) = existing else {
            return Err(DbError::TaskNotFound(id));
        };

        task.apply(update);
        task.updated_at = Utc::now();
        let row = TaskRow::from(&task);

        sqlx::query(
            r#"
            UPDATE tasks
            SET status = ?, explanation = ?, proposed_diff = ?, test_status = ?,
                test_output = ?, error_message = ?, commit_id = ?, context = ?,
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&row.status)
        .bind(&row.explanation)
        .bind(&row.proposed_diff)
        .bind(&row.test_status)
        .bind(&row.test_output)
        .bind(&row.error_message)
        .bind(&row.commit_id)
        .bind(&row.context)
        .bind(row.updated_at)
        .bind(&row.id)
        .execute(&self.pool)
        .await?;

        Ok(task)
    }

    pub async fn delete(&self, id: Uuid) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{create_pool, run_migrations};
    use taskforge_core::{TaskStatus, TestStatus};

    async fn setup_test_db() -> SqlitePool {
        let pool = create_pool("sqlite::memory:").await.unwrap();
        run_migrations(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn test_create_and_find_task() {
        let pool = setup_test_db().await;
        let repo = TaskRepository::new(pool);

        let task = Task::new("Add a greeting", "code-modifier")
            .with_target_files("src/lib.rs");
        repo.create(&task).await.unwrap();

        let found = repo.find_by_id(task.id).await.unwrap().unwrap();
        assert_eq!(found.prompt, "Add a greeting");
        assert_eq!(found.plugin_id, "code-modifier");
        assert_eq!(found.target_files.as_deref(), Some("src/lib.rs"));
        assert_eq!(found.status, TaskStatus::Pending);
    }

    #[tokio::test]
    async fn test_find_all_tasks() {
        let pool = setup_test_db().await;
        let repo = TaskRepository::new(pool);

        repo.create(&Task::new("one", "researcher")).await.unwrap();
        repo.create(&Task::new("two", "researcher")).await.unwrap();

        let all = repo.find_all().await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn test_apply_update_merges_and_persists() {
        let pool = setup_test_db().await;
        let repo = TaskRepository::new(pool);

        let task = Task::new("change it", "code-modifier");
        repo.create(&task).await.unwrap();

        let update = TaskUpdate {
            status: Some(TaskStatus::AwaitingReview),
            explanation: Some("did the thing".to_string()),
            test_status: Some(TestStatus::Pass),
            ..Default::default()
        };
        let updated = repo.apply_update(task.id, &update).await.unwrap();
        assert_eq!(updated.status, TaskStatus::AwaitingReview);

        let reloaded = repo.find_by_id(task.id).await.unwrap().unwrap();
        assert_eq!(reloaded.status, TaskStatus::AwaitingReview);
        assert_eq!(reloaded.explanation.as_deref(), Some("did the thing"));
        assert_eq!(reloaded.test_status, TestStatus::Pass);
        // Untouched field survives the merge.
        assert_eq!(reloaded.prompt, "change it");
    }

    #[tokio::test]
    async fn test_apply_update_unknown_task() {
        let pool = setup_test_db().await;
        let repo = TaskRepository::new(pool);

        let err = repo
            .apply_update(Uuid::new_v4(), &TaskUpdate::none())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::TaskNotFound(_)));
    }

    #[tokio::test]
    async fn test_delete_task() {
        let pool = setup_test_db().await;
        let repo = TaskRepository::new(pool);

        let task = Task::new("to delete", "researcher");
        repo.create(&task).await.unwrap();

        assert!(repo.delete(task.id).await.unwrap());
        assert!(repo.find_by_id(task.id).await.unwrap().is_none());
    }
}
