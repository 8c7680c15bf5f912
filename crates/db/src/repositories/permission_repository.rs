use crate::error::DbError;
use crate::models::PermissionRow;
use sqlx::SqlitePool;
use taskforge_core::PermissionRule;
use uuid::Uuid;

#[derive(Clone)]
pub struct PermissionRepository {
    pool: SqlitePool,
}

impl PermissionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, rule: &PermissionRule) -> Result<PermissionRule, DbError> {
        let row = PermissionRow::from(rule);

        sqlx::query(
            r#"
            INSERT INTO permission_rules (id, path, comment, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&row.id)
        .bind(&row.path)
        .bind(&row.comment)
        .bind(row.created_at)
        .execute(&self.pool)
        .await?;

        Ok(rule.clone())
    }

    pub async fn find_by_path(&self, path: &str) -> Result<Option<PermissionRule>, DbError> {
        let row: Option<PermissionRow> = sqlx::query_as(
            "SELECT id, path, comment, created_at FROM permission_rules WHERE path = ?",
        )
        .bind(path)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into_domain()))
    }

    pub async fn find_all(&self) -> Result<Vec<PermissionRule>, DbError> {
        let rows: Vec<PermissionRow> = sqlx::query_as(
            "SELECT id, path, comment, created_at FROM permission_rules ORDER BY created_at",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.into_domain()).collect())
    }

    pub async fn delete(&self, id: Uuid) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM permission_rules WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
