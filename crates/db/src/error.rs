use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database query failed: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("Schema migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("No task row with id {0}")]
    TaskNotFound(Uuid),

    #[error("No permission rule with id {0}")]
    PermissionNotFound(Uuid),
}
