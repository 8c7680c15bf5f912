use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("Plugin not found: {0}")]
    PluginNotFound(String),

    #[error("Task not found: {0}")]
    TaskNotFound(Uuid),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Permission denied for '{0}'. Add this path, or a parent directory ending with '/', to the allow-list.")]
    PermissionDenied(String),

    #[error("Task {task_id} is not awaiting review (status: {status})")]
    NotAwaitingReview { task_id: Uuid, status: String },

    #[error("Task has no proposed changes to apply")]
    NothingToApply,

    #[error("Malformed model response: {0}")]
    MalformedResponse(String),

    #[error("Model capability error: {0}")]
    Llm(#[from] llm::LlmError),

    #[error("Version control error: {0}")]
    Vcs(#[from] vcs::VcsError),

    #[error("Database error: {0}")]
    Database(#[from] db::DbError),

    #[error("{0}")]
    Core(#[from] taskforge_core::CoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, OrchestratorError>;
