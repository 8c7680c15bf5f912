mod permission_repository;
mod task_repository;

pub use permission_repository::PermissionRepository;
pub use task_repository::TaskRepository;
