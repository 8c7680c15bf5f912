mod permission;
mod task;

pub use permission::PermissionRow;
pub use task::TaskRow;
