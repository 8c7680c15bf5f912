pub mod context;
pub mod permission;
pub mod plugin;
pub mod task;
