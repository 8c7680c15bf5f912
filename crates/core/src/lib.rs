pub mod domain;
pub mod error;

pub use domain::context::{
    Milestone, MilestoneContext, MilestonePhase, ProjectPlan, TaskContext,
};
pub use domain::permission::PermissionRule;
pub use domain::plugin::PluginDescriptor;
pub use domain::task::{Task, TaskStatus, TaskUpdate, TestStatus};
pub use error::CoreError;
