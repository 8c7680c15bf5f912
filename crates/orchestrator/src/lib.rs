pub mod approval;
pub mod diff;
pub mod error;
pub mod format;
pub mod orchestrator;
pub mod permissions;
pub mod plugin;
pub mod plugins;
pub mod prompts;
pub mod registry;

pub use approval::{ApprovalGateway, DecisionOutcome};
pub use error::{OrchestratorError, Result};
pub use orchestrator::Orchestrator;
pub use permissions::PermissionPolicy;
pub use plugin::Plugin;
pub use plugins::{
    resolve_review, ApplyOutcome, CodeModifierPlugin, MilestonePlugin, ResearchPlugin,
    ResearchTool, ReviewDecision, ReviewOutcome, CODE_MODIFIER_ID, MILESTONE_PLANNER_ID,
    RESEARCHER_ID,
};
pub use registry::PluginRegistry;
