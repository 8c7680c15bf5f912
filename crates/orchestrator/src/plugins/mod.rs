mod code_modifier;
mod milestone;
mod research;

pub use code_modifier::{ApplyOutcome, CodeModifierPlugin, CODE_MODIFIER_ID};
pub use milestone::{resolve_review, MilestonePlugin, ReviewDecision, ReviewOutcome, MILESTONE_PLANNER_ID};
pub use research::{ResearchPlugin, ResearchTool, RESEARCHER_ID};
