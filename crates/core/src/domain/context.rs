use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Strategy-private state persisted on the task between invocations.
///
/// The orchestrator stores this as an opaque string; only the owning
/// plugin decodes it. Modelling the known variants as a tagged union keeps
/// each strategy's phase fields statically checked.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TaskContext {
    Milestone(MilestoneContext),
}

impl TaskContext {
    pub fn decode(raw: &str) -> Result<Self, CoreError> {
        serde_json::from_str(raw).map_err(|e| CoreError::MalformedContext(e.to_string()))
    }

    pub fn encode(&self) -> String {
        // TaskContext serialization cannot fail: no maps with non-string keys.
        serde_json::to_string(self).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum MilestonePhase {
    #[default]
    Planning,
    AwaitingPlanReview,
    ExecutingMilestone,
    AwaitingMilestoneReview,
    Finalizing,
    Completed,
    Cancelled,
}

impl MilestonePhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Planning => "planning",
            Self::AwaitingPlanReview => "awaiting_plan_review",
            Self::ExecutingMilestone => "executing_milestone",
            Self::AwaitingMilestoneReview => "awaiting_milestone_review",
            Self::Finalizing => "finalizing",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Persisted state of the milestone-planning strategy: current phase, the
/// generated plan, and which milestone is in flight. `milestone_index` is
/// -1 until the first milestone starts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MilestoneContext {
    pub phase: MilestonePhase,
    pub plan: Option<ProjectPlan>,
    pub milestone_index: i32,
}

impl Default for MilestoneContext {
    fn default() -> Self {
        Self {
            phase: MilestonePhase::default(),
            plan: None,
            milestone_index: -1,
        }
    }
}

impl MilestoneContext {
    pub fn milestone_count(&self) -> usize {
        self.plan.as_ref().map(|p| p.milestones.len()).unwrap_or(0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProjectPlan {
    pub title: String,
    pub summary: String,
    #[serde(default)]
    pub clarifying_questions: Vec<String>,
    pub milestones: Vec<Milestone>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Milestone {
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub sub_steps: Vec<String>,
    #[serde(default)]
    pub tools: Vec<String>,
}
