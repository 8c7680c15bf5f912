use std::fmt::Write as _;
use std::sync::Arc;

use async_trait::async_trait;
use llm::TextGenerator;
use taskforge_core::{
    Milestone, MilestoneContext, MilestonePhase, ProjectPlan, Task, TaskContext, TaskStatus,
    TaskUpdate,
};
use tracing::{info, warn};

use crate::error::{OrchestratorError, Result};
use crate::plugin::Plugin;
use crate::prompts;

pub const MILESTONE_PLANNER_ID: &str = "milestone-planner";

/// Operator verdict on a pending plan or milestone review.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewDecision {
    Approve,
    Skip,
    Cancel,
    Replan,
}

impl ReviewDecision {
    /// Maps free-form operator intent onto a decision. `None` means the
    /// intent was not recognized and the phase must stay unchanged.
    pub fn parse(intent: &str) -> Option<Self> {
        match intent.trim().to_ascii_lowercase().as_str() {
            "approve" | "continue" => Some(Self::Approve),
            "skip" => Some(Self::Skip),
            "stop" | "cancel" => Some(Self::Cancel),
            "replan" | "modify" => Some(Self::Replan),
            _ => None,
        }
    }
}

/// What the approval surface should do after a decision is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewOutcome {
    /// Re-submit the task so the next phase runs.
    Resume,
    /// The operator cancelled; the task is terminal.
    Cancelled,
}

/// Advance the context according to an operator decision. Only valid in
/// the two review phases.
pub fn resolve_review(
    ctx: &mut MilestoneContext,
    decision: ReviewDecision,
) -> Result<ReviewOutcome> {
    if !matches!(
        ctx.phase,
        MilestonePhase::AwaitingPlanReview | MilestonePhase::AwaitingMilestoneReview
    ) {
        return Err(OrchestratorError::InvalidInput(format!(
            "no review pending in phase '{}'",
            ctx.phase.as_str()
        )));
    }

    match decision {
        ReviewDecision::Approve => {
            ctx.phase = MilestonePhase::ExecutingMilestone;
            Ok(ReviewOutcome::Resume)
        }
        ReviewDecision::Skip => {
            // The entry being skipped is the one that would run next.
            let next = ctx.milestone_index + 1;
            if next as usize >= ctx.milestone_count() {
                ctx.phase = MilestonePhase::Finalizing;
            } else {
                ctx.milestone_index = next;
                ctx.phase = MilestonePhase::ExecutingMilestone;
            }
            Ok(ReviewOutcome::Resume)
        }
        ReviewDecision::Cancel => {
            ctx.phase = MilestonePhase::Cancelled;
            Ok(ReviewOutcome::Cancelled)
        }
        ReviewDecision::Replan => {
            // Discard the plan entirely; the next run starts planning fresh.
            *ctx = MilestoneContext::default();
            Ok(ReviewOutcome::Resume)
        }
    }
}

/// Long-running strategy that turns an objective into a reviewed project
/// plan and walks the plan milestone by milestone, pausing for operator
/// review between each one. All phase state lives in the task context.
pub struct MilestonePlugin {
    llm: Arc<dyn TextGenerator>,
}

impl MilestonePlugin {
    pub fn new(llm: Arc<dyn TextGenerator>) -> Self {
        Self { llm }
    }

    fn load_context(task: &Task) -> MilestoneContext {
        match task.context.as_deref() {
            None => MilestoneContext::default(),
            Some(raw) => match TaskContext::decode(raw) {
                Ok(TaskContext::Milestone(ctx)) => ctx,
                Err(e) => {
                    warn!(task_id = %task.id, error = %e, "unreadable context, starting over");
                    MilestoneContext::default()
                }
            },
        }
    }

    fn save(ctx: MilestoneContext) -> String {
        TaskContext::Milestone(ctx).encode()
    }

    async fn phase_planning(&self, task: &Task) -> Result<TaskUpdate> {
        let prompt = prompts::project_planning(&task.prompt);
        let value = self.llm.generate_json(&prompt).await?;

        // A plan without a milestones array is useless; that is a hard
        // failure, not something to park for review.
        let plan: ProjectPlan = serde_json::from_value(value)
            .map_err(|e| OrchestratorError::MalformedResponse(e.to_string()))?;

        info!(task_id = %task.id, milestones = plan.milestones.len(), "plan generated");

        let rendered = render_plan(&plan);
        let ctx = MilestoneContext {
            phase: MilestonePhase::AwaitingPlanReview,
            plan: Some(plan),
            milestone_index: -1,
        };

        Ok(TaskUpdate::none()
            .with_status(TaskStatus::AwaitingReview)
            .with_explanation(rendered)
            .with_context(Self::save(ctx)))
    }

    fn phase_executing(&self, task: &Task, mut ctx: MilestoneContext) -> Result<TaskUpdate> {
        let Some(plan) = ctx.plan.clone() else {
            return Err(OrchestratorError::InvalidInput(
                "cannot execute milestones without a plan".to_string(),
            ));
        };

        ctx.milestone_index += 1;
        let index = ctx.milestone_index;

        if index as usize >= plan.milestones.len() {
            ctx.phase = MilestonePhase::Finalizing;
            return Ok(self.phase_finalizing(ctx));
        }

        let milestone = &plan.milestones[index as usize];
        info!(task_id = %task.id, milestone = %milestone.id, "executing milestone");
        let summary = execute_milestone(milestone);

        if index as usize == plan.milestones.len() - 1 {
            // No review gap after the last milestone; nothing would ever
            // re-invoke the plugin, so finalize in the same run.
            ctx.phase = MilestonePhase::Finalizing;
            let mut done = self.phase_finalizing(ctx);
            done.explanation = Some(match done.explanation.take() {
                Some(tail) => format!("{summary}\n{tail}"),
                None => summary,
            });
            return Ok(done);
        }

        ctx.phase = MilestonePhase::AwaitingMilestoneReview;
        Ok(TaskUpdate::none()
            .with_status(TaskStatus::AwaitingReview)
            .with_explanation(summary)
            .with_context(Self::save(ctx)))
    }

    fn phase_finalizing(&self, mut ctx: MilestoneContext) -> TaskUpdate {
        ctx.phase = MilestonePhase::Completed;
        let title = ctx
            .plan
            .as_ref()
            .map(|p| p.title.clone())
            .unwrap_or_else(|| "the plan".to_string());

        TaskUpdate::none()
            .with_status(TaskStatus::Completed)
            .with_explanation(format!("All milestones of '{title}' are done."))
            .with_context(Self::save(ctx))
    }
}

#[async_trait]
impl Plugin for MilestonePlugin {
    fn id(&self) -> &'static str {
        MILESTONE_PLANNER_ID
    }

    fn name(&self) -> &'static str {
        "Milestone Planner"
    }

    fn description(&self) -> &'static str {
        "Plans an objective into reviewable milestones and executes them \
         one at a time, pausing for operator review between phases."
    }

    async fn execute(&self, task: &Task) -> Result<TaskUpdate> {
        let ctx = Self::load_context(task);

        match ctx.phase {
            MilestonePhase::Planning => self.phase_planning(task).await,

            // Parked: nothing changes until the operator decides.
            MilestonePhase::AwaitingPlanReview | MilestonePhase::AwaitingMilestoneReview => {
                Ok(TaskUpdate::none())
            }

            MilestonePhase::ExecutingMilestone => self.phase_executing(task, ctx),

            MilestonePhase::Finalizing => Ok(self.phase_finalizing(ctx)),

            // Terminal phases reassert their status, idempotently.
            MilestonePhase::Completed => Ok(TaskUpdate::none()
                .with_status(TaskStatus::Completed)
                .with_context(Self::save(ctx))),
            MilestonePhase::Cancelled => Ok(TaskUpdate::none()
                .with_status(TaskStatus::Cancelled)
                .with_context(Self::save(ctx))),
        }
    }
}

fn render_plan(plan: &ProjectPlan) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Plan: {}", plan.title);
    let _ = writeln!(out, "{}", plan.summary);
    if !plan.clarifying_questions.is_empty() {
        let _ = writeln!(out, "\nOpen questions:");
        for q in &plan.clarifying_questions {
            let _ = writeln!(out, "  - {q}");
        }
    }
    let _ = writeln!(out, "\nMilestones:");
    for (i, m) in plan.milestones.iter().enumerate() {
        let _ = writeln!(out, "  {}. [{}] {} - {}", i + 1, m.id, m.name, m.description);
    }
    out
}

/// Milestone execution is currently a narrated simulation: the summary
/// names the milestone, its steps and the tool it would use. Real tool
/// dispatch hangs off this seam.
fn execute_milestone(milestone: &Milestone) -> String {
    let tool = milestone
        .tools
        .first()
        .map(String::as_str)
        .unwrap_or("general reasoning");

    let mut out = String::new();
    let _ = writeln!(
        out,
        "Executed milestone [{}] {} using {tool}.",
        milestone.id, milestone.name
    );
    let _ = writeln!(out, "{}", milestone.description);
    for step in &milestone.sub_steps {
        let _ = writeln!(out, "  - {step}");
    }
    out
}
