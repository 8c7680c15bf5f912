use std::sync::Arc;

use db::TaskRepository;
use events::{Event, EventBus};
use taskforge_core::{Task, TaskContext, TaskStatus, TaskUpdate};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{OrchestratorError, Result};
use crate::orchestrator::Orchestrator;
use crate::plugins::{
    resolve_review, ApplyOutcome, CodeModifierPlugin, ReviewDecision, ReviewOutcome,
    CODE_MODIFIER_ID, MILESTONE_PLANNER_ID,
};

/// Result of routing an operator decision to a phased strategy.
#[derive(Debug)]
pub enum DecisionOutcome {
    /// The phase advanced; execution was re-queued where applicable.
    Advanced(Task),
    /// The intent was not recognized; nothing changed.
    Unrecognized { task: Task, message: String },
}

/// Human review surface. All transitions out of `awaiting_review` go
/// through here: plain approval or rejection for single-shot strategies,
/// phase decisions for the milestone planner.
pub struct ApprovalGateway {
    orchestrator: Arc<Orchestrator>,
    tasks: Arc<TaskRepository>,
    events: EventBus,
    /// Concrete handle for the apply step, which is not part of the
    /// plugin contract. Absent when no repository is configured.
    code_modifier: Option<Arc<CodeModifierPlugin>>,
}

impl ApprovalGateway {
    pub fn new(
        orchestrator: Arc<Orchestrator>,
        tasks: Arc<TaskRepository>,
        events: EventBus,
        code_modifier: Option<Arc<CodeModifierPlugin>>,
    ) -> Self {
        Self { orchestrator, tasks, events, code_modifier }
    }

    async fn load_reviewable(&self, task_id: Uuid) -> Result<Task> {
        let task = self
            .tasks
            .find_by_id(task_id)
            .await?
            .ok_or(OrchestratorError::TaskNotFound(task_id))?;

        if task.status != TaskStatus::AwaitingReview {
            return Err(OrchestratorError::NotAwaitingReview {
                task_id,
                status: task.status.as_str().to_string(),
            });
        }
        Ok(task)
    }

    /// Approve a task parked at review.
    ///
    /// For the code modifier this applies and commits the reviewed diff;
    /// for the milestone planner it is shorthand for the `approve`
    /// decision; anything else just moves to `applied`.
    pub async fn approve(&self, task_id: Uuid, approver: &str) -> Result<Task> {
        let task = self.load_reviewable(task_id).await?;

        match task.plugin_id.as_str() {
            CODE_MODIFIER_ID => self.approve_code_modification(task, approver).await,
            MILESTONE_PLANNER_ID => match self.decide(task_id, "approve").await? {
                DecisionOutcome::Advanced(task) => Ok(task),
                DecisionOutcome::Unrecognized { .. } => {
                    unreachable!("'approve' is always a recognized decision")
                }
            },
            _ => {
                let updated = self
                    .tasks
                    .apply_update(task_id, &TaskUpdate::none().with_status(TaskStatus::Applied))
                    .await?;
                self.publish_transition(&task, &updated);
                Ok(updated)
            }
        }
    }

    async fn approve_code_modification(&self, task: Task, approver: &str) -> Result<Task> {
        let plugin = self.code_modifier.as_ref().ok_or_else(|| {
            OrchestratorError::PluginNotFound(CODE_MODIFIER_ID.to_string())
        })?;

        match plugin.apply_approved(&task, approver).await {
            Ok(outcome) => {
                let update = match outcome {
                    ApplyOutcome::Committed(sha) => TaskUpdate {
                        status: Some(TaskStatus::Applied),
                        commit_id: Some(sha),
                        ..TaskUpdate::default()
                    },
                    ApplyOutcome::NothingToCommit => {
                        info!(task_id = %task.id, "approved with nothing to commit");
                        TaskUpdate::none().with_status(TaskStatus::Applied)
                    }
                };
                let updated = self.tasks.apply_update(task.id, &update).await?;
                self.publish_transition(&task, &updated);
                Ok(updated)
            }
            Err(e) => {
                warn!(task_id = %task.id, error = %e, "apply of approved changes failed");
                let update = TaskUpdate::error(format!("Applying approved changes failed: {e}"));
                let updated = self.tasks.apply_update(task.id, &update).await?;
                self.publish_transition(&task, &updated);
                Err(e)
            }
        }
    }

    /// Reject a task parked at review. Terminal for every strategy.
    pub async fn reject(&self, task_id: Uuid) -> Result<Task> {
        let task = self.load_reviewable(task_id).await?;
        let updated = self
            .tasks
            .apply_update(task_id, &TaskUpdate::none().with_status(TaskStatus::Rejected))
            .await?;
        self.publish_transition(&task, &updated);
        Ok(updated)
    }

    /// Route a free-form operator decision to a phased strategy.
    /// Unrecognized intent is reported back, never treated as an error.
    pub async fn decide(&self, task_id: Uuid, intent: &str) -> Result<DecisionOutcome> {
        let task = self.load_reviewable(task_id).await?;

        if task.plugin_id != MILESTONE_PLANNER_ID {
            return Err(OrchestratorError::InvalidInput(format!(
                "plugin '{}' does not take phase decisions",
                task.plugin_id
            )));
        }

        let Some(decision) = ReviewDecision::parse(intent) else {
            return Ok(DecisionOutcome::Unrecognized {
                task,
                message: format!(
                    "Unrecognized decision '{intent}'. Use approve, skip, stop or replan."
                ),
            });
        };

        let raw = task.context.as_deref().ok_or_else(|| {
            OrchestratorError::InvalidInput("task has no pending plan to decide on".to_string())
        })?;
        let TaskContext::Milestone(mut ctx) = TaskContext::decode(raw)?;

        let outcome = resolve_review(&mut ctx, decision)?;
        let status = match outcome {
            ReviewOutcome::Cancelled => TaskStatus::Cancelled,
            ReviewOutcome::Resume => match ctx.phase {
                taskforge_core::MilestonePhase::Planning => TaskStatus::Planning,
                _ => TaskStatus::ExecutingMilestone,
            },
        };

        let update = TaskUpdate::none()
            .with_status(status)
            .with_context(TaskContext::Milestone(ctx).encode());
        let updated = self.tasks.apply_update(task_id, &update).await?;
        self.publish_transition(&task, &updated);

        if outcome == ReviewOutcome::Resume {
            info!(task_id = %task_id, decision = ?decision, "decision accepted, resuming");
            // Run the next phase to its checkpoint before returning. A
            // short-lived caller (the CLI) exits right after this; a
            // detached run would be cancelled with the runtime.
            let resumed = self.orchestrator.execute(task_id).await?;
            return Ok(DecisionOutcome::Advanced(resumed));
        }

        Ok(DecisionOutcome::Advanced(updated))
    }

    fn publish_transition(&self, before: &Task, after: &Task) {
        if after.status != before.status {
            self.events.publish(Event::TaskStatusChanged {
                task_id: after.id,
                from_status: before.status.as_str().to_string(),
                to_status: after.status.as_str().to_string(),
            });
        }
        if after.status == TaskStatus::Error {
            self.events.publish(Event::TaskFailed {
                task_id: after.id,
                message: after
                    .error_message
                    .clone()
                    .unwrap_or_else(|| "unknown error".to_string()),
            });
        }
    }
}
