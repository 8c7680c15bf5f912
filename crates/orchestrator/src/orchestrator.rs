use std::sync::Arc;

use db::TaskRepository;
use events::{Event, EventBus};
use taskforge_core::{CoreError, Task, TaskStatus, TaskUpdate};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::error::{OrchestratorError, Result};
use crate::registry::PluginRegistry;

/// Drives one task through a strategy invocation.
///
/// A plugin failure never propagates past this boundary: it is persisted
/// on the task as a terminal error status and announced on the event bus.
/// Only infrastructure failures (database, unknown task id) surface as
/// `Err` to the caller.
pub struct Orchestrator {
    registry: Arc<PluginRegistry>,
    tasks: Arc<TaskRepository>,
    events: EventBus,
}

impl Orchestrator {
    pub fn new(registry: Arc<PluginRegistry>, tasks: Arc<TaskRepository>, events: EventBus) -> Self {
        Self { registry, tasks, events }
    }

    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    /// Persist a new task, announce it and kick off execution in the
    /// background.
    pub async fn submit(self: &Arc<Self>, task: Task) -> Result<Task> {
        let task = self.tasks.create(&task).await?;
        info!(task_id = %task.id, plugin_id = %task.plugin_id, "task submitted");

        self.events.publish(Event::TaskCreated {
            task_id: task.id,
            plugin_id: task.plugin_id.clone(),
        });

        self.spawn(task.id);
        Ok(task)
    }

    /// Fire-and-forget execution trigger.
    pub fn spawn(self: &Arc<Self>, task_id: Uuid) {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(e) = this.execute(task_id).await {
                error!(task_id = %task_id, error = %e, "task execution aborted");
            }
        });
    }

    /// Run the task's strategy once and merge its update.
    #[instrument(skip(self), fields(task_id = %task_id))]
    pub async fn execute(&self, task_id: Uuid) -> Result<Task> {
        let task = self
            .tasks
            .find_by_id(task_id)
            .await?
            .ok_or(OrchestratorError::TaskNotFound(task_id))?;

        // A terminal task is done; it never re-enters the state machine.
        if task.status.is_terminal() {
            return Err(CoreError::InvalidStatusTransition {
                from: task.status.as_str().to_string(),
                to: TaskStatus::Analyzing.as_str().to_string(),
            }
            .into());
        }

        let Some(plugin) = self.registry.resolve(&task.plugin_id) else {
            warn!(plugin_id = %task.plugin_id, "no plugin registered for task");
            let update = TaskUpdate::error(format!(
                "No plugin registered with id '{}'",
                task.plugin_id
            ));
            return self.finish(&task, update).await;
        };

        let previous_status = task.status;
        let task = self
            .tasks
            .apply_update(task_id, &TaskUpdate::none().with_status(TaskStatus::Analyzing))
            .await?;

        let update = match plugin.execute(&task).await {
            Ok(update) if update.is_empty() => {
                // Strategy is parked (e.g. waiting on review); put the
                // pre-invocation status back instead of leaving "analyzing".
                info!(plugin_id = %task.plugin_id, "plugin returned a no-op update");
                TaskUpdate::none().with_status(previous_status)
            }
            Ok(update) => update,
            Err(e) => {
                error!(plugin_id = %task.plugin_id, error = %e, "plugin execution failed");
                TaskUpdate::error(format!("Plugin execution failed: {e}"))
            }
        };

        self.finish(&task, update).await
    }

    /// Merge the update, then publish the resulting transitions.
    async fn finish(&self, task: &Task, update: TaskUpdate) -> Result<Task> {
        let updated = self.tasks.apply_update(task.id, &update).await?;

        if updated.status != task.status {
            self.events.publish(Event::TaskStatusChanged {
                task_id: updated.id,
                from_status: task.status.as_str().to_string(),
                to_status: updated.status.as_str().to_string(),
            });
        }

        match updated.status {
            TaskStatus::AwaitingReview => {
                self.events.publish(Event::TaskAwaitingReview {
                    task_id: updated.id,
                    plugin_id: updated.plugin_id.clone(),
                });
            }
            TaskStatus::Error => {
                self.events.publish(Event::TaskFailed {
                    task_id: updated.id,
                    message: updated
                        .error_message
                        .clone()
                        .unwrap_or_else(|| "unknown error".to_string()),
                });
            }
            _ => {}
        }

        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::Plugin;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct RecordingPlugin {
        id: &'static str,
        calls: Arc<AtomicUsize>,
        result: fn() -> Result<TaskUpdate>,
    }

    #[async_trait]
    impl Plugin for RecordingPlugin {
        fn id(&self) -> &'static str {
            self.id
        }
        fn name(&self) -> &'static str {
            "Recording"
        }
        fn description(&self) -> &'static str {
            "test double"
        }
        async fn execute(&self, _task: &Task) -> Result<TaskUpdate> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (self.result)()
        }
    }

    async fn harness(
        plugins: Vec<Arc<dyn Plugin>>,
    ) -> (Arc<Orchestrator>, Arc<TaskRepository>, EventBus) {
        let pool = db::create_pool("sqlite::memory:").await.unwrap();
        db::run_migrations(&pool).await.unwrap();
        let tasks = Arc::new(TaskRepository::new(pool));

        let mut registry = PluginRegistry::new();
        for plugin in plugins {
            registry.register(plugin);
        }

        let events = EventBus::new();
        let orchestrator = Arc::new(Orchestrator::new(
            Arc::new(registry),
            Arc::clone(&tasks),
            events.clone(),
        ));
        (orchestrator, tasks, events)
    }

    #[tokio::test]
    async fn unresolvable_plugin_becomes_a_persisted_error() {
        let calls = Arc::new(AtomicUsize::new(0));
        let plugin = Arc::new(RecordingPlugin {
            id: "registered",
            calls: Arc::clone(&calls),
            result: || Ok(TaskUpdate::none()),
        });
        let (orchestrator, tasks, _events) = harness(vec![plugin]).await;

        let task = tasks.create(&Task::new("p", "missing-plugin")).await.unwrap();
        let result = orchestrator.execute(task.id).await.unwrap();

        assert_eq!(result.status, TaskStatus::Error);
        assert!(result.error_message.unwrap().contains("missing-plugin"));
        // The registered plugin was never consulted.
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn successful_update_is_merged() {
        let plugin = Arc::new(RecordingPlugin {
            id: "ok-plugin",
            calls: Arc::new(AtomicUsize::new(0)),
            result: || {
                Ok(TaskUpdate::none()
                    .with_status(TaskStatus::Completed)
                    .with_explanation("done"))
            },
        });
        let (orchestrator, tasks, _events) = harness(vec![plugin]).await;

        let task = tasks.create(&Task::new("p", "ok-plugin")).await.unwrap();
        let result = orchestrator.execute(task.id).await.unwrap();

        assert_eq!(result.status, TaskStatus::Completed);
        assert_eq!(result.explanation.as_deref(), Some("done"));
    }

    #[tokio::test]
    async fn plugin_error_is_data_not_a_crash() {
        let plugin = Arc::new(RecordingPlugin {
            id: "broken",
            calls: Arc::new(AtomicUsize::new(0)),
            result: || Err(OrchestratorError::InvalidInput("boom".to_string())),
        });
        let (orchestrator, tasks, _events) = harness(vec![plugin]).await;

        let task = tasks.create(&Task::new("p", "broken")).await.unwrap();
        let result = orchestrator.execute(task.id).await.unwrap();

        assert_eq!(result.status, TaskStatus::Error);
        assert!(result.error_message.unwrap().contains("boom"));
    }

    #[tokio::test]
    async fn empty_update_restores_previous_status() {
        let plugin = Arc::new(RecordingPlugin {
            id: "parked",
            calls: Arc::new(AtomicUsize::new(0)),
            result: || Ok(TaskUpdate::none()),
        });
        let (orchestrator, tasks, _events) = harness(vec![plugin]).await;

        let mut task = Task::new("p", "parked");
        task.status = TaskStatus::AwaitingReview;
        let task = tasks.create(&task).await.unwrap();

        let result = orchestrator.execute(task.id).await.unwrap();
        assert_eq!(result.status, TaskStatus::AwaitingReview);
    }

    #[tokio::test]
    async fn submit_persists_and_announces_the_task() {
        let plugin = Arc::new(RecordingPlugin {
            id: "ok-plugin",
            calls: Arc::new(AtomicUsize::new(0)),
            result: || Ok(TaskUpdate::none().with_status(TaskStatus::Completed)),
        });
        let (orchestrator, tasks, events) = harness(vec![plugin]).await;
        let mut rx = events.subscribe();

        let task = orchestrator.submit(Task::new("p", "ok-plugin")).await.unwrap();
        assert!(tasks.find_by_id(task.id).await.unwrap().is_some());

        let envelope = rx.recv().await.unwrap();
        assert!(matches!(
            envelope.event,
            Event::TaskCreated { task_id, .. } if task_id == task.id
        ));
    }

    #[tokio::test]
    async fn terminal_task_is_never_re_executed() {
        let calls = Arc::new(AtomicUsize::new(0));
        let plugin = Arc::new(RecordingPlugin {
            id: "done-plugin",
            calls: Arc::clone(&calls),
            result: || Ok(TaskUpdate::none().with_status(TaskStatus::Completed)),
        });
        let (orchestrator, tasks, _events) = harness(vec![plugin]).await;

        let mut task = Task::new("p", "done-plugin");
        task.status = TaskStatus::Applied;
        let task = tasks.create(&task).await.unwrap();

        let err = orchestrator.execute(task.id).await.unwrap_err();
        assert!(matches!(
            err,
            OrchestratorError::Core(CoreError::InvalidStatusTransition { .. })
        ));

        let reloaded = tasks.find_by_id(task.id).await.unwrap().unwrap();
        assert_eq!(reloaded.status, TaskStatus::Applied);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unknown_task_id_is_an_error() {
        let (orchestrator, _tasks, _events) = harness(vec![]).await;
        let err = orchestrator.execute(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, OrchestratorError::TaskNotFound(_)));
    }
}
