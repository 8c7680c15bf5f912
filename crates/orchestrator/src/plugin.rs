use async_trait::async_trait;
use taskforge_core::{PluginDescriptor, Task, TaskUpdate};

use crate::error::Result;

/// The polymorphic strategy contract.
///
/// `execute` returns a sparse [`TaskUpdate`]; the orchestrator merges it
/// into the task record and persists an `Err` as a terminal error status.
/// Failure crosses this boundary as data, not as a panic.
#[async_trait]
pub trait Plugin: Send + Sync {
    /// Stable machine key used to select this strategy.
    fn id(&self) -> &'static str;

    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    fn descriptor(&self) -> PluginDescriptor {
        PluginDescriptor::new(self.id(), self.name(), self.description())
    }

    async fn execute(&self, task: &Task) -> Result<TaskUpdate>;
}
