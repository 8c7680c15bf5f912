use std::sync::Arc;

use async_trait::async_trait;
use llm::TextGenerator;
use taskforge_core::{Task, TaskStatus, TaskUpdate};
use tracing::{info, warn};

use crate::error::{OrchestratorError, Result};
use crate::plugin::Plugin;
use crate::prompts;

pub const RESEARCHER_ID: &str = "researcher";

/// A read-only information source the researcher can query.
#[async_trait]
pub trait ResearchTool: Send + Sync {
    fn name(&self) -> &str;

    async fn lookup(&self, query: &str) -> Result<Vec<String>>;
}

/// Read-only strategy: queries its tools for the task prompt and
/// synthesizes the findings into a report. Never touches the repository,
/// so the result needs no review and completes in one invocation.
pub struct ResearchPlugin {
    llm: Arc<dyn TextGenerator>,
    tools: Vec<Arc<dyn ResearchTool>>,
}

impl ResearchPlugin {
    pub fn new(llm: Arc<dyn TextGenerator>, tools: Vec<Arc<dyn ResearchTool>>) -> Self {
        Self { llm, tools }
    }
}

#[async_trait]
impl Plugin for ResearchPlugin {
    fn id(&self) -> &'static str {
        RESEARCHER_ID
    }

    fn name(&self) -> &'static str {
        "Researcher"
    }

    fn description(&self) -> &'static str {
        "Answers a question by querying read-only research tools and \
         synthesizing their findings into a report."
    }

    async fn execute(&self, task: &Task) -> Result<TaskUpdate> {
        let question = task.prompt.trim();
        if question.is_empty() {
            return Err(OrchestratorError::InvalidInput(
                "research task has an empty prompt".to_string(),
            ));
        }

        let mut findings = Vec::new();
        for tool in &self.tools {
            match tool.lookup(question).await {
                Ok(results) => {
                    info!(tool = tool.name(), count = results.len(), "tool findings collected");
                    findings.extend(results);
                }
                // One broken tool should not sink the whole task.
                Err(e) => warn!(tool = tool.name(), error = %e, "research tool failed"),
            }
        }

        if findings.is_empty() {
            return Ok(TaskUpdate::none()
                .with_status(TaskStatus::Completed)
                .with_explanation("No findings. Every configured tool came back empty."));
        }

        let prompt = prompts::research_synthesis(question, &findings);
        let report = self.llm.generate_text(&prompt).await?;

        Ok(TaskUpdate::none()
            .with_status(TaskStatus::Completed)
            .with_explanation(report))
    }
}
