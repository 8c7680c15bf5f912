//! Prompt templates for the model-backed strategies.
//!
//! Both templates demand a strict JSON response; the callers parse that
//! JSON with serde and treat structural surprises as malformed responses.

use std::fmt::Write as _;

/// Meta-prompt for the code-modification strategy. The model sees the
/// goal plus the current contents of every authorized file and must
/// answer with full replacement contents, never fragments.
pub fn code_modification(goal: &str, files: &[(String, String)]) -> String {
    let mut file_block = String::new();
    for (path, content) in files {
        let _ = write!(file_block, "--- FILE: {path} ---\n{content}\n--- END FILE ---\n\n");
    }

    format!(
        r#"You are an expert software engineer. Modify the files below to accomplish the goal.

GOAL:
{goal}

CURRENT FILES:
{file_block}
Respond with a single JSON object and nothing else, using exactly this shape:

{{
  "explanation": "<one paragraph describing what you changed and why>",
  "modifications": [
    {{
      "path": "<repository-relative file path>",
      "new_content": "<the complete new content of the file>"
    }}
  ]
}}

Rules:
- "new_content" must be the ENTIRE file after your change, not a fragment or a diff.
- Only include files that actually need to change.
- If no change is needed, return an empty "modifications" array and explain why.
- Do not invent file paths that were not provided."#
    )
}

/// Prompt for the milestone-planning strategy. The response must be a
/// project plan with an ordered milestone list.
pub fn project_planning(goal: &str) -> String {
    format!(
        r#"You are a pragmatic technical project planner. Produce an execution plan for the objective below.

OBJECTIVE:
{goal}

Respond with a single JSON object and nothing else, using exactly this shape:

{{
  "title": "<short plan title>",
  "summary": "<two or three sentences describing the overall approach>",
  "clarifying_questions": ["<question for the reviewer, if any>"],
  "milestones": [
    {{
      "id": "M1",
      "name": "<milestone name>",
      "description": "<what this milestone delivers>",
      "sub_steps": ["<concrete step>"],
      "tools": ["<tool or capability this milestone relies on>"]
    }}
  ]
}}

Rules:
- Milestones must be ordered and independently reviewable.
- Keep the plan between 2 and 8 milestones.
- "milestones" is required; the other arrays may be empty."#
    )
}

/// Prompt for the research strategy: synthesize tool findings into a
/// readable report.
pub fn research_synthesis(question: &str, findings: &[String]) -> String {
    let mut findings_block = String::new();
    for (i, finding) in findings.iter().enumerate() {
        let _ = writeln!(findings_block, "[{}] {finding}", i + 1);
    }

    format!(
        r#"Answer the question below using only the collected findings. Cite findings by their [number].

QUESTION:
{question}

FINDINGS:
{findings_block}
Write a concise report in plain prose. If the findings are insufficient, say so explicitly."#
    )
}
