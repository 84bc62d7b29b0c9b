use std::sync::Arc;

use futures::future::BoxFuture;
use tracing::debug;

use gamma_core::error::{GammaError, Result};
use gamma_core::traits::{LlmClient, Planner};
use gamma_core::types::{ChatMessage, PlanStep, StepStatus};

const PLANNER_PROMPT: &str = "You are a planning assistant. Break the user's goal into a short \
ordered list of concrete steps. Respond with ONLY a JSON array of strings, one per step, \
nothing else. Example: [\"Search for X\", \"Summarize the findings\"]";

const SUBTASK_PROMPT: &str = "You are a planning assistant. Break the given parent task into \
smaller subtasks. Respond with ONLY a JSON array of strings, one per subtask, nothing else.";

const REPLAN_PROMPT: &str = "You are a planning assistant. A step in the current plan failed. \
Generate a NEW JSON array of step strings that recovers from the failure and completes the \
goal, starting from the failed step. Respond with ONLY the JSON array, nothing else.";

/// Planner that asks an LLM to decompose a goal into ordered steps.
pub struct LlmPlanner {
    llm: Arc<dyn LlmClient>,
}

impl LlmPlanner {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }
}

impl Planner for LlmPlanner {
    fn create_plan(&self, goal: &str) -> BoxFuture<'_, Result<Vec<PlanStep>>> {
        let goal = goal.to_string();
        Box::pin(async move {
            let messages = vec![
                ChatMessage::system(PLANNER_PROMPT),
                ChatMessage::user(goal),
            ];

            let response = self
                .llm
                .chat(messages, &[])
                .await
                .map_err(|e| GammaError::Planning(format!("planner LLM call failed: {e}")))?;

            let steps = parse_plan(&response.content)?;
            debug!(steps = steps.len(), "Plan created");
            Ok(steps)
        })
    }

    fn create_subtasks(&self, step: &PlanStep) -> BoxFuture<'_, Result<Vec<PlanStep>>> {
        let description = step.description.clone();
        Box::pin(async move {
            let messages = vec![
                ChatMessage::system(SUBTASK_PROMPT),
                ChatMessage::user(format!("Parent task: {description}")),
            ];

            let response = self
                .llm
                .chat(messages, &[])
                .await
                .map_err(|e| GammaError::Planning(format!("subtask LLM call failed: {e}")))?;

            let subtasks = parse_plan(&response.content)?;
            debug!(subtasks = subtasks.len(), "Step decomposed");
            Ok(subtasks)
        })
    }

    fn replan(
        &self,
        plan: &[PlanStep],
        failed_step_id: u32,
        error: &str,
    ) -> BoxFuture<'_, Result<Vec<PlanStep>>> {
        let transcript = plan
            .iter()
            .map(|s| format!("{}. {} ({})", s.id, s.description, s.status))
            .collect::<Vec<_>>()
            .join("\n");
        let completed: Vec<PlanStep> = plan
            .iter()
            .filter(|s| s.status == StepStatus::Completed)
            .cloned()
            .collect();
        let request = format!(
            "Current plan:\n{transcript}\n\nStep {failed_step_id} failed with error: {error}"
        );

        Box::pin(async move {
            let messages = vec![ChatMessage::system(REPLAN_PROMPT), ChatMessage::user(request)];

            let response = self
                .llm
                .chat(messages, &[])
                .await
                .map_err(|e| GammaError::Planning(format!("replan LLM call failed: {e}")))?;

            // Completed steps survive; recovery steps are numbered after them.
            let offset = completed.len() as u32;
            let mut new_plan = completed;
            for mut step in parse_plan(&response.content)? {
                step.id += offset;
                new_plan.push(step);
            }
            debug!(steps = new_plan.len(), "Plan regenerated after failure");
            Ok(new_plan)
        })
    }
}

/// Parse the model's reply into plan steps. Models routinely wrap JSON in
/// markdown fences, so those are stripped before parsing. Step ids are
/// assigned densely from 1 in list order.
fn parse_plan(raw: &str) -> Result<Vec<PlanStep>> {
    let text = strip_code_fences(raw);
    let descriptions: Vec<String> = serde_json::from_str(text)
        .map_err(|e| GammaError::Planning(format!("unparseable plan: {e}")))?;

    Ok(descriptions
        .into_iter()
        .enumerate()
        .map(|(i, description)| PlanStep::new(i as u32 + 1, description))
        .collect())
}

fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let without_open = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    without_open
        .strip_suffix("```")
        .unwrap_or(without_open)
        .trim()
}
