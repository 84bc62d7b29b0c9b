use futures::future::BoxFuture;

use crate::error::Result;
use crate::types::{ChatMessage, PlanStep, ToolDefinition};

/// LLM collaborator. The core awaits the reply before making its next
/// decision; retry/backoff policy belongs to the implementation, not here.
pub trait LlmClient: Send + Sync + 'static {
    fn chat(
        &self,
        messages: Vec<ChatMessage>,
        tools: &[ToolDefinition],
    ) -> BoxFuture<'_, Result<ChatMessage>>;
}

/// Planner collaborator — turns a goal into an ordered step list.
/// Callers degrade gracefully when any of these fail.
pub trait Planner: Send + Sync + 'static {
    fn create_plan(&self, goal: &str) -> BoxFuture<'_, Result<Vec<PlanStep>>>;

    /// Decompose one step into subtasks. The returned steps are numbered
    /// from 1 within the parent; the caller stores them on the step.
    fn create_subtasks(&self, step: &PlanStep) -> BoxFuture<'_, Result<Vec<PlanStep>>>;

    /// Regenerate the plan after a step failure. Completed steps are kept
    /// verbatim; recovery steps are numbered after them.
    fn replan(
        &self,
        plan: &[PlanStep],
        failed_step_id: u32,
        error: &str,
    ) -> BoxFuture<'_, Result<Vec<PlanStep>>>;
}

/// Tool — extensible tool execution.
pub trait Tool: Send + Sync + 'static {
    /// Tool name (used in LLM tool calls).
    fn name(&self) -> &str;

    /// Human-readable description.
    fn description(&self) -> &str;

    /// JSON Schema for tool input.
    fn parameters(&self) -> serde_json::Value;

    /// Execute the tool with the given input.
    fn execute(&self, input: serde_json::Value) -> BoxFuture<'_, Result<String>>;
}

/// Supplies an ephemeral environment-state prompt (e.g. current browser
/// state) injected at think time. Never persisted to memory.
pub trait ContextProvider: Send + Sync + 'static {
    fn transient_context(&self) -> Option<String>;
}

/// Durable snapshot store — last-writer-wins, no transactional guarantees.
pub trait SnapshotStore: Send + Sync + 'static {
    fn write(&self, key: &str, value: &serde_json::Value) -> Result<()>;

    fn read(&self, key: &str) -> Result<Option<serde_json::Value>>;
}
