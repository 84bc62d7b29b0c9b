use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, error, info, warn};

use gamma_core::config::AgentConfig;
use gamma_core::error::Result;
use gamma_core::event::EventBus;
use gamma_core::traits::{ContextProvider, LlmClient, Planner};
use gamma_core::types::{AgentEvent, ChatMessage, LoopState, PlanStep};
use gamma_memory::MemoryStore;

use crate::registry::ToolRegistry;

/// The think-act controller: plan once, then alternate LLM calls with tool
/// execution until the model answers without tool calls or the step budget
/// runs out.
///
/// Failure policy is asymmetric. Planner failures are tolerated (the loop
/// runs unplanned), tool failures are fed back to the model as inline error
/// text, but an LLM transport failure is fatal: the loop has no basis to
/// continue without a reply.
pub struct AgentLoop {
    config: AgentConfig,
    llm: Arc<dyn LlmClient>,
    planner: Option<Arc<dyn Planner>>,
    tools: ToolRegistry,
    memory: MemoryStore,
    event_bus: Arc<EventBus>,
    env: Option<Arc<dyn ContextProvider>>,
    plan: Vec<PlanStep>,
}

impl AgentLoop {
    pub fn new(
        config: AgentConfig,
        llm: Arc<dyn LlmClient>,
        tools: ToolRegistry,
        memory: MemoryStore,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            config,
            llm,
            planner: None,
            tools,
            memory,
            event_bus,
            env: None,
            plan: Vec::new(),
        }
    }

    pub fn with_planner(mut self, planner: Arc<dyn Planner>) -> Self {
        self.planner = Some(planner);
        self
    }

    /// Attach an environment-state provider. Its output is injected as an
    /// ephemeral system message at each think step and never persisted.
    pub fn with_context_provider(mut self, env: Arc<dyn ContextProvider>) -> Self {
        self.env = Some(env);
        self
    }

    pub fn memory(&self) -> &MemoryStore {
        &self.memory
    }

    pub fn plan(&self) -> &[PlanStep] {
        &self.plan
    }

    /// Run the loop for one goal. Returns the model's final answer, or the
    /// last assistant content when the step budget is exhausted.
    pub async fn run(&mut self, goal: &str) -> Result<String> {
        let max_steps = self.config.max_steps;

        if let Some(prompt) = self.config.system_prompt.clone() {
            self.memory.ensure_system_prompt(&prompt);
        }
        self.memory.append(ChatMessage::user(goal)).await;

        self.event_bus.publish_status(LoopState::Planning);
        if let Some(planner) = self.planner.clone() {
            match planner.create_plan(goal).await {
                Ok(steps) => {
                    info!(steps = steps.len(), "Plan created");
                    self.event_bus.publish(AgentEvent::Plan {
                        steps: steps.clone(),
                    });
                    self.plan = steps;
                }
                Err(e) => {
                    warn!(error = %e, "Planning failed, continuing without a plan");
                }
            }
        }

        let tool_defs = self.tools.definitions();
        let mut last_content = String::new();

        for step in 0..max_steps {
            debug!(step, "Starting think step");
            self.event_bus.publish_status(LoopState::Thinking);

            let mut context = self.memory.context();
            if let Some(env_state) = self.env.as_ref().and_then(|e| e.transient_context()) {
                context.push(ChatMessage::system(env_state));
            }

            let response = match self.llm.chat(context, &tool_defs).await {
                Ok(msg) => msg,
                Err(e) => {
                    error!(error = %e, "LLM call failed");
                    self.event_bus.publish(AgentEvent::Error {
                        message: e.to_string(),
                    });
                    self.event_bus.publish_status(LoopState::Errored);
                    return Err(e);
                }
            };

            if !response.content.is_empty() {
                self.event_bus.publish(AgentEvent::Thought {
                    content: response.content.clone(),
                });
            }
            last_content = response.content.clone();
            let tool_calls = response.tool_calls.clone();
            self.memory.append(response).await;

            if tool_calls.is_empty() {
                info!(steps = step + 1, "Agent run complete");
                self.event_bus.publish(AgentEvent::FinalAnswer {
                    content: last_content.clone(),
                });
                self.event_bus.publish_status(LoopState::Done);
                return Ok(last_content);
            }

            self.event_bus.publish_status(LoopState::Acting);
            for tc in tool_calls {
                let parsed: std::result::Result<Value, _> = serde_json::from_str(&tc.arguments);
                self.event_bus.publish(AgentEvent::ToolCall {
                    name: tc.name.clone(),
                    args: parsed.as_ref().map(|v| v.clone()).unwrap_or(Value::Null),
                });

                let (result, is_error) = match parsed {
                    Ok(args) => match self.tools.execute(&tc.name, args).await {
                        Ok(output) => (output, false),
                        Err(e) => {
                            error!(tool = %tc.name, error = %e, "Tool execution failed");
                            (format!("Tool {} failed: {e}", tc.name), true)
                        }
                    },
                    Err(e) => (
                        format!("Invalid tool arguments for {}: {e}", tc.name),
                        true,
                    ),
                };

                self.event_bus.publish(AgentEvent::ToolResult {
                    name: tc.name.clone(),
                    result: result.clone(),
                    is_error,
                });
                self.memory
                    .append(ChatMessage::tool_result(&tc.id, result))
                    .await;
            }
        }

        warn!(max_steps, "Step budget exhausted");
        self.event_bus
            .publish(AgentEvent::MaxStepsReached { steps: max_steps });
        self.event_bus.publish_status(LoopState::MaxStepsReached);
        Ok(last_content)
    }
}
