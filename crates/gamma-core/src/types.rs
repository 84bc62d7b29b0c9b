use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique session identifier.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from_string(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Role in a conversation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// A tool invocation requested by the LLM.
///
/// `arguments` is kept as the raw JSON text the model produced; it is parsed
/// at dispatch time so malformed JSON becomes an inline error result instead
/// of a deserialization failure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: String,
}

/// A chat message in the conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    /// Set on tool-role messages: which call this result answers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
            tool_calls: vec![],
            tool_call_id: None,
            timestamp: Some(Utc::now()),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            tool_calls: vec![],
            tool_call_id: None,
            timestamp: Some(Utc::now()),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            tool_calls: vec![],
            tool_call_id: None,
            timestamp: Some(Utc::now()),
        }
    }

    pub fn assistant_with_tools(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            tool_calls,
            tool_call_id: None,
            timestamp: Some(Utc::now()),
        }
    }

    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: content.into(),
            tool_calls: vec![],
            tool_call_id: Some(tool_call_id.into()),
            timestamp: Some(Utc::now()),
        }
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// Status of a plan step. Transitions only move forward.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl std::fmt::Display for StepStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            StepStatus::Pending => "pending",
            StepStatus::InProgress => "in_progress",
            StepStatus::Completed => "completed",
            StepStatus::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

/// One step in a generated plan. Ids are assigned densely starting at 1.
/// A step may carry its own subtask list (one level of hierarchical
/// decomposition); subtask ids restart at 1 within the parent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlanStep {
    pub id: u32,
    pub description: String,
    pub status: StepStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subtasks: Vec<PlanStep>,
}

impl PlanStep {
    pub fn new(id: u32, description: impl Into<String>) -> Self {
        Self {
            id,
            description: description.into(),
            status: StepStatus::Pending,
            result: None,
            subtasks: Vec::new(),
        }
    }

    pub fn mark_in_progress(&mut self) {
        self.status = StepStatus::InProgress;
    }

    pub fn mark_completed(&mut self, result: impl Into<String>) {
        self.status = StepStatus::Completed;
        self.result = Some(result.into());
    }

    pub fn mark_failed(&mut self, error: impl Into<String>) {
        self.status = StepStatus::Failed;
        self.result = Some(error.into());
    }
}

/// Tool definition exposed to the LLM.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON Schema for the tool's input.
    pub parameters: serde_json::Value,
}

impl ToolDefinition {
    /// Function-call schema shape expected by chat-completion style APIs.
    pub fn to_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "function",
            "function": {
                "name": self.name,
                "description": self.description,
                "parameters": self.parameters,
            }
        })
    }
}

/// States of the think-act controller.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LoopState {
    Planning,
    Thinking,
    Acting,
    Done,
    MaxStepsReached,
    Errored,
}

/// Agent event broadcast to all subscribers.
///
/// This is the sole notification channel out of the core: adapters
/// (WebSocket, terminal) subscribe and render; the core never performs
/// I/O directly.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type")]
pub enum AgentEvent {
    #[serde(rename = "status")]
    Status { state: LoopState },
    #[serde(rename = "plan")]
    Plan { steps: Vec<PlanStep> },
    #[serde(rename = "thought")]
    Thought { content: String },
    #[serde(rename = "tool_call")]
    ToolCall { name: String, args: serde_json::Value },
    #[serde(rename = "tool_result")]
    ToolResult {
        name: String,
        result: String,
        is_error: bool,
    },
    #[serde(rename = "final-answer")]
    FinalAnswer { content: String },
    #[serde(rename = "max-steps")]
    MaxStepsReached { steps: usize },
    #[serde(rename = "error")]
    Error { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_id_unique() {
        assert_ne!(SessionId::new().0, SessionId::new().0);
    }

    #[test]
    fn test_tool_result_message() {
        let msg = ChatMessage::tool_result("call_1", "ok");
        assert_eq!(msg.role, Role::Tool);
        assert_eq!(msg.tool_call_id.as_deref(), Some("call_1"));
        assert!(!msg.has_tool_calls());
    }

    #[test]
    fn test_plan_step_transitions() {
        let mut step = PlanStep::new(1, "do the thing");
        assert_eq!(step.status, StepStatus::Pending);
        step.mark_in_progress();
        assert_eq!(step.status, StepStatus::InProgress);
        step.mark_completed("done");
        assert_eq!(step.status, StepStatus::Completed);
        assert_eq!(step.result.as_deref(), Some("done"));
    }

    #[test]
    fn test_plan_step_serde_skips_empty_subtasks() {
        let mut step = PlanStep::new(1, "parent");
        let json = serde_json::to_value(&step).unwrap();
        assert!(json.get("subtasks").is_none());

        step.subtasks.push(PlanStep::new(1, "child"));
        let json = serde_json::to_value(&step).unwrap();
        assert_eq!(json["subtasks"][0]["description"], "child");

        let restored: PlanStep = serde_json::from_value(json).unwrap();
        assert_eq!(restored.subtasks.len(), 1);
    }

    #[test]
    fn test_tool_definition_schema_shape() {
        let def = ToolDefinition {
            name: "read_file".into(),
            description: "Read a file".into(),
            parameters: serde_json::json!({"type": "object", "properties": {}}),
        };
        let schema = def.to_schema();
        assert_eq!(schema["type"], "function");
        assert_eq!(schema["function"]["name"], "read_file");
    }

    #[test]
    fn test_event_wire_tags() {
        let event = AgentEvent::FinalAnswer {
            content: "42".into(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "final-answer");

        let event = AgentEvent::Status {
            state: LoopState::Thinking,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "status");
        assert_eq!(json["state"], "thinking");
    }

    #[test]
    fn test_message_roundtrip_skips_empty_fields() {
        let msg = ChatMessage::user("hello");
        let json = serde_json::to_value(&msg).unwrap();
        assert!(json.get("tool_calls").is_none());
        assert!(json.get("tool_call_id").is_none());

        let restored: ChatMessage = serde_json::from_value(json).unwrap();
        assert_eq!(restored.content, "hello");
        assert!(restored.tool_calls.is_empty());
    }
}
