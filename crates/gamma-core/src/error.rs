use thiserror::Error;

#[derive(Debug, Error)]
pub enum GammaError {
    // LLM errors
    #[error("LLM request failed: {0}")]
    Llm(String),

    #[error("Planning failed: {0}")]
    Planning(String),

    // Tool errors
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Tool execution failed: {tool}: {message}")]
    ToolExecution { tool: String, message: String },

    // Workflow errors
    #[error("Workflow not found: {0}")]
    WorkflowNotFound(String),

    #[error("Workflow '{0}' contains a dependency cycle")]
    CyclicWorkflow(String),

    #[error("Workflow '{workflow}': step '{step}' depends on unknown step '{dependency}'")]
    UnknownDependency {
        workflow: String,
        step: String,
        dependency: String,
    },

    #[error("Workflow '{workflow}': duplicate step id '{step}'")]
    DuplicateStep { workflow: String, step: String },

    // Config errors
    #[error("Config error: {0}")]
    Config(String),

    #[error("Config file not found: {0}")]
    ConfigNotFound(String),

    // Storage errors
    #[error("Snapshot store error: {0}")]
    Snapshot(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // JSON errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, GammaError>;
