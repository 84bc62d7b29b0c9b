pub mod agent_loop;
pub mod planner;
pub mod registry;
pub mod workflow;

pub use agent_loop::AgentLoop;
pub use planner::LlmPlanner;
pub use registry::ToolRegistry;
pub use workflow::{
    ExecutionContext, ExecutionStatus, ExecutionSummary, FnStep, JsonMap, NodeStatus,
    PersistedExecution, StepAction, StepSpec, WorkflowEngine, WorkflowGraph,
};
