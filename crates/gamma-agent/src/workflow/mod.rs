//! DAG workflow engine.
//!
//! Workflows are registered as named templates (a list of steps with
//! dependencies), validated up front, and executed as a work-list loop
//! over the ready set. Executions are tracked and persisted through a
//! [`gamma_core::traits::SnapshotStore`].

mod engine;
mod graph;
mod node;

pub use engine::{
    ExecutionContext, ExecutionStatus, ExecutionSummary, NodeSummary, PersistedExecution,
    WorkflowEngine,
};
pub use graph::WorkflowGraph;
pub use node::{FnStep, JsonMap, NodeStatus, StepAction, StepSpec, TaskNode};
