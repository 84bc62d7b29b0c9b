use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, info};
use uuid::Uuid;

use gamma_core::config::StorageConfig;
use gamma_core::error::{GammaError, Result};
use gamma_core::traits::SnapshotStore;

use super::graph::WorkflowGraph;
use super::node::{JsonMap, NodeStatus, StepSpec};

/// Overall status of one workflow execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Running,
    Completed,
    Failed,
}

/// Live state of one run of a registered workflow template.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    pub execution_id: String,
    pub workflow: String,
    pub graph: WorkflowGraph,
    pub status: ExecutionStatus,
    pub data: JsonMap,
}

#[derive(Debug, Clone, Serialize)]
pub struct NodeSummary {
    pub id: String,
    pub status: NodeStatus,
}

/// Summary row returned by `list_active`.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionSummary {
    pub execution_id: String,
    pub workflow: String,
    pub status: ExecutionStatus,
    /// Whether this execution is still making progress.
    pub running: bool,
    pub nodes: Vec<NodeSummary>,
}

/// The shape persisted per execution. Node-level statuses are not part of
/// it: after a restart only engine-level status and shared data survive,
/// and graph progress must be re-run from scratch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedExecution {
    pub workflow: String,
    pub status: ExecutionStatus,
    pub data: JsonMap,
}

/// Drives executions of registered workflow templates.
///
/// Execution is an iterative work-list loop: each pass runs the ready set
/// (pending nodes with all dependencies completed) in declaration order,
/// merging step results into the shared data map. The first step error
/// fails the whole execution and stops it immediately — ready siblings
/// that have not run yet are skipped (fail-fast). After every pass the
/// full execution registry is written wholesale to the snapshot store.
///
/// Not thread-safe: a single engine instance assumes one cooperative
/// caller. Give each concurrent session its own engine, or serialize
/// access externally.
pub struct WorkflowEngine {
    templates: HashMap<String, WorkflowGraph>,
    executions: HashMap<String, ExecutionContext>,
    store: Arc<dyn SnapshotStore>,
    snapshot_key: String,
}

impl WorkflowEngine {
    pub fn new(store: Arc<dyn SnapshotStore>) -> Self {
        Self {
            templates: HashMap::new(),
            executions: HashMap::new(),
            store,
            snapshot_key: "workflow_executions".to_string(),
        }
    }

    pub fn with_snapshot_key(mut self, key: impl Into<String>) -> Self {
        self.snapshot_key = key.into();
        self
    }

    /// Build an engine persisting under the key named in the `[storage]`
    /// config section.
    pub fn from_config(store: Arc<dyn SnapshotStore>, config: &StorageConfig) -> Self {
        Self::new(store).with_snapshot_key(config.snapshot_key.clone())
    }

    /// Register (or overwrite) a workflow template. Validation happens
    /// here: cyclic or malformed step lists never reach the registry.
    /// In-flight executions of a replaced template are unaffected — they
    /// run on clones.
    pub fn register(&mut self, name: &str, steps: Vec<StepSpec>) -> Result<()> {
        let graph = WorkflowGraph::build(name, steps)?;
        info!(workflow = name, steps = graph.nodes().len(), "Registered workflow");
        self.templates.insert(name.to_string(), graph);
        Ok(())
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    /// Execute a registered workflow against an initial data map, running
    /// to quiescence or first failure before returning the execution id.
    pub async fn execute(&mut self, name: &str, initial_data: JsonMap) -> Result<String> {
        let graph = self
            .templates
            .get(name)
            .cloned()
            .ok_or_else(|| GammaError::WorkflowNotFound(name.to_string()))?;

        let execution_id = Uuid::new_v4().to_string();
        let mut ctx = ExecutionContext {
            execution_id: execution_id.clone(),
            workflow: name.to_string(),
            graph,
            status: ExecutionStatus::Running,
            data: initial_data,
        };

        info!(workflow = name, execution_id = %execution_id, "Starting workflow execution");

        loop {
            let ready = ctx.graph.ready_nodes();
            if ready.is_empty() {
                if ctx.graph.all_completed() {
                    ctx.status = ExecutionStatus::Completed;
                    info!(execution_id = %execution_id, "Workflow execution completed");
                }
                break;
            }

            let mut pass_failed = false;
            for idx in ready {
                let step_id = ctx.graph.node(idx).id.clone();
                ctx.graph.set_status(idx, NodeStatus::Running);
                debug!(step = %step_id, "Executing workflow step");

                let action = Arc::clone(&ctx.graph.node(idx).action);
                match action.run(&ctx.data).await {
                    Ok(updates) => {
                        for (key, value) in updates {
                            ctx.data.insert(key, value);
                        }
                        ctx.graph.set_status(idx, NodeStatus::Completed);
                    }
                    Err(e) => {
                        error!(step = %step_id, error = %e, "Workflow step failed");
                        ctx.graph.set_status(idx, NodeStatus::Failed);
                        ctx.status = ExecutionStatus::Failed;
                        pass_failed = true;
                        break;
                    }
                }
            }

            self.track_and_persist(&ctx)?;
            if pass_failed {
                break;
            }
        }

        self.track_and_persist(&ctx)?;
        Ok(execution_id)
    }

    /// Look up a tracked execution by id.
    pub fn execution(&self, execution_id: &str) -> Option<&ExecutionContext> {
        self.executions.get(execution_id)
    }

    /// Summaries of every tracked execution, completed ones included —
    /// the registry only empties on engine drop.
    pub fn list_active(&self) -> Vec<ExecutionSummary> {
        self.executions
            .values()
            .map(|ctx| ExecutionSummary {
                execution_id: ctx.execution_id.clone(),
                workflow: ctx.workflow.clone(),
                status: ctx.status,
                running: ctx.status == ExecutionStatus::Running,
                nodes: ctx
                    .graph
                    .nodes()
                    .iter()
                    .map(|n| NodeSummary {
                        id: n.id.clone(),
                        status: n.status,
                    })
                    .collect(),
            })
            .collect()
    }

    /// Read back the persisted execution records.
    pub fn load_persisted(&self) -> Result<HashMap<String, PersistedExecution>> {
        match self.store.read(&self.snapshot_key)? {
            Some(value) => Ok(serde_json::from_value(value)?),
            None => Ok(HashMap::new()),
        }
    }

    fn track_and_persist(&mut self, ctx: &ExecutionContext) -> Result<()> {
        self.executions
            .insert(ctx.execution_id.clone(), ctx.clone());

        let mut map = serde_json::Map::new();
        for (id, execution) in &self.executions {
            map.insert(
                id.clone(),
                serde_json::json!({
                    "workflow": execution.workflow,
                    "status": execution.status,
                    "data": execution.data,
                }),
            );
        }
        self.store.write(&self.snapshot_key, &Value::Object(map))
    }
}
