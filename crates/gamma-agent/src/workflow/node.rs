use std::sync::Arc;

use futures::future::BoxFuture;
use serde::Serialize;

use gamma_core::error::Result;

/// Shared context map passed between workflow steps.
pub type JsonMap = serde_json::Map<String, serde_json::Value>;

/// Status of a workflow node. Transitions only move forward:
/// pending → running → completed | failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

/// The work function behind a workflow node.
///
/// A step reads the shared context and returns a map of updates to merge
/// back into it (empty when it has nothing to contribute). An error marks
/// the node and its execution failed.
pub trait StepAction: Send + Sync + 'static {
    fn run<'a>(&'a self, data: &'a JsonMap) -> BoxFuture<'a, Result<JsonMap>>;
}

/// Adapter wrapping a plain closure as a StepAction.
pub struct FnStep<F>(pub F);

impl<F> StepAction for FnStep<F>
where
    F: Fn(&JsonMap) -> Result<JsonMap> + Send + Sync + 'static,
{
    fn run<'a>(&'a self, data: &'a JsonMap) -> BoxFuture<'a, Result<JsonMap>> {
        let result = (self.0)(data);
        Box::pin(async move { result })
    }
}

/// One step in a workflow registration.
pub struct StepSpec {
    pub id: String,
    pub action: Arc<dyn StepAction>,
    pub depends_on: Vec<String>,
}

impl StepSpec {
    pub fn new(id: impl Into<String>, action: impl StepAction) -> Self {
        Self {
            id: id.into(),
            action: Arc::new(action),
            depends_on: Vec::new(),
        }
    }

    pub fn from_arc(id: impl Into<String>, action: Arc<dyn StepAction>) -> Self {
        Self {
            id: id.into(),
            action,
            depends_on: Vec::new(),
        }
    }

    /// Declare which step ids must complete before this one runs.
    pub fn depends_on(mut self, deps: &[&str]) -> Self {
        self.depends_on = deps.iter().map(|s| s.to_string()).collect();
        self
    }
}

/// A node in a workflow graph. Cloned per execution so concurrent runs of
/// the same template never share mutable state; the action itself is
/// shared behind an Arc.
#[derive(Clone)]
pub struct TaskNode {
    pub id: String,
    pub action: Arc<dyn StepAction>,
    pub depends_on: Vec<String>,
    pub status: NodeStatus,
}

impl TaskNode {
    pub(crate) fn from_spec(spec: StepSpec) -> Self {
        Self {
            id: spec.id,
            action: spec.action,
            depends_on: spec.depends_on,
            status: NodeStatus::Pending,
        }
    }
}

impl std::fmt::Debug for TaskNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskNode")
            .field("id", &self.id)
            .field("depends_on", &self.depends_on)
            .field("status", &self.status)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_spec_builder() {
        let spec = StepSpec::new("ingest", FnStep(|_: &JsonMap| Ok(JsonMap::new())))
            .depends_on(&["fetch"]);
        assert_eq!(spec.id, "ingest");
        assert_eq!(spec.depends_on, vec!["fetch"]);
    }

    #[tokio::test]
    async fn test_fn_step_reads_context() {
        let step = FnStep(|data: &JsonMap| {
            let name = data
                .get("name")
                .and_then(|v| v.as_str())
                .unwrap_or("unknown");
            let mut out = JsonMap::new();
            out.insert("greeting".into(), format!("hello {}", name).into());
            Ok(out)
        });

        let mut data = JsonMap::new();
        data.insert("name".into(), "gamma".into());

        let out = step.run(&data).await.unwrap();
        assert_eq!(out["greeting"], "hello gamma");
    }
}
