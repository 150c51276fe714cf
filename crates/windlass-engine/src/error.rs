use thiserror::Error;
use windlass_workflow::WorkflowError;

/// Abort-class errors of one invocation.
#[derive(Debug, Error)]
pub enum EngineError {
  #[error(transparent)]
  Workflow(#[from] WorkflowError),

  #[error("no executor registered for node '{node}' of type '{node_type}'")]
  MissingExecutor { node: String, node_type: String },

  #[error("execution stalled; unexecuted nodes: {}", unexecuted.join(", "))]
  Stall { unexecuted: Vec<String> },

  #[error("node '{node}' failed: {message}")]
  NodeFailed { node: String, message: String },

  #[error("execution canceled")]
  Canceled,
}
