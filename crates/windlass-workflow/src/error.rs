use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkflowError {
  #[error("node not found: {0}")]
  NodeNotFound(String),

  #[error("edge references unknown node: from={from}, to={to}")]
  UnresolvedEdge { from: String, to: String },

  #[error("connection source '{0}' does not resolve to a node")]
  UnresolvedSource(String),

  #[error("no entry nodes found (every executable node has incoming edges)")]
  NoEntryNodes,

  #[error("failed to parse workflow document: {0}")]
  Parse(#[from] serde_json::Error),
}
