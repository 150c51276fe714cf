//! The uniform node executor contract and the dispatch registry.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use windlass_workflow::{Item, Node};

use crate::context::ExecutionContext;

/// What went wrong inside an executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeErrorKind {
  /// A required token or API key could not be located.
  CredentialMissing,
  /// Anything else: network failure, non-2xx response, parse error.
  Failure,
}

/// Error returned by a node executor.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct NodeError {
  pub kind: NodeErrorKind,
  pub message: String,
}

impl NodeError {
  pub fn credential_missing(message: impl Into<String>) -> Self {
    Self {
      kind: NodeErrorKind::CredentialMissing,
      message: message.into(),
    }
  }

  pub fn failure(message: impl Into<String>) -> Self {
    Self {
      kind: NodeErrorKind::Failure,
      message: message.into(),
    }
  }

  /// Whether this error means a credential was absent, either by kind or
  /// by message shape. Executors outside this workspace only have the
  /// message to speak through.
  pub fn is_credential_missing(&self) -> bool {
    if self.kind == NodeErrorKind::CredentialMissing {
      return true;
    }
    let lowered = self.message.to_lowercase();
    let subject = ["api key", "api_key", "apikey", "access token", "access_token", "token", "credential"];
    let state = ["not provided", "missing", "not set", "absent", "not configured", "not found"];
    subject.iter().any(|s| lowered.contains(s)) && state.iter().any(|s| lowered.contains(s))
  }
}

/// The uniform contract every node implementation obeys.
///
/// Input is the concatenation of items from all incoming `main` edges in
/// source-iteration order; auxiliary capability providers are read
/// through `ctx.outputs` by name. Output is one (possibly empty) item
/// sequence; for multi-output nodes it is the active branch's content.
#[async_trait]
pub trait NodeExecutor: Send + Sync {
  async fn execute(
    &self,
    node: &Node,
    input: Vec<Item>,
    ctx: &mut ExecutionContext,
  ) -> Result<Vec<Item>, NodeError>;
}

/// String-keyed dispatch table from node type to executor.
#[derive(Default)]
pub struct ExecutorRegistry {
  executors: HashMap<String, Arc<dyn NodeExecutor>>,
}

impl ExecutorRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn register(&mut self, node_type: impl Into<String>, executor: Arc<dyn NodeExecutor>) {
    self.executors.insert(node_type.into(), executor);
  }

  pub fn get(&self, node_type: &str) -> Option<Arc<dyn NodeExecutor>> {
    self.executors.get(node_type).cloned()
  }

  pub fn contains(&self, node_type: &str) -> bool {
    self.executors.contains_key(node_type)
  }
}

impl fmt::Debug for ExecutorRegistry {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ExecutorRegistry")
      .field("node_types", &self.executors.keys().collect::<Vec<_>>())
      .finish()
  }
}
