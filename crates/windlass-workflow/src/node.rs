//! Node definition.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A typed, parameterized operation in a workflow graph.
///
/// Nodes are identified by `name` with `id` as a fallback alias; every
/// edge endpoint must resolve by one of the two. `parameters` is an opaque
/// JSON tree whose string leaves may carry `{{NAME}}` placeholders and
/// `{{ ... }}` expressions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
  #[serde(default)]
  pub id: String,
  pub name: String,
  #[serde(rename = "type")]
  pub node_type: String,
  #[serde(default)]
  pub parameters: Value,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub credentials: Option<IndexMap<String, CredentialRef>>,
  #[serde(rename = "onError", default)]
  pub on_error: OnError,
  #[serde(rename = "timeoutMs", default, skip_serializing_if = "Option::is_none")]
  pub timeout_ms: Option<u64>,
}

impl Node {
  /// Triggers initiate execution and may run with empty input.
  pub fn is_trigger(&self) -> bool {
    let lowered = self.node_type.to_ascii_lowercase();
    lowered.contains("trigger") || lowered == "webhook" || lowered == "manual"
  }

  /// Sticky notes are UI-only annotations and never execute.
  pub fn is_sticky(&self) -> bool {
    self.node_type.to_ascii_lowercase().contains("stickynote")
  }

  /// Whether `reference` addresses this node, by name or by id.
  pub fn matches(&self, reference: &str) -> bool {
    self.name == reference || (!self.id.is_empty() && self.id == reference)
  }
}

/// Per-node failure policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OnError {
  /// Abort the whole execution on failure.
  #[default]
  Stop,
  /// Record the failure as an error item and keep going.
  ContinueErrorOutput,
}

impl OnError {
  /// Whether failures of this node are recorded and skipped over rather
  /// than aborting the execution.
  pub fn continues(self) -> bool {
    matches!(self, OnError::ContinueErrorOutput)
  }
}

/// A credential reference on a node.
///
/// `id` may be an `{{UPPER_CASE}}` placeholder resolved against developer
/// keys before execution; `resolved` marks entries the preparer has
/// already translated so executors skip their own lookup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CredentialRef {
  #[serde(default)]
  pub id: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
  #[serde(default, skip_serializing_if = "std::ops::Not::not")]
  pub resolved: bool,
}
