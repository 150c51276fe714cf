//! Top-level invocation results.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use windlass_workflow::Item;

/// One recorded node failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeFailure {
  pub node: String,
  pub message: String,
}

/// Result of one workflow invocation.
///
/// `success` is true only when no node recorded a failure. Abort-class
/// errors additionally set `error`; `outputs` then holds whatever was
/// committed before the abort.
#[derive(Debug, Serialize, Deserialize)]
pub struct InvocationResult {
  pub success: bool,
  pub outputs: IndexMap<String, Vec<Item>>,
  pub errors: Vec<NodeFailure>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
}
