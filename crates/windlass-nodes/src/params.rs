//! Small accessors over a node's parameter tree.

use serde_json::Value;
use windlass_workflow::Node;

pub(crate) fn param<'n>(node: &'n Node, key: &str) -> Option<&'n Value> {
  node.parameters.get(key)
}

pub(crate) fn param_str<'n>(node: &'n Node, key: &str) -> Option<&'n str> {
  param(node, key).and_then(Value::as_str)
}

pub(crate) fn param_u64(node: &Node, key: &str) -> Option<u64> {
  param(node, key).and_then(Value::as_u64)
}

pub(crate) fn param_f64(node: &Node, key: &str) -> Option<f64> {
  param(node, key).and_then(Value::as_f64)
}
