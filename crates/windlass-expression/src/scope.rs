use indexmap::IndexMap;
use serde_json::Value;
use windlass_workflow::Item;

/// A read-only view of the execution state an expression evaluates
/// against: committed node outputs, the current node's input, the token
/// bag, and the initial invocation data.
#[derive(Debug, Clone, Copy)]
pub struct Scope<'a> {
  pub outputs: &'a IndexMap<String, Vec<Item>>,
  pub input: &'a [Item],
  pub tokens: &'a IndexMap<String, String>,
  pub initial_data: &'a Value,
}

impl<'a> Scope<'a> {
  pub fn new(
    outputs: &'a IndexMap<String, Vec<Item>>,
    input: &'a [Item],
    tokens: &'a IndexMap<String, String>,
    initial_data: &'a Value,
  ) -> Self {
    Self {
      outputs,
      input,
      tokens,
      initial_data,
    }
  }
}
