//! The `set` transform.

use async_trait::async_trait;
use serde_json::{Map, Value};
use windlass_engine::{ExecutionContext, NodeError, NodeExecutor};
use windlass_expression::evaluate_template;
use windlass_workflow::{Item, Node};

use crate::params::param;

/// Assigns evaluated values onto each item's json.
///
/// Parameters: `values` (object of field to value, strings may carry
/// expressions) and `keepOnlySet` (drop all other fields when true).
pub struct Set;

#[async_trait]
impl NodeExecutor for Set {
  async fn execute(
    &self,
    node: &Node,
    input: Vec<Item>,
    ctx: &mut ExecutionContext,
  ) -> Result<Vec<Item>, NodeError> {
    let values = match param(node, "values").and_then(Value::as_object) {
      Some(values) => values.clone(),
      None => return Ok(input),
    };
    let keep_only_set = param(node, "keepOnlySet")
      .and_then(Value::as_bool)
      .unwrap_or(false);

    let mut output = Vec::with_capacity(input.len());
    for item in input {
      let mut assigned = Map::new();
      {
        let current = std::slice::from_ref(&item);
        let scope = ctx.scope(current);
        for (field, value) in &values {
          let evaluated = match value {
            Value::String(s) => evaluate_template(s, &scope)
              .map_err(|e| NodeError::failure(format!("invalid expression in '{field}': {e}")))?,
            other => other.clone(),
          };
          assigned.insert(field.clone(), evaluated);
        }
      }

      let json = if keep_only_set {
        Value::Object(assigned)
      } else {
        let mut merged = match item.json.clone() {
          Value::Object(map) => map,
          other => {
            let mut map = Map::new();
            map.insert("value".to_string(), other);
            map
          }
        };
        merged.extend(assigned);
        Value::Object(merged)
      };

      output.push(Item {
        json,
        binary: item.binary,
      });
    }
    Ok(output)
  }
}
