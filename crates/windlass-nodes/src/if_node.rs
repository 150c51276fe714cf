//! The `if` branching transform.

use async_trait::async_trait;
use serde_json::Value;
use windlass_engine::{ExecutionContext, NodeError, NodeExecutor};
use windlass_expression::evaluate_template;
use windlass_workflow::{Item, Node};

use crate::params::{param, param_str};

/// Filters items through a condition list.
///
/// Parameters: `conditions` (array of `{left, operator, right}`) and
/// `combinator` (`and` default, or `or`). The returned sequence is the
/// true branch's content; the false branch is implicitly empty.
pub struct If;

#[async_trait]
impl NodeExecutor for If {
  async fn execute(
    &self,
    node: &Node,
    input: Vec<Item>,
    ctx: &mut ExecutionContext,
  ) -> Result<Vec<Item>, NodeError> {
    let conditions = param(node, "conditions")
      .and_then(Value::as_array)
      .cloned()
      .unwrap_or_default();
    let all_must_hold = param_str(node, "combinator") != Some("or");

    let mut output = Vec::new();
    for item in input {
      let holds = {
        let current = std::slice::from_ref(&item);
        let scope = ctx.scope(current);
        let mut results = conditions.iter().map(|condition| {
          evaluate_condition(condition, &scope)
        });
        if all_must_hold {
          results.try_fold(true, |acc, r| r.map(|b| acc && b))?
        } else {
          results.try_fold(false, |acc, r| r.map(|b| acc || b))?
        }
      };
      if holds {
        output.push(item);
      }
    }
    Ok(output)
  }
}

fn evaluate_condition(
  condition: &Value,
  scope: &windlass_expression::Scope<'_>,
) -> Result<bool, NodeError> {
  let operator = condition
    .get("operator")
    .and_then(Value::as_str)
    .unwrap_or("equals");
  let left = evaluate_operand(condition.get("left"), scope)?;
  let right = evaluate_operand(condition.get("right"), scope)?;

  let holds = match operator {
    "equals" => left == right,
    "notEquals" => left != right,
    "contains" => contains(&left, &right),
    "greaterThan" => as_numbers(&left, &right).is_some_and(|(l, r)| l > r),
    "lessThan" => as_numbers(&left, &right).is_some_and(|(l, r)| l < r),
    "exists" => !left.is_null(),
    other => return Err(NodeError::failure(format!("unknown operator '{other}'"))),
  };
  Ok(holds)
}

fn evaluate_operand(
  operand: Option<&Value>,
  scope: &windlass_expression::Scope<'_>,
) -> Result<Value, NodeError> {
  match operand {
    Some(Value::String(s)) => evaluate_template(s, scope)
      .map_err(|e| NodeError::failure(format!("invalid condition expression: {e}"))),
    Some(other) => Ok(other.clone()),
    None => Ok(Value::Null),
  }
}

fn contains(left: &Value, right: &Value) -> bool {
  match (left, right) {
    (Value::String(l), Value::String(r)) => l.contains(r.as_str()),
    (Value::Array(items), needle) => items.contains(needle),
    _ => false,
  }
}

fn as_numbers(left: &Value, right: &Value) -> Option<(f64, f64)> {
  Some((left.as_f64()?, right.as_f64()?))
}
