//! Evaluation of a single expression against a scope.

use serde_json::Value;
use windlass_workflow::Item;

use crate::error::ExpressionError;
use crate::path::{parse_path, traverse};
use crate::scope::Scope;

/// Evaluate one expression (the content between `{{` and `}}`).
///
/// Unresolvable references evaluate to `Value::Null`; only malformed
/// expressions are errors.
pub fn evaluate_expression(expression: &str, scope: &Scope<'_>) -> Result<Value, ExpressionError> {
  let expr = expression.trim();
  if expr.is_empty() {
    return Ok(Value::Null);
  }

  if expr == "$input.all()" {
    return Ok(serde_json::to_value(scope.input).unwrap_or(Value::Null));
  }
  if let Some(rest) = expr.strip_prefix("$input.first()") {
    return path_into_first_item(scope.input, rest);
  }
  if let Some(rest) = expr.strip_prefix("$json").filter(|r| is_path_tail(r)) {
    return path_into_first_item(scope.input, rest);
  }
  if let Some(rest) = expr.strip_prefix("$tokens").filter(|r| is_path_tail(r)) {
    let segments = parse_path(rest)?;
    let token_map: serde_json::Map<String, Value> = scope
      .tokens
      .iter()
      .map(|(k, v)| (k.clone(), Value::String(v.clone())))
      .collect();
    let bag = Value::Object(token_map);
    return Ok(traverse(&bag, &segments).cloned().unwrap_or(Value::Null));
  }
  if let Some(rest) = expr.strip_prefix("$(") {
    return evaluate_node_reference(rest, expr, scope);
  }

  // Bare identifier: initial data body first, then the current input.
  let segments = parse_path(expr)?;
  if let Some(body) = scope.initial_data.get("body") {
    if let Some(found) = traverse(body, &segments) {
      return Ok(found.clone());
    }
  }
  if let Some(first) = scope.input.first() {
    if let Some(found) = traverse(&first.json, &segments) {
      return Ok(found.clone());
    }
  }
  Ok(Value::Null)
}

/// A tail is a valid path continuation: empty, dotted, or bracketed.
/// Keeps `$json` from matching identifiers like `$jsonFoo`.
fn is_path_tail(rest: &str) -> bool {
  rest.is_empty() || rest.starts_with('.') || rest.starts_with('[')
}

/// `$('Name')[.item][.json][.path]`: value from a named prior node's
/// first output item.
fn evaluate_node_reference(
  rest: &str,
  full_expression: &str,
  scope: &Scope<'_>,
) -> Result<Value, ExpressionError> {
  let invalid = || ExpressionError::InvalidNodeReference {
    expression: full_expression.to_string(),
  };

  let rest = rest.trim_start();
  let quote = rest.chars().next().filter(|c| *c == '\'' || *c == '"').ok_or_else(invalid)?;
  let after_quote = &rest[1..];
  let name_end = after_quote.find(quote).ok_or_else(invalid)?;
  let name = &after_quote[..name_end];
  let after_name = after_quote[name_end + 1..].trim_start();
  let mut tail = after_name.strip_prefix(')').ok_or_else(invalid)?;

  // `.item` and `.json` select within the first output item; the
  // remaining path always applies to the item's json tree.
  tail = tail.strip_prefix(".item").unwrap_or(tail);
  tail = tail.strip_prefix(".json").unwrap_or(tail);

  let Some(items) = scope.outputs.get(name) else {
    return Ok(Value::Null);
  };
  path_into_first_item(items, tail)
}

fn path_into_first_item(items: &[Item], path: &str) -> Result<Value, ExpressionError> {
  let segments = parse_path(path)?;
  let Some(first) = items.first() else {
    return Ok(Value::Null);
  };
  Ok(traverse(&first.json, &segments).cloned().unwrap_or(Value::Null))
}
