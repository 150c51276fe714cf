//! Template splitting and rendering.
//!
//! A template is static text interleaved with `{{ ... }}` expressions.
//! Whole-template expressions return the referenced value with its
//! original type; mixed templates splice evaluated fragments as strings.

use serde_json::Value;

use crate::error::ExpressionError;
use crate::eval::evaluate_expression;
use crate::scope::Scope;

enum TemplatePart<'s> {
  Static(&'s str),
  Expression(&'s str),
}

/// Whether a string contains at least one `{{ ... }}` interpolation.
pub fn contains_expression(source: &str) -> bool {
  source
    .find("{{")
    .is_some_and(|open| source[open..].contains("}}"))
}

/// Evaluate a template, preserving the value type when the source is
/// exactly one interpolation (an optional leading `=` is stripped first).
pub fn evaluate_template(source: &str, scope: &Scope<'_>) -> Result<Value, ExpressionError> {
  let stripped = source.strip_prefix('=').unwrap_or(source);

  if is_single_expression(stripped) {
    let trimmed = stripped.trim();
    let inner = &trimmed[2..trimmed.len() - 2];
    return evaluate_expression(inner, scope);
  }

  Ok(Value::String(render(stripped, scope)?))
}

/// Render a template to a string, splicing each expression's value into
/// the surrounding text. Unresolvable expressions splice as "".
pub fn render_template(source: &str, scope: &Scope<'_>) -> Result<String, ExpressionError> {
  let stripped = source.strip_prefix('=').unwrap_or(source);
  render(stripped, scope)
}

fn render(source: &str, scope: &Scope<'_>) -> Result<String, ExpressionError> {
  let mut result = String::with_capacity(source.len());
  for part in parse_parts(source)? {
    match part {
      TemplatePart::Static(text) => result.push_str(text),
      TemplatePart::Expression(expr) => {
        let value = evaluate_expression(expr, scope)?;
        result.push_str(&stringify(&value));
      }
    }
  }
  Ok(result)
}

fn parse_parts(source: &str) -> Result<Vec<TemplatePart<'_>>, ExpressionError> {
  let mut parts = Vec::new();
  let mut rest = source;
  let mut offset = 0;

  while let Some(open) = rest.find("{{") {
    if open > 0 {
      parts.push(TemplatePart::Static(&rest[..open]));
    }
    let after_open = &rest[open + 2..];
    let close = after_open
      .find("}}")
      .ok_or(ExpressionError::Unterminated { offset: offset + open })?;
    parts.push(TemplatePart::Expression(&after_open[..close]));
    offset += open + 2 + close + 2;
    rest = &after_open[close + 2..];
  }
  if !rest.is_empty() {
    parts.push(TemplatePart::Static(rest));
  }
  Ok(parts)
}

/// Exactly one `{{ ... }}` spanning the whole (trimmed) string.
fn is_single_expression(source: &str) -> bool {
  let trimmed = source.trim();
  trimmed.starts_with("{{")
    && trimmed.ends_with("}}")
    && trimmed.matches("{{").count() == 1
    && trimmed.matches("}}").count() == 1
    && trimmed.len() >= 4
}

fn stringify(value: &Value) -> String {
  match value {
    Value::Null => String::new(),
    Value::String(s) => s.clone(),
    other => other.to_string(),
  }
}
