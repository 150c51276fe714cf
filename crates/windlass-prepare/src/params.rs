//! `{{UPPER_CASE}}` parameter substitution.
//!
//! Placeholders match `{{`, optional whitespace, `[A-Z0-9_]+`, optional
//! whitespace, `}}`. Lowercase and dotted forms are expression-language
//! territory and pass through untouched.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;
use serde_json::Value;
use windlass_workflow::Workflow;

static PLACEHOLDER_RE: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"\{\{\s*([A-Z0-9_]+)\s*\}\}").expect("placeholder pattern"));

static WHOLE_PLACEHOLDER_RE: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"^\{\{\s*([A-Z0-9_]+)\s*\}\}$").expect("placeholder pattern"));

/// Substitute parameters into every string value of every node's
/// parameter tree. Unknown placeholder names are left untouched.
pub fn substitute_parameters(workflow: &mut Workflow, params: &IndexMap<String, Value>) {
  for node in &mut workflow.nodes {
    substitute_value(&mut node.parameters, params);
  }
}

/// The set of placeholder names a workflow requires, found by walking
/// all string values.
pub fn required_parameters(workflow: &Workflow) -> BTreeSet<String> {
  let mut names = BTreeSet::new();
  for node in &workflow.nodes {
    collect_names(&node.parameters, &mut names);
  }
  names
}

fn collect_names(value: &Value, names: &mut BTreeSet<String>) {
  match value {
    Value::String(s) => {
      for capture in PLACEHOLDER_RE.captures_iter(s) {
        names.insert(capture[1].to_string());
      }
    }
    Value::Array(elements) => elements.iter().for_each(|v| collect_names(v, names)),
    Value::Object(map) => map.values().for_each(|v| collect_names(v, names)),
    _ => {}
  }
}

fn substitute_value(value: &mut Value, params: &IndexMap<String, Value>) {
  match value {
    Value::String(s) => {
      if let Some(replacement) = substitute_string(s, params) {
        *value = replacement;
      }
    }
    Value::Array(elements) => {
      for element in elements {
        substitute_value(element, params);
      }
    }
    Value::Object(map) => {
      for (_, entry) in map.iter_mut() {
        substitute_value(entry, params);
      }
    }
    _ => {}
  }
}

fn substitute_string(s: &str, params: &IndexMap<String, Value>) -> Option<Value> {
  // Whole-string placeholder with a non-string parameter keeps the typed
  // value instead of coercing to text.
  if let Some(capture) = WHOLE_PLACEHOLDER_RE.captures(s) {
    if let Some(param) = params.get(&capture[1]) {
      return Some(param.clone());
    }
    return None;
  }

  if !PLACEHOLDER_RE.is_match(s) {
    return None;
  }

  let replaced = PLACEHOLDER_RE.replace_all(s, |caps: &regex::Captures<'_>| {
    match params.get(&caps[1]) {
      Some(Value::String(text)) => text.clone(),
      Some(other) => other.to_string(),
      None => caps[0].to_string(),
    }
  });
  Some(Value::String(replaced.into_owned()))
}
