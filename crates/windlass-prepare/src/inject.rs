//! Token injection into prepared workflows.
//!
//! Walks every non-trigger node's parameter tree and:
//!
//! 1. evaluates strings that embed `{{ ... $tokens.X ... }}` expressions
//! 2. replaces bare `$tokens.X` strings with the token value
//! 3. fills recognized credential-parameter keys that are empty, from a
//!    key-specific candidate list, including under nested
//!    `authentication.*` and `credentials.*` sub-objects
//!
//! Trigger nodes are exempt: their parameters describe schedules, not
//! credentials.

use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;
use serde_json::Value;
use windlass_expression::{Scope, contains_expression, evaluate_template};
use windlass_workflow::{Item, Workflow};

use crate::error::PrepareError;

static BARE_TOKEN_RE: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"^\$tokens\.([A-Za-z0-9_]+)$").expect("token pattern"));

/// Candidate tokens tried, in order, for a recognized credential key.
fn candidates_for(key: &str) -> Option<&'static [&'static str]> {
  match key {
    "apiKey" | "api_key" => Some(&[
      "openAiApiKey",
      "openRouterApiKey",
      "anthropicApiKey",
      "huggingFaceApiKey",
    ]),
    "accessToken" | "access_token" => {
      Some(&["googleAccessToken", "slackAccessToken", "tikTokAccessToken"])
    }
    "token" => Some(&["googleAccessToken", "slackAccessToken", "openAiApiKey"]),
    "googleAccessToken" => Some(&["googleAccessToken"]),
    "openAiApiKey" => Some(&["openAiApiKey"]),
    "slackToken" | "slack_token" => Some(&["slackAccessToken"]),
    _ => None,
  }
}

/// Inject `tokens` into every non-trigger node of `workflow`.
pub fn inject_tokens(
  workflow: &mut Workflow,
  tokens: &IndexMap<String, String>,
) -> Result<(), PrepareError> {
  let empty_outputs: IndexMap<String, Vec<Item>> = IndexMap::new();
  let empty_input: Vec<Item> = Vec::new();
  let empty_initial = Value::Null;
  let scope = Scope::new(&empty_outputs, &empty_input, tokens, &empty_initial);

  for node in &mut workflow.nodes {
    if node.is_trigger() {
      continue;
    }
    inject_value(&mut node.parameters, tokens, &scope, true).map_err(|source| {
      PrepareError::Injection {
        node: node.name.clone(),
        source,
      }
    })?;
  }
  Ok(())
}

fn inject_value(
  value: &mut Value,
  tokens: &IndexMap<String, String>,
  scope: &Scope<'_>,
  fill_credentials: bool,
) -> Result<(), windlass_expression::ExpressionError> {
  match value {
    Value::String(s) => {
      if let Some(capture) = BARE_TOKEN_RE.captures(s) {
        if let Some(token) = tokens.get(&capture[1]) {
          *value = Value::String(token.clone());
        }
      } else if contains_expression(s) && s.contains("$tokens") {
        *value = evaluate_template(s, scope)?;
      }
    }
    Value::Array(elements) => {
      for element in elements {
        inject_value(element, tokens, scope, false)?;
      }
    }
    Value::Object(map) => {
      for (key, entry) in map.iter_mut() {
        // The fill rule follows credential-shaped sub-objects but not
        // arbitrary nesting.
        let descend_fill = matches!(key.as_str(), "authentication" | "credentials");
        inject_value(entry, tokens, scope, descend_fill)?;
      }
      if fill_credentials {
        fill_credential_keys(map, tokens);
      }
    }
    _ => {}
  }
  Ok(())
}

fn fill_credential_keys(map: &mut serde_json::Map<String, Value>, tokens: &IndexMap<String, String>) {
  for (key, entry) in map.iter_mut() {
    if !is_empty_value(entry) {
      continue;
    }
    let Some(candidates) = candidates_for(key) else {
      continue;
    };
    if let Some(token) = candidates.iter().find_map(|name| tokens.get(*name)) {
      *entry = Value::String(token.clone());
    }
  }
}

fn is_empty_value(value: &Value) -> bool {
  match value {
    Value::Null => true,
    Value::String(s) => s.is_empty(),
    _ => false,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn tokens() -> IndexMap<String, String> {
    let mut map = IndexMap::new();
    map.insert("openAiApiKey".to_string(), "sk-live".to_string());
    map.insert("googleAccessToken".to_string(), "ya29.x".to_string());
    map
  }

  fn workflow(nodes: Value) -> Workflow {
    serde_json::from_value(json!({"name": "t", "nodes": nodes, "connections": {}}))
      .expect("workflow should parse")
  }

  #[test]
  fn bare_token_reference_is_replaced() {
    let mut wf = workflow(json!([
      {"name": "LLM", "type": "chainLlm", "parameters": {"apiKey": "$tokens.openAiApiKey"}}
    ]));
    inject_tokens(&mut wf, &tokens()).expect("injection should succeed");
    assert_eq!(wf.nodes[0].parameters["apiKey"], json!("sk-live"));
  }

  #[test]
  fn embedded_token_expression_is_evaluated() {
    let mut wf = workflow(json!([
      {"name": "H", "type": "httpRequest", "parameters": {
        "headerValue": "Bearer {{ $tokens.googleAccessToken }}"
      }}
    ]));
    inject_tokens(&mut wf, &tokens()).expect("injection should succeed");
    assert_eq!(wf.nodes[0].parameters["headerValue"], json!("Bearer ya29.x"));
  }

  #[test]
  fn empty_credential_keys_fill_from_candidates() {
    let mut wf = workflow(json!([
      {"name": "LLM", "type": "chainLlm", "parameters": {
        "apiKey": "",
        "model": "gpt-4o",
        "authentication": {"accessToken": null}
      }}
    ]));
    inject_tokens(&mut wf, &tokens()).expect("injection should succeed");
    assert_eq!(wf.nodes[0].parameters["apiKey"], json!("sk-live"));
    assert_eq!(wf.nodes[0].parameters["model"], json!("gpt-4o"));
    assert_eq!(
      wf.nodes[0].parameters["authentication"]["accessToken"],
      json!("ya29.x")
    );
  }

  #[test]
  fn populated_keys_are_not_overwritten() {
    let mut wf = workflow(json!([
      {"name": "LLM", "type": "chainLlm", "parameters": {"apiKey": "user-supplied"}}
    ]));
    inject_tokens(&mut wf, &tokens()).expect("injection should succeed");
    assert_eq!(wf.nodes[0].parameters["apiKey"], json!("user-supplied"));
  }

  #[test]
  fn triggers_are_exempt() {
    let mut wf = workflow(json!([
      {"name": "Poll", "type": "driveTrigger", "parameters": {"token": "", "pollTimes": {"everyX": 5}}}
    ]));
    inject_tokens(&mut wf, &tokens()).expect("injection should succeed");
    assert_eq!(wf.nodes[0].parameters["token"], json!(""));
  }

  #[test]
  fn unknown_token_leaves_bare_reference() {
    let mut wf = workflow(json!([
      {"name": "S", "type": "set", "parameters": {"k": "$tokens.absent"}}
    ]));
    inject_tokens(&mut wf, &tokens()).expect("injection should succeed");
    assert_eq!(wf.nodes[0].parameters["k"], json!("$tokens.absent"));
  }
}
