//! Executor tests driven through the uniform contract.

use indexmap::IndexMap;
use serde_json::{Value, json};
use windlass_engine::{ExecutionContext, NodeExecutor};
use windlass_nodes::{HttpRequest, If, Limit, Set, Wait, builtin_registry};
use windlass_workflow::{Item, Node, Workflow};

fn context() -> ExecutionContext {
  let workflow: Workflow =
    serde_json::from_value(json!({"name": "t", "nodes": [], "connections": {}}))
      .expect("workflow should parse");
  ExecutionContext::new(workflow, json!({}), IndexMap::new())
}

fn node(node_type: &str, parameters: Value) -> Node {
  serde_json::from_value(json!({
    "name": "N",
    "type": node_type,
    "parameters": parameters
  }))
  .expect("node should parse")
}

fn items(values: &[Value]) -> Vec<Item> {
  values.iter().cloned().map(Item::from_json).collect()
}

#[tokio::test]
async fn set_assigns_evaluated_values() {
  let mut ctx = context();
  let n = node("set", json!({"values": {"greeting": "hi {{ $json.name }}", "fixed": 7}}));
  let out = Set
    .execute(&n, items(&[json!({"name": "Ada"})]), &mut ctx)
    .await
    .expect("set should succeed");
  assert_eq!(out[0].json, json!({"name": "Ada", "greeting": "hi Ada", "fixed": 7}));
}

#[tokio::test]
async fn set_keep_only_set_drops_other_fields() {
  let mut ctx = context();
  let n = node("set", json!({"values": {"kept": "{{ $json.a }}"}, "keepOnlySet": true}));
  let out = Set
    .execute(&n, items(&[json!({"a": 1, "b": 2})]), &mut ctx)
    .await
    .expect("set should succeed");
  assert_eq!(out[0].json, json!({"kept": 1}));
}

#[tokio::test]
async fn set_preserves_binary() {
  let mut ctx = context();
  let n = node("set", json!({"values": {"tag": "x"}}));
  let input: Vec<Item> = vec![
    serde_json::from_value(json!({
      "json": {"a": 1},
      "binary": {"file": {"data": "aGk=", "mimeType": "text/plain"}}
    }))
    .expect("item should parse"),
  ];
  let out = Set.execute(&n, input, &mut ctx).await.expect("set should succeed");
  assert!(out[0].binary.is_some(), "binary must survive passthrough");
}

#[tokio::test]
async fn if_filters_items_per_condition() {
  let mut ctx = context();
  let n = node(
    "if",
    json!({"conditions": [{"left": "{{ $json.x }}", "operator": "equals", "right": 2}]}),
  );
  let out = If
    .execute(&n, items(&[json!({"x": 1}), json!({"x": 2})]), &mut ctx)
    .await
    .expect("if should succeed");
  assert_eq!(out.len(), 1);
  assert_eq!(out[0].json, json!({"x": 2}));
}

#[tokio::test]
async fn if_or_combinator_accepts_any_passing_condition() {
  let mut ctx = context();
  let n = node(
    "if",
    json!({
      "combinator": "or",
      "conditions": [
        {"left": "{{ $json.x }}", "operator": "greaterThan", "right": 10},
        {"left": "{{ $json.tag }}", "operator": "contains", "right": "keep"}
      ]
    }),
  );
  let out = If
    .execute(
      &n,
      items(&[json!({"x": 1, "tag": "keep-me"}), json!({"x": 1, "tag": "drop"})]),
      &mut ctx,
    )
    .await
    .expect("if should succeed");
  assert_eq!(out.len(), 1);
}

#[tokio::test]
async fn limit_truncates_to_max_items() {
  let mut ctx = context();
  let n = node("limit", json!({"maxItems": 2}));
  let out = Limit
    .execute(&n, items(&[json!(1), json!(2), json!(3)]), &mut ctx)
    .await
    .expect("limit should succeed");
  assert_eq!(out.len(), 2);
}

#[tokio::test]
async fn wait_rejects_unknown_units() {
  let mut ctx = context();
  let n = node("wait", json!({"amount": 1, "unit": "fortnights"}));
  assert!(Wait.execute(&n, items(&[json!({})]), &mut ctx).await.is_err());
}

#[tokio::test]
async fn wait_passes_input_through() {
  let mut ctx = context();
  let n = node("wait", json!({"amount": 5, "unit": "ms"}));
  let out = Wait
    .execute(&n, items(&[json!({"v": 1})]), &mut ctx)
    .await
    .expect("wait should succeed");
  assert_eq!(out[0].json, json!({"v": 1}));
}

#[tokio::test]
async fn http_rejects_disallowed_host_before_connecting() {
  let mut ctx = context();
  let n = node(
    "httpRequest",
    json!({"url": "https://evil.example.com/x", "allowedHosts": ["api.example.com"]}),
  );
  let err = HttpRequest::new()
    .execute(&n, items(&[json!({})]), &mut ctx)
    .await
    .expect_err("disallowed host must be refused");
  assert!(err.message.contains("not in the allowed host list"));
}

#[tokio::test]
async fn http_rejects_non_http_schemes() {
  let mut ctx = context();
  let n = node("httpRequest", json!({"url": "file:///etc/passwd"}));
  let err = HttpRequest::new()
    .execute(&n, items(&[json!({})]), &mut ctx)
    .await
    .expect_err("non-http scheme must be refused");
  assert!(err.message.contains("scheme"));
}

#[test]
fn builtin_registry_covers_core_types() {
  let registry = builtin_registry();
  for node_type in [
    "manualTrigger",
    "scheduleTrigger",
    "webhook",
    "set",
    "noOp",
    "if",
    "merge",
    "limit",
    "splitInBatches",
    "wait",
    "httpRequest",
  ] {
    assert!(registry.contains(node_type), "missing executor for {node_type}");
  }
}
