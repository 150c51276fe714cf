//! The `httpRequest` connector.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;
use url::Url;
use windlass_engine::{ExecutionContext, NodeError, NodeExecutor};
use windlass_expression::{evaluate_template, render_template};
use windlass_workflow::{Item, Node};

use crate::params::{param, param_str, param_u64};

const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Performs one HTTP request per input item.
///
/// Parameters: `url` (required, may carry expressions), `method` (GET
/// default), `headers` (object), `jsonBody` (any value, expressions
/// evaluated), `timeoutMs` (30 s default), `allowedHosts` (optional host
/// allow-list checked before any connection is attempted).
pub struct HttpRequest {
  client: reqwest::Client,
}

impl HttpRequest {
  pub fn new() -> Self {
    Self {
      client: reqwest::Client::new(),
    }
  }
}

impl Default for HttpRequest {
  fn default() -> Self {
    Self::new()
  }
}

struct PreparedRequest {
  method: reqwest::Method,
  url: Url,
  headers: Vec<(String, String)>,
  body: Option<Value>,
}

#[async_trait]
impl NodeExecutor for HttpRequest {
  async fn execute(
    &self,
    node: &Node,
    input: Vec<Item>,
    ctx: &mut ExecutionContext,
  ) -> Result<Vec<Item>, NodeError> {
    let timeout = Duration::from_millis(param_u64(node, "timeoutMs").unwrap_or(DEFAULT_TIMEOUT_MS));
    let mut output = Vec::with_capacity(input.len());

    for item in &input {
      let request = prepare_request(node, item, ctx)?;
      debug!(node = %node.name, method = %request.method, url = %request.url, "http_request");

      let mut builder = self
        .client
        .request(request.method, request.url.clone())
        .timeout(timeout);
      for (name, value) in &request.headers {
        builder = builder.header(name, value);
      }
      if let Some(body) = &request.body {
        builder = builder.json(body);
      }

      let response = builder
        .send()
        .await
        .map_err(|e| NodeError::failure(format!("request to {} failed: {e}", request.url)))?;
      let status = response.status();
      let text = response
        .text()
        .await
        .map_err(|e| NodeError::failure(format!("reading response from {} failed: {e}", request.url)))?;

      if !status.is_success() {
        let snippet: String = text.chars().take(200).collect();
        return Err(NodeError::failure(format!(
          "HTTP {status} from {}: {snippet}",
          request.url
        )));
      }

      let json = serde_json::from_str::<Value>(&text)
        .unwrap_or_else(|_| serde_json::json!({"data": text, "statusCode": status.as_u16()}));
      output.push(Item::from_json(json));
    }
    Ok(output)
  }
}

fn prepare_request(
  node: &Node,
  item: &Item,
  ctx: &ExecutionContext,
) -> Result<PreparedRequest, NodeError> {
  let current = std::slice::from_ref(item);
  let scope = ctx.scope(current);

  let raw_url = param_str(node, "url")
    .ok_or_else(|| NodeError::failure("url parameter not provided"))?;
  let rendered_url = render_template(raw_url, &scope)
    .map_err(|e| NodeError::failure(format!("invalid url expression: {e}")))?;
  let url = Url::parse(&rendered_url)
    .map_err(|e| NodeError::failure(format!("invalid url '{rendered_url}': {e}")))?;
  if !matches!(url.scheme(), "http" | "https") {
    return Err(NodeError::failure(format!(
      "unsupported url scheme '{}'",
      url.scheme()
    )));
  }
  check_allowed_hosts(node, &url)?;

  let method_name = param_str(node, "method").unwrap_or("GET");
  let method = reqwest::Method::from_bytes(method_name.to_ascii_uppercase().as_bytes())
    .map_err(|_| NodeError::failure(format!("invalid http method '{method_name}'")))?;

  let mut headers = Vec::new();
  if let Some(map) = param(node, "headers").and_then(Value::as_object) {
    for (name, value) in map {
      let rendered = match value {
        Value::String(s) => render_template(s, &scope)
          .map_err(|e| NodeError::failure(format!("invalid header expression: {e}")))?,
        other => other.to_string(),
      };
      headers.push((name.clone(), rendered));
    }
  }

  let body = match param(node, "jsonBody") {
    Some(Value::String(s)) => Some(
      evaluate_template(s, &scope)
        .map_err(|e| NodeError::failure(format!("invalid body expression: {e}")))?,
    ),
    Some(other) => Some(other.clone()),
    None => None,
  };

  Ok(PreparedRequest {
    method,
    url,
    headers,
    body,
  })
}

fn check_allowed_hosts(node: &Node, url: &Url) -> Result<(), NodeError> {
  let Some(allowed) = param(node, "allowedHosts").and_then(Value::as_array) else {
    return Ok(());
  };
  let host = url.host_str().unwrap_or_default();
  let permitted = allowed
    .iter()
    .filter_map(Value::as_str)
    .any(|entry| entry == host);
  if !permitted {
    return Err(NodeError::failure(format!(
      "host '{host}' is not in the allowed host list"
    )));
  }
  Ok(())
}
