use serde::{Deserialize, Serialize};

use crate::connections::Connections;
use crate::error::WorkflowError;
use crate::graph::Graph;
use crate::node::Node;

/// A named directed graph of nodes, immutable during an execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
  pub name: String,
  pub nodes: Vec<Node>,
  #[serde(default)]
  pub connections: Connections,
}

impl Workflow {
  /// Parse a workflow from its JSON document form.
  pub fn from_json(document: &str) -> Result<Self, WorkflowError> {
    Ok(serde_json::from_str(document)?)
  }

  /// Look up a node by name or id. When a name is duplicated the first
  /// match wins.
  pub fn node(&self, reference: &str) -> Option<&Node> {
    self
      .nodes
      .iter()
      .find(|n| n.name == reference)
      .or_else(|| self.nodes.iter().find(|n| n.matches(reference)))
  }

  /// Canonical key for a node reference: the matched node's name.
  pub fn canonical_key(&self, reference: &str) -> Option<&str> {
    self.node(reference).map(|n| n.name.as_str())
  }

  /// Build the adjacency view used for traversal. Fails when an edge
  /// endpoint does not resolve to any node.
  pub fn graph(&self) -> Result<Graph, WorkflowError> {
    Graph::new(self)
  }

  /// Validate the workflow structurally: every edge endpoint resolves and
  /// at least one entry node survives the exclusions.
  pub fn validate(&self) -> Result<(), WorkflowError> {
    let graph = self.graph()?;
    if graph.entry_points().is_empty() {
      return Err(WorkflowError::NoEntryNodes);
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn duplicate_names_resolve_to_first_match() {
    let workflow: Workflow = serde_json::from_value(json!({
      "name": "dup",
      "nodes": [
        {"id": "a1", "name": "Task", "type": "set", "parameters": {"which": 1}},
        {"id": "a2", "name": "Task", "type": "set", "parameters": {"which": 2}}
      ],
      "connections": {}
    }))
    .expect("workflow should parse");

    let node = workflow.node("Task").expect("node should resolve");
    assert_eq!(node.id, "a1");
  }

  #[test]
  fn lookup_falls_back_to_id() {
    let workflow: Workflow = serde_json::from_value(json!({
      "name": "ids",
      "nodes": [{"id": "abc-123", "name": "Fetch", "type": "httpRequest"}],
      "connections": {}
    }))
    .expect("workflow should parse");

    assert_eq!(
      workflow.canonical_key("abc-123").expect("id should resolve"),
      "Fetch"
    );
  }
}
