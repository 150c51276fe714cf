use std::collections::HashSet;

use indexmap::IndexMap;

use crate::connections::Channel;
use crate::error::WorkflowError;
use crate::workflow::Workflow;

/// Adjacency view of a workflow, keyed by canonical node names.
///
/// Edges on every channel contribute to upstream/downstream: auxiliary
/// `ai_*` providers are scheduling dependencies of their consumers even
/// though they carry no main input.
#[derive(Debug, Clone)]
pub struct Graph {
  adjacency: IndexMap<String, Vec<String>>,
  reverse_adjacency: IndexMap<String, Vec<String>>,
  entry_points: Vec<String>,
  /// Sources of `ai_tool` edges. Executed only on demand by their
  /// consumer, never as graph roots.
  tool_providers: HashSet<String>,
}

impl Graph {
  /// Build the adjacency lists, resolving every edge endpoint by name or
  /// id. Unresolved endpoints are a validation error.
  pub fn new(workflow: &Workflow) -> Result<Self, WorkflowError> {
    let mut adjacency: IndexMap<String, Vec<String>> = IndexMap::new();
    let mut reverse_adjacency: IndexMap<String, Vec<String>> = IndexMap::new();
    let mut tool_providers = HashSet::new();

    for node in &workflow.nodes {
      adjacency.entry(node.name.clone()).or_default();
      reverse_adjacency.entry(node.name.clone()).or_default();
    }

    for (source, channels) in &workflow.connections {
      let source_key = workflow
        .canonical_key(source)
        .ok_or_else(|| WorkflowError::UnresolvedSource(source.clone()))?
        .to_string();

      for (channel, slots) in channels {
        if *channel == Channel::AiTool && slots.iter().any(|slot| !slot.is_empty()) {
          tool_providers.insert(source_key.clone());
        }
        for slot in slots {
          for target in slot {
            let target_key = workflow.canonical_key(&target.node).ok_or_else(|| {
              WorkflowError::UnresolvedEdge {
                from: source_key.clone(),
                to: target.node.clone(),
              }
            })?;
            adjacency
              .entry(source_key.clone())
              .or_default()
              .push(target_key.to_string());
            reverse_adjacency
              .entry(target_key.to_string())
              .or_default()
              .push(source_key.clone());
          }
        }
      }
    }

    // Entry points: never the target of any edge, not UI-only, and not a
    // tool provider (those run on demand).
    let entry_points: Vec<String> = workflow
      .nodes
      .iter()
      .filter(|n| !n.is_sticky())
      .filter(|n| !tool_providers.contains(&n.name))
      .filter(|n| {
        reverse_adjacency
          .get(&n.name)
          .is_none_or(|incoming| incoming.is_empty())
      })
      .map(|n| n.name.clone())
      .collect();

    Ok(Self {
      adjacency,
      reverse_adjacency,
      entry_points,
      tool_providers,
    })
  }

  /// Nodes executed first, with the initial invocation data.
  pub fn entry_points(&self) -> &[String] {
    &self.entry_points
  }

  pub fn downstream(&self, node: &str) -> &[String] {
    self.adjacency.get(node).map(Vec::as_slice).unwrap_or(&[])
  }

  pub fn upstream(&self, node: &str) -> &[String] {
    self
      .reverse_adjacency
      .get(node)
      .map(Vec::as_slice)
      .unwrap_or(&[])
  }

  pub fn is_tool_provider(&self, node: &str) -> bool {
    self.tool_providers.contains(node)
  }
}
