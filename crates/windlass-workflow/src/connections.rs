//! Connection channels between nodes.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// The label on an edge.
///
/// `Main` edges carry item sequences. The `Ai*` channels attach a
/// capability provider (model, memory, tool, ...) to a consumer node:
/// they count as dependencies for scheduling but never contribute to the
/// consumer's main input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Channel {
  #[serde(rename = "main")]
  Main,
  #[serde(rename = "ai_languageModel")]
  AiLanguageModel,
  #[serde(rename = "ai_memory")]
  AiMemory,
  #[serde(rename = "ai_tool")]
  AiTool,
  #[serde(rename = "ai_embedding")]
  AiEmbedding,
  #[serde(rename = "ai_textSplitter")]
  AiTextSplitter,
  #[serde(rename = "ai_vectorStore")]
  AiVectorStore,
  #[serde(rename = "ai_document")]
  AiDocument,
}

impl Channel {
  /// Whether this channel carries item data into the target's input.
  pub fn is_main(self) -> bool {
    matches!(self, Channel::Main)
  }
}

/// One endpoint of a connection: the target node (by name or id) and the
/// input index on that node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionTarget {
  pub node: String,
  #[serde(default)]
  pub index: u32,
}

/// The output slots of one source node on one channel. Slot `k` holds the
/// connection records leaving output branch `k` (e.g. an If node's slot 0
/// is the true branch, slot 1 the false branch).
pub type OutputSlots = Vec<Vec<ConnectionTarget>>;

/// All connections of a workflow: source node name to its channels, each
/// channel to its output slots. Document order is preserved; the engine's
/// input-gathering order follows it.
pub type Connections = IndexMap<String, IndexMap<Channel, OutputSlots>>;

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn connections_parse_in_document_order() {
    let raw = json!({
      "A": {"main": [[{"node": "B", "index": 0}]]},
      "B": {"main": [[{"node": "C", "index": 0}], []]},
      "Model": {"ai_languageModel": [[{"node": "Agent", "index": 0}]]}
    });
    let connections: Connections =
      serde_json::from_value(raw).expect("connections should parse");
    let sources: Vec<&String> = connections.keys().collect();
    assert_eq!(sources, ["A", "B", "Model"]);
    assert_eq!(connections["B"][&Channel::Main].len(), 2);
    assert!(connections["B"][&Channel::Main][1].is_empty());
    assert!(!Channel::AiLanguageModel.is_main());
  }
}
