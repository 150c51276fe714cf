//! Windlass Nodes
//!
//! Built-in executors behind the uniform contract:
//! - triggers (`manualTrigger`, `scheduleTrigger`, `webhook`) that emit
//!   the initial invocation data
//! - pure transforms (`set`, `if`, `merge`, `limit`, `splitInBatches`,
//!   `noOp`, `wait`)
//! - the `httpRequest` connector
//!
//! Heavier connectors (sheets, mail, chat, LLM providers) live outside
//! this workspace and register through the same [`ExecutorRegistry`].

mod http;
mod if_node;
mod limit;
mod merge;
mod noop;
mod params;
mod poll;
mod set;
mod split_in_batches;
mod trigger;
mod wait;

pub use http::HttpRequest;
pub use if_node::If;
pub use limit::Limit;
pub use merge::Merge;
pub use noop::NoOp;
pub use poll::filter_candidates;
pub use set::Set;
pub use split_in_batches::SplitInBatches;
pub use trigger::PassthroughTrigger;
pub use wait::Wait;

use std::sync::Arc;

use windlass_engine::ExecutorRegistry;

/// Registry with every built-in executor installed.
pub fn builtin_registry() -> ExecutorRegistry {
  let mut registry = ExecutorRegistry::new();
  let trigger = Arc::new(PassthroughTrigger);
  registry.register("manualTrigger", trigger.clone());
  registry.register("scheduleTrigger", trigger.clone());
  registry.register("webhook", trigger);
  registry.register("set", Arc::new(Set));
  registry.register("noOp", Arc::new(NoOp));
  registry.register("if", Arc::new(If));
  registry.register("merge", Arc::new(Merge));
  registry.register("limit", Arc::new(Limit));
  registry.register("splitInBatches", Arc::new(SplitInBatches));
  registry.register("wait", Arc::new(Wait));
  registry.register("httpRequest", Arc::new(HttpRequest::new()));
  registry
}
