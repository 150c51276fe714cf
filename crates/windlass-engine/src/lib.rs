//! Windlass Engine
//!
//! This crate provides the workflow execution engine:
//! - the uniform [`NodeExecutor`] contract and the string-keyed
//!   [`ExecutorRegistry`] that dispatches by node type
//! - the per-invocation [`ExecutionContext`] holding committed outputs,
//!   the token bag, polling state and per-node memory
//! - the [`Engine`] itself: pass-based graph traversal with empty-input
//!   propagation, per-node failure policy and stall detection
//!
//! One invocation is single-threaded and cooperative; suspension points
//! are the executor calls. Invocations share nothing, so the engine is
//! safe to drive from any number of parallel workers.

mod context;
mod engine;
mod error;
mod executor;
mod result;

pub use context::{BatchState, ExecutionContext};
pub use engine::Engine;
pub use error::EngineError;
pub use executor::{ExecutorRegistry, NodeError, NodeErrorKind, NodeExecutor};
pub use result::{InvocationResult, NodeFailure};
