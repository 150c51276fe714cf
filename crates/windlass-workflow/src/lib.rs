//! Windlass Workflow
//!
//! This crate provides the executable workflow graph model for windlass.
//! A workflow is a named directed graph of typed nodes connected over
//! channels; `main` channels carry item sequences, `ai_*` channels carry
//! capabilities from a provider node to a consumer node.
//!
//! Workflows are stored and exchanged as JSON. The types here deserialize
//! that document form directly, validate it structurally (every edge must
//! resolve to a node by name or id), and expose the adjacency view the
//! engine traverses.

mod connections;
mod error;
mod graph;
mod item;
mod node;
mod workflow;

pub use connections::{Channel, ConnectionTarget, Connections, OutputSlots};
pub use error::WorkflowError;
pub use graph::Graph;
pub use item::{BinaryData, Item, wrap_initial_data};
pub use node::{CredentialRef, Node, OnError};
pub use workflow::Workflow;
