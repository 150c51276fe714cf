//! Windlass Prepare
//!
//! Everything that happens to a workflow template between the metadata
//! store and the engine:
//!
//! 1. `{{UPPER_CASE}}` parameter substitution (typed when the whole
//!    string is one placeholder)
//! 2. credential placeholder resolution against developer keys
//! 3. token name normalization (aliases to canonical names)
//! 4. token injection into non-trigger node parameters
//!
//! The prepared workflow is a deep copy; the template itself is never
//! mutated.

mod credentials;
mod error;
mod inject;
mod params;
mod tokens;

pub use credentials::{canonical_token_name, resolve_credential_placeholders};
pub use error::PrepareError;
pub use inject::inject_tokens;
pub use params::{required_parameters, substitute_parameters};
pub use tokens::normalize_tokens;

use indexmap::IndexMap;
use serde_json::Value;
use windlass_workflow::Workflow;

/// A workflow ready for token injection and execution, plus the tokens
/// resolved from credential placeholders.
#[derive(Debug, Clone)]
pub struct Prepared {
  pub workflow: Workflow,
  pub resolved_tokens: IndexMap<String, String>,
}

/// Apply parameter substitution and credential placeholder resolution to
/// a deep copy of `template`.
pub fn prepare_workflow(
  template: &Workflow,
  params: &IndexMap<String, Value>,
  developer_keys: &IndexMap<String, String>,
) -> Prepared {
  let mut workflow = template.clone();
  substitute_parameters(&mut workflow, params);
  let resolved_tokens = resolve_credential_placeholders(&mut workflow, developer_keys);
  Prepared {
    workflow,
    resolved_tokens,
  }
}
