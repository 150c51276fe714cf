//! Windlass Expression
//!
//! The `{{ ... }}` mini-language node parameters use to reference live
//! execution state:
//!
//! - `$json.path`: first item of the current node's input
//! - `$input.first().path` / `$input.all()`: current input items
//! - `$('Name').path`: a named prior node's first output item
//! - `$tokens.name`: the injected token bag
//! - bare identifiers: looked up in the initial data body, then the input
//!
//! A string that is exactly one interpolation (optionally prefixed with
//! `=`) evaluates to the referenced value with its original type; anything
//! else splices evaluated fragments into the surrounding text.
//!
//! This is distinct from `{{UPPER_CASE}}` parameter placeholders, which
//! are substituted before execution and never reach this evaluator.

mod error;
mod eval;
mod path;
mod scope;
mod template;

pub use error::ExpressionError;
pub use eval::evaluate_expression;
pub use path::{PathSegment, parse_path, traverse};
pub use scope::Scope;
pub use template::{contains_expression, evaluate_template, render_template};
