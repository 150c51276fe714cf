use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExpressionError {
  #[error("unterminated expression starting at offset {offset}")]
  Unterminated { offset: usize },

  #[error("invalid path '{path}': {message}")]
  InvalidPath { path: String, message: String },

  #[error("invalid node reference in '{expression}'")]
  InvalidNodeReference { expression: String },
}
