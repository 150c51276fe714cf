use thiserror::Error;

#[derive(Debug, Error)]
pub enum PrepareError {
  #[error("token injection failed for node '{node}': {source}")]
  Injection {
    node: String,
    #[source]
    source: windlass_expression::ExpressionError,
  },
}
