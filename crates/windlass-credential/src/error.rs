use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
  #[error("no refresh token stored for provider '{provider}'")]
  MissingRefreshToken { provider: String },

  #[error("token refresh failed for provider '{provider}': {reason}")]
  RefreshFailed { provider: String, reason: String },

  #[error("token endpoint request failed: {0}")]
  Network(#[from] reqwest::Error),
}
