use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchedulerError {
  #[error("oauth tokens absent for {user_id}/{automation_id}")]
  MissingTokens {
    user_id: String,
    automation_id: String,
  },

  #[error(transparent)]
  Auth(#[from] windlass_credential::AuthError),

  #[error(transparent)]
  Store(#[from] windlass_store::StoreError),

  #[error(transparent)]
  Prepare(#[from] windlass_prepare::PrepareError),

  #[error("automation template load failed for '{automation_id}': {message}")]
  Template {
    automation_id: String,
    message: String,
  },

  #[error("tick failed: {0}")]
  TickFailed(String),
}
