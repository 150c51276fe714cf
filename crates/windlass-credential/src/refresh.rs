//! The refresh-token grant, per provider.

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use tracing::{info, instrument};

use crate::error::AuthError;
use crate::provider::Provider;

const GOOGLE_TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";
const TIKTOK_TOKEN_ENDPOINT: &str = "https://open.tiktokapis.com/v2/oauth/token/";

/// Refresh when the expiry is within this window of now (or missing).
const EXPIRY_SKEW_MINUTES: i64 = 5;

/// Tokens as loaded from the metadata store.
#[derive(Debug, Clone)]
pub struct StoredTokens {
  pub access_token: String,
  pub refresh_token: Option<String>,
  pub token_expiry: Option<DateTime<Utc>>,
}

impl StoredTokens {
  /// Refresh-eligible: a refresh token exists and the expiry is missing
  /// or inside the skew window.
  pub fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
    if self.refresh_token.is_none() {
      return false;
    }
    match self.token_expiry {
      Some(expiry) => expiry - now <= Duration::minutes(EXPIRY_SKEW_MINUTES),
      None => true,
    }
  }
}

/// Result of a successful refresh. `refresh_token` is the stored one
/// when the provider did not rotate it.
#[derive(Debug, Clone)]
pub struct RefreshedTokens {
  pub access_token: String,
  pub refresh_token: Option<String>,
  pub token_expiry: Option<DateTime<Utc>>,
}

/// OAuth client credentials for one provider.
#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
  pub client_id: String,
  pub client_secret: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
  access_token: String,
  #[serde(default)]
  refresh_token: Option<String>,
  #[serde(default)]
  expires_in: Option<u64>,
}

/// Dispatches the refresh-token grant to the provider's token endpoint.
pub struct Refresher {
  http: reqwest::Client,
  google: ClientConfig,
  tiktok: ClientConfig,
}

impl Refresher {
  pub fn new(google: ClientConfig, tiktok: ClientConfig) -> Self {
    Self {
      http: reqwest::Client::new(),
      google,
      tiktok,
    }
  }

  /// Refresh `tokens` for `provider`. Unknown providers return the
  /// stored tokens unchanged.
  #[instrument(name = "token_refresh", skip(self, tokens), fields(provider = %provider))]
  pub async fn refresh(
    &self,
    provider: &Provider,
    tokens: &StoredTokens,
  ) -> Result<RefreshedTokens, AuthError> {
    let (endpoint, config) = match provider {
      Provider::Google => (GOOGLE_TOKEN_ENDPOINT, &self.google),
      Provider::TikTok => (TIKTOK_TOKEN_ENDPOINT, &self.tiktok),
      Provider::Unknown(_) => {
        return Ok(RefreshedTokens {
          access_token: tokens.access_token.clone(),
          refresh_token: tokens.refresh_token.clone(),
          token_expiry: tokens.token_expiry,
        });
      }
    };

    let refresh_token =
      tokens
        .refresh_token
        .as_deref()
        .ok_or_else(|| AuthError::MissingRefreshToken {
          provider: provider.to_string(),
        })?;

    let form = [
      ("grant_type", "refresh_token"),
      ("refresh_token", refresh_token),
      ("client_id", config.client_id.as_str()),
      ("client_secret", config.client_secret.as_str()),
    ];

    let response = self.http.post(endpoint).form(&form).send().await?;
    let status = response.status();
    if !status.is_success() {
      let body = response.text().await.unwrap_or_default();
      let snippet: String = body.chars().take(300).collect();
      return Err(AuthError::RefreshFailed {
        provider: provider.to_string(),
        reason: format!("{status}: {snippet}"),
      });
    }

    let parsed: TokenResponse = response.json().await.map_err(|e| AuthError::RefreshFailed {
      provider: provider.to_string(),
      reason: format!("unreadable token response: {e}"),
    })?;

    let token_expiry = parsed
      .expires_in
      .map(|secs| Utc::now() + Duration::seconds(secs as i64));

    info!(rotated_refresh_token = parsed.refresh_token.is_some(), "token_refreshed");

    Ok(RefreshedTokens {
      access_token: parsed.access_token,
      // Google typically reuses the old refresh token; TikTok rotates.
      refresh_token: parsed.refresh_token.or_else(|| tokens.refresh_token.clone()),
      token_expiry,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn tokens(refresh: Option<&str>, expiry: Option<DateTime<Utc>>) -> StoredTokens {
    StoredTokens {
      access_token: "at".to_string(),
      refresh_token: refresh.map(str::to_string),
      token_expiry: expiry,
    }
  }

  #[test]
  fn refresh_needed_inside_skew_window() {
    let now = Utc::now();
    assert!(tokens(Some("rt"), Some(now + Duration::minutes(3))).needs_refresh(now));
    assert!(tokens(Some("rt"), Some(now - Duration::minutes(10))).needs_refresh(now));
    assert!(tokens(Some("rt"), None).needs_refresh(now));
  }

  #[test]
  fn refresh_not_needed_with_fresh_expiry_or_no_refresh_token() {
    let now = Utc::now();
    assert!(!tokens(Some("rt"), Some(now + Duration::minutes(30))).needs_refresh(now));
    assert!(!tokens(None, Some(now - Duration::minutes(10))).needs_refresh(now));
  }

  #[tokio::test]
  async fn unknown_provider_skips_refresh() {
    let refresher = Refresher::new(ClientConfig::default(), ClientConfig::default());
    let stored = tokens(Some("rt"), None);
    let refreshed = refresher
      .refresh(&Provider::Unknown("notion".to_string()), &stored)
      .await
      .expect("unknown provider should be a no-op");
    assert_eq!(refreshed.access_token, "at");
    assert_eq!(refreshed.refresh_token.as_deref(), Some("rt"));
  }
}
