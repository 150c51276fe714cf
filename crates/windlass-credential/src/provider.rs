use std::fmt;

/// OAuth provider an automation's tokens belong to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Provider {
  Google,
  TikTok,
  /// No refresh flow known; the stored access token is used as-is.
  Unknown(String),
}

impl Provider {
  pub fn parse(name: &str) -> Self {
    match name.to_ascii_lowercase().as_str() {
      "google" => Provider::Google,
      "tiktok" => Provider::TikTok,
      _ => Provider::Unknown(name.to_string()),
    }
  }
}

impl fmt::Display for Provider {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Provider::Google => write!(f, "google"),
      Provider::TikTok => write!(f, "tiktok"),
      Provider::Unknown(name) => write!(f, "{name}"),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parse_is_case_insensitive() {
    assert_eq!(Provider::parse("Google"), Provider::Google);
    assert_eq!(Provider::parse("TIKTOK"), Provider::TikTok);
    assert_eq!(
      Provider::parse("notion"),
      Provider::Unknown("notion".to_string())
    );
  }
}
