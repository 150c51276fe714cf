//! Token name normalization.

use indexmap::IndexMap;

/// External token name to canonical name. The table is a function: no
/// alias maps to two canonical names.
const TOKEN_ALIASES: &[(&str, &str)] = &[
  ("google_oauth_token", "googleAccessToken"),
  ("google_access_token", "googleAccessToken"),
  ("google_token", "googleAccessToken"),
  ("googleOauthToken", "googleAccessToken"),
  ("openai_api_key", "openAiApiKey"),
  ("openai_key", "openAiApiKey"),
  ("openaiApiKey", "openAiApiKey"),
  ("openrouter_api_key", "openRouterApiKey"),
  ("openrouter_key", "openRouterApiKey"),
  ("anthropic_api_key", "anthropicApiKey"),
  ("claude_api_key", "anthropicApiKey"),
  ("huggingface_api_key", "huggingFaceApiKey"),
  ("hf_token", "huggingFaceApiKey"),
  ("slack_token", "slackAccessToken"),
  ("slack_access_token", "slackAccessToken"),
  ("tiktok_token", "tikTokAccessToken"),
  ("tiktok_access_token", "tikTokAccessToken"),
];

/// Map raw token names to canonical ones. Caller-supplied overrides take
/// precedence over the default table; unknown names pass through
/// unchanged. When an alias and its canonical name both appear, the later
/// entry in `raw` wins.
pub fn normalize_tokens(
  raw: &IndexMap<String, String>,
  overrides: &IndexMap<String, String>,
) -> IndexMap<String, String> {
  let mut normalized = IndexMap::new();
  for (name, value) in raw {
    let canonical = overrides
      .get(name)
      .map(String::as_str)
      .or_else(|| {
        TOKEN_ALIASES
          .iter()
          .find(|(alias, _)| alias == name)
          .map(|(_, canonical)| *canonical)
      })
      .unwrap_or(name.as_str());
    normalized.insert(canonical.to_string(), value.clone());
  }
  normalized
}

#[cfg(test)]
mod tests {
  use super::*;

  fn map(entries: &[(&str, &str)]) -> IndexMap<String, String> {
    entries
      .iter()
      .map(|(k, v)| (k.to_string(), v.to_string()))
      .collect()
  }

  #[test]
  fn aliases_collapse_to_canonical_names() {
    let normalized = normalize_tokens(
      &map(&[("google_oauth_token", "g-1"), ("openai_key", "sk-1"), ("custom", "c-1")]),
      &IndexMap::new(),
    );
    assert_eq!(normalized.get("googleAccessToken").map(String::as_str), Some("g-1"));
    assert_eq!(normalized.get("openAiApiKey").map(String::as_str), Some("sk-1"));
    assert_eq!(normalized.get("custom").map(String::as_str), Some("c-1"));
  }

  #[test]
  fn overrides_beat_defaults() {
    let normalized = normalize_tokens(
      &map(&[("google_token", "g-1")]),
      &map(&[("google_token", "legacyGoogleToken")]),
    );
    assert_eq!(normalized.get("legacyGoogleToken").map(String::as_str), Some("g-1"));
    assert!(!normalized.contains_key("googleAccessToken"));
  }

  #[test]
  fn alias_table_is_a_function() {
    let mut seen = std::collections::HashMap::new();
    for (alias, canonical) in TOKEN_ALIASES {
      if let Some(previous) = seen.insert(*alias, *canonical) {
        panic!("alias '{alias}' maps to both '{previous}' and '{canonical}'");
      }
    }
  }
}
