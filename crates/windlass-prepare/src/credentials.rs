//! Credential placeholder resolution.
//!
//! A node's credential entry may carry `id: "{{CRED_NAME}}"`. When the
//! developer key bag has `CRED_NAME`, the credential-type key is
//! translated to its canonical token name and the secret is emitted into
//! the resolved token map; the entry is marked resolved so executors skip
//! their own lookup.

use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;
use windlass_workflow::Workflow;

static CRED_PLACEHOLDER_RE: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"^\{\{\s*([A-Z0-9_]+)\s*\}\}$").expect("placeholder pattern"));

/// Credential-type key to canonical token name.
const CREDENTIAL_TOKEN_NAMES: &[(&str, &str)] = &[
  ("openRouterApi", "openRouterApiKey"),
  ("openAiApi", "openAiApiKey"),
  ("anthropicApi", "anthropicApiKey"),
  ("huggingFaceApi", "huggingFaceApiKey"),
  ("googleApi", "googleAccessToken"),
  ("googleOAuth2Api", "googleAccessToken"),
  ("googleDriveOAuth2Api", "googleAccessToken"),
  ("googleSheetsOAuth2Api", "googleAccessToken"),
  ("gmailOAuth2", "googleAccessToken"),
  ("slackApi", "slackAccessToken"),
  ("tikTokApi", "tikTokAccessToken"),
];

/// Canonical token name for a credential-type key. Unknown types map to
/// themselves so their secrets still reach the token bag.
pub fn canonical_token_name(credential_type: &str) -> &str {
  CREDENTIAL_TOKEN_NAMES
    .iter()
    .find(|(key, _)| *key == credential_type)
    .map(|(_, canonical)| *canonical)
    .unwrap_or(credential_type)
}

/// Resolve every `{{CRED_NAME}}` credential id found in the workflow
/// against `developer_keys`. Returns the resolved token map keyed by
/// canonical token names.
pub fn resolve_credential_placeholders(
  workflow: &mut Workflow,
  developer_keys: &IndexMap<String, String>,
) -> IndexMap<String, String> {
  let mut resolved = IndexMap::new();

  for node in &mut workflow.nodes {
    let Some(credentials) = node.credentials.as_mut() else {
      continue;
    };
    for (credential_type, entry) in credentials.iter_mut() {
      let Some(capture) = CRED_PLACEHOLDER_RE.captures(&entry.id) else {
        continue;
      };
      let Some(secret) = developer_keys.get(&capture[1]) else {
        continue;
      };
      resolved.insert(canonical_token_name(credential_type).to_string(), secret.clone());
      entry.resolved = true;
    }
  }

  resolved
}
