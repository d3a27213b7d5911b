use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

/// Token endpoint response. Anything the provider sends beyond the standard
/// fields ends up in `extra`.
#[derive(Clone, Deserialize, Serialize, PartialEq)]
pub struct TokenSet {
    pub access_token: String,
    #[serde(default)]
    pub token_type: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

/// Credential captured when a customer is provisioned
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OAuthCredential {
    pub access_token: String,
    pub token_type: String,
    pub refresh_token: String,
    pub expiry: Option<DateTime<Utc>>,
}

impl TokenSet {
    /// The provider specific extra field, if it was sent as a non-empty string
    pub fn extra_str(&self, field: &str) -> Option<&str> {
        self.extra
            .get(field)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }
}

impl OAuthCredential {
    /// `identity_token_field` names the extra token response field that, when
    /// present, is stored in place of the raw access token.
    pub fn from_token_set(
        tokens: &TokenSet,
        identity_token_field: &str,
        issued_at: DateTime<Utc>,
    ) -> Self {
        let access_token = tokens
            .extra_str(identity_token_field)
            .unwrap_or(&tokens.access_token)
            .to_string();
        Self {
            access_token,
            token_type: tokens.token_type.clone(),
            refresh_token: tokens.refresh_token.clone().unwrap_or_default(),
            expiry: tokens
                .expires_in
                .map(|seconds| issued_at + Duration::seconds(seconds)),
        }
    }
}

fn redact(value: &str) -> &'static str {
    if value.is_empty() {
        ""
    } else {
        "[REDACTED]"
    }
}

impl fmt::Debug for OAuthCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthCredential")
            .field("access_token", &redact(&self.access_token))
            .field("token_type", &self.token_type)
            .field("refresh_token", &redact(&self.refresh_token))
            .field("expiry", &self.expiry)
            .finish()
    }
}

impl fmt::Debug for TokenSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenSet")
            .field("access_token", &redact(&self.access_token))
            .field("token_type", &self.token_type)
            .field(
                "refresh_token",
                &self.refresh_token.as_deref().map(redact),
            )
            .field("expires_in", &self.expires_in)
            .field("extra", &self.extra.keys().collect::<Vec<_>>())
            .finish()
    }
}
