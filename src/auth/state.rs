use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use tracing::{error, warn};
use uuid::Uuid;

use crate::{DirectoryError, Result};

/// Cookie the issued state is bound to for the duration of one login attempt
pub const STATE_COOKIE: &str = "oauth_state";

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct StateClaims {
    pub nonce: Uuid,
    pub iat: usize,
    pub exp: usize,
}

/// Issues and checks the anti-CSRF `state` value of the authorization code
/// flow.
///
/// Every login attempt gets its own signed, expiring token. The same value is
/// handed to the browser as a cookie, so a callback is only accepted from the
/// browser that started the attempt.
#[derive(Clone)]
pub struct StateTokens {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
}

impl StateTokens {
    pub fn new(secret: &str, ttl_seconds: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::seconds(ttl_seconds),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn issue(&self) -> Result<String> {
        self.issue_at(Utc::now())
    }

    fn issue_at(&self, issued_at: DateTime<Utc>) -> Result<String> {
        let claims = StateClaims {
            nonce: Uuid::new_v4(),
            iat: issued_at.timestamp() as usize,
            exp: (issued_at + self.ttl).timestamp() as usize,
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key).map_err(|e| {
            error!(err = ?e, "failed to sign oauth state");
            DirectoryError::InvalidState
        })
    }

    /// `expected` is the value bound to the browser, `received` is what came
    /// back on the callback.
    #[tracing::instrument(skip_all)]
    pub fn verify(&self, expected: Option<&str>, received: &str) -> Result<StateClaims> {
        let expected = expected.ok_or_else(|| {
            warn!("callback arrived without a state cookie");
            DirectoryError::InvalidState
        })?;
        if received.is_empty() || !bool::from(expected.as_bytes().ct_eq(received.as_bytes())) {
            warn!("callback state does not match the login attempt");
            return Err(DirectoryError::InvalidState);
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        decode::<StateClaims>(received, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                warn!(err = ?e, "callback state failed verification");
                DirectoryError::InvalidState
            })
    }
}
