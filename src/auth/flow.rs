use chrono::Utc;
use std::fmt;
use std::sync::Arc;
use tracing::{error, info};

use crate::{
    auth::{IdentityProvider, StateTokens},
    configuration::OAuthSettings,
    directory::CustomerDirectory,
    models::{Customer, OAuthCredential, UserProfile},
    DirectoryError, Result,
};

/// Where to send the browser to start a login, and the state it must bring back
#[derive(Debug, Clone)]
pub struct LoginRedirect {
    pub url: String,
    pub state: String,
}

/// Steps of a callback, in order. A failure at any step ends the attempt, the
/// browser has to start again from `/login`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginStage {
    Validating,
    Exchanging,
    FetchingProfile,
    Provisioning,
    Completed,
}

impl LoginStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoginStage::Validating => "validating",
            LoginStage::Exchanging => "exchanging",
            LoginStage::FetchingProfile => "fetching_profile",
            LoginStage::Provisioning => "provisioning",
            LoginStage::Completed => "completed",
        }
    }
}

impl fmt::Display for LoginStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Drives the authorization code grant against the configured provider and
/// hands the verified identity to the directory.
#[derive(Clone)]
pub struct OAuthFlow {
    provider: Arc<dyn IdentityProvider>,
    directory: CustomerDirectory,
    state_tokens: StateTokens,
    identity_token_field: String,
}

fn failed(stage: LoginStage, err: DirectoryError) -> DirectoryError {
    error!(%stage, err = ?err, "login attempt failed");
    err
}

impl OAuthFlow {
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        directory: CustomerDirectory,
        config: &OAuthSettings,
    ) -> Self {
        Self {
            provider,
            directory,
            state_tokens: StateTokens::new(&config.state_secret, config.state_ttl_seconds),
            identity_token_field: config.identity_token_field.clone(),
        }
    }

    pub fn state_ttl_seconds(&self) -> i64 {
        self.state_tokens.ttl().num_seconds()
    }

    /// Mints the state for a new attempt and builds the provider redirect.
    /// Touches neither the store nor the network.
    #[tracing::instrument(skip(self))]
    pub fn begin_login(&self) -> Result<LoginRedirect> {
        let state = self.state_tokens.issue()?;
        let url = self.provider.authorization_url(&state);
        Ok(LoginRedirect { url, state })
    }

    /// `expected_state` is the value bound to the browser when the attempt
    /// started, `state` and `code` are what the provider sent back.
    #[tracing::instrument(skip_all)]
    pub async fn handle_callback(
        &self,
        expected_state: Option<&str>,
        state: &str,
        code: &str,
    ) -> Result<Customer> {
        self.state_tokens
            .verify(expected_state, state)
            .map_err(|e| failed(LoginStage::Validating, e))?;

        if code.is_empty() {
            return Err(failed(
                LoginStage::Exchanging,
                DirectoryError::TokenExchangeFailed("no authorization code on callback".into()),
            ));
        }
        let tokens = self.provider.exchange_code(code).await.map_err(|e| {
            failed(
                LoginStage::Exchanging,
                DirectoryError::TokenExchangeFailed(e.to_string()),
            )
        })?;
        let issued_at = Utc::now();

        let body = self
            .provider
            .fetch_user_info(&tokens.access_token)
            .await
            .map_err(|e| {
                failed(
                    LoginStage::FetchingProfile,
                    DirectoryError::UserInfoFetchFailed(e.to_string()),
                )
            })?;
        let profile =
            UserProfile::from_slice(&body).map_err(|e| failed(LoginStage::FetchingProfile, e))?;
        // Provisioning matches on email, an address the provider hasn't
        // verified must never resolve to an existing customer
        if !profile.verified_email {
            return Err(failed(
                LoginStage::FetchingProfile,
                DirectoryError::UnverifiedEmail,
            ));
        }

        let credential =
            OAuthCredential::from_token_set(&tokens, &self.identity_token_field, issued_at);
        let customer = self
            .directory
            .provision(profile, credential)
            .await
            .map_err(|e| failed(LoginStage::Provisioning, e))?;

        info!(stage = %LoginStage::Completed, id = %customer.id, "login completed");
        Ok(customer)
    }
}
