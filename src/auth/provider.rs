use async_trait::async_trait;
use reqwest::header::ACCEPT;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::{configuration::OAuthSettings, error::StartupError, models::TokenSet};

/// Errors from talking to the identity provider. These are logged in full but
/// never shown to the browser.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("request to identity provider failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("identity provider responded with {status}: {body}")]
    Status { status: u16, body: String },

    #[error("identity provider rejected the request: {error} ({description})")]
    Rejected { error: String, description: String },

    #[error("failed to parse identity provider response: {0}")]
    Parse(String),
}

/// The external authorization server
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Where the browser is sent to authorize, carrying `state` through the
    /// round trip
    fn authorization_url(&self, state: &str) -> String;

    async fn exchange_code(&self, code: &str) -> Result<TokenSet, ProviderError>;

    /// Raw userinfo body, decoding it is up to the caller
    async fn fetch_user_info(&self, access_token: &str) -> Result<Vec<u8>, ProviderError>;
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// Authorization code client for Google, or anything speaking the same
/// dialect at the configured endpoints
#[derive(Debug, Clone)]
pub struct GoogleOAuthClient {
    client_id: String,
    client_secret: String,
    redirect_url: String,
    scopes: Vec<String>,
    auth_url: Url,
    token_url: Url,
    userinfo_url: Url,
    http_client: reqwest::Client,
}

fn parse_url(key: &str, value: &str) -> Result<Url, StartupError> {
    Url::parse(value)
        .map_err(|e| StartupError::Configuration(format!("oauth.{} is not a valid url: {}", key, e)))
}

impl GoogleOAuthClient {
    #[tracing::instrument(skip_all, name = "GoogleOAuthClient::new")]
    pub fn new(config: &OAuthSettings) -> Result<Self, StartupError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            redirect_url: config.redirect_url.clone(),
            scopes: config.scopes.clone(),
            auth_url: parse_url("auth_url", &config.auth_url)?,
            token_url: parse_url("token_url", &config.token_url)?,
            userinfo_url: parse_url("userinfo_url", &config.userinfo_url)?,
            http_client,
        })
    }
}

async fn error_from_response(response: reqwest::Response) -> ProviderError {
    let status = response.status().as_u16();
    let body = match response.text().await {
        Ok(body) => body,
        Err(e) => return ProviderError::Http(e),
    };
    match serde_json::from_str::<ErrorResponse>(&body) {
        Ok(err) => ProviderError::Rejected {
            error: err.error,
            description: err.error_description.unwrap_or_default(),
        },
        Err(_) => ProviderError::Status { status, body },
    }
}

#[async_trait]
impl IdentityProvider for GoogleOAuthClient {
    #[tracing::instrument(skip(self, state), fields(client_id = %self.client_id))]
    fn authorization_url(&self, state: &str) -> String {
        let mut url = self.auth_url.clone();
        url.query_pairs_mut()
            .append_pair("client_id", &self.client_id)
            .append_pair("redirect_uri", &self.redirect_url)
            .append_pair("response_type", "code")
            .append_pair("scope", &self.scopes.join(" "))
            .append_pair("access_type", "offline")
            .append_pair("state", state);
        url.to_string()
    }

    #[tracing::instrument(skip(self, code), name = "GoogleOAuthClient::exchange_code")]
    async fn exchange_code(&self, code: &str) -> Result<TokenSet, ProviderError> {
        tracing::debug!("exchanging authorization code for tokens");

        let response = self
            .http_client
            .post(self.token_url.clone())
            .header(ACCEPT, "application/json")
            .form(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", self.redirect_url.as_str()),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let body = response.text().await?;
        serde_json::from_str::<TokenSet>(&body).map_err(|e| ProviderError::Parse(e.to_string()))
    }

    #[tracing::instrument(skip(self, access_token), name = "GoogleOAuthClient::fetch_user_info")]
    async fn fetch_user_info(&self, access_token: &str) -> Result<Vec<u8>, ProviderError> {
        let response = self
            .http_client
            .get(self.userinfo_url.clone())
            .bearer_auth(access_token)
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        Ok(response.bytes().await?.to_vec())
    }
}
