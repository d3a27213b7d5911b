use config::{Config, File};
use serde::Deserialize;
use serde_aux::field_attributes::deserialize_number_from_string;
use sqlx::postgres::PgConnectOptions;
use std::convert::{TryFrom, TryInto};
use std::env::var;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::StartupError;

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub application: ApplicationSettings,
    pub database: DatabaseSettings,
    pub oauth: OAuthSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApplicationSettings {
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub port: u16,
    pub host: String,
    #[serde(default)]
    pub secure_cookies: bool,
}

#[derive(Deserialize, Clone)]
pub struct DatabaseSettings {
    pub uri: String,
    pub username: String,
    pub password: String,
    pub database_name: String,
    pub collection: String,
    #[serde(
        default = "default_connect_timeout",
        deserialize_with = "deserialize_number_from_string"
    )]
    pub connect_timeout_seconds: u64,
}

#[derive(Deserialize, Clone)]
pub struct OAuthSettings {
    pub client_id: String,
    pub client_secret: String,
    /// Signing key for the per-attempt `state` tokens
    pub state_secret: String,
    #[serde(default = "default_redirect_url")]
    pub redirect_url: String,
    #[serde(default = "default_auth_url")]
    pub auth_url: String,
    #[serde(default = "default_token_url")]
    pub token_url: String,
    #[serde(default = "default_userinfo_url")]
    pub userinfo_url: String,
    #[serde(default = "default_scopes")]
    pub scopes: Vec<String>,
    /// Some providers hand back the durable identity assertion as an extra
    /// field on the token response. When that field is present it replaces
    /// the raw access token on the stored credential.
    #[serde(default = "default_identity_token_field")]
    pub identity_token_field: String,
    #[serde(
        default = "default_request_timeout",
        deserialize_with = "deserialize_number_from_string"
    )]
    pub request_timeout_seconds: u64,
    #[serde(
        default = "default_state_ttl",
        deserialize_with = "deserialize_number_from_string"
    )]
    pub state_ttl_seconds: i64,
}

#[derive(Debug)]
pub enum Environment {
    Local,
    Production,
}

fn default_connect_timeout() -> u64 {
    1
}

fn default_redirect_url() -> String {
    "http://localhost:8080/callback".to_string()
}

fn default_auth_url() -> String {
    "https://accounts.google.com/o/oauth2/auth".to_string()
}

fn default_token_url() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

fn default_userinfo_url() -> String {
    "https://www.googleapis.com/oauth2/v3/userinfo".to_string()
}

fn default_scopes() -> Vec<String> {
    vec!["email".to_string(), "profile".to_string()]
}

fn default_identity_token_field() -> String {
    "id_token".to_string()
}

fn default_request_timeout() -> u64 {
    10
}

fn default_state_ttl() -> i64 {
    600
}

/// Reads `configuration/base.yaml`, then the file for the current
/// `APP_ENVIRONMENT` and finally any `APP_*` environment variables, eg.
/// `APP_OAUTH__CLIENT_SECRET`.
pub fn get_configuration() -> Result<Settings, StartupError> {
    let base_path = std::env::current_dir()
        .map_err(|e| StartupError::Configuration(format!("unknown working directory: {}", e)))?;
    let configuration_directory = base_path.join("configuration");

    let environment: Environment = var("APP_ENVIRONMENT")
        .unwrap_or_else(|_| "local".into())
        .try_into()
        .map_err(StartupError::Configuration)?;

    let settings = Config::builder()
        .add_source(File::from(configuration_directory.join("base.yaml")).required(true))
        .add_source(
            File::from(configuration_directory.join(format!("{}.yaml", environment.as_str())))
                .required(true),
        )
        .add_source(
            config::Environment::with_prefix("app")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?
        .try_deserialize::<Settings>()?;

    settings.validate()?;
    Ok(settings)
}

impl Settings {
    /// Rejects values that would only fail later, once traffic is being served
    pub fn validate(&self) -> Result<(), StartupError> {
        let required = [
            ("oauth.client_id", &self.oauth.client_id),
            ("oauth.client_secret", &self.oauth.client_secret),
            ("oauth.state_secret", &self.oauth.state_secret),
            ("database.uri", &self.database.uri),
            ("database.database_name", &self.database.database_name),
        ];
        if let Some((key, _)) = required.iter().find(|(_, value)| value.trim().is_empty()) {
            return Err(StartupError::Configuration(format!("{} cannot be empty", key)));
        }
        if !is_identifier(&self.database.collection) {
            return Err(StartupError::Configuration(format!(
                "database.collection '{}' must only contain letters, digits and underscores",
                self.database.collection
            )));
        }
        if self.oauth.state_ttl_seconds <= 0 {
            return Err(StartupError::Configuration(
                "oauth.state_ttl_seconds must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

impl DatabaseSettings {
    /// Connection to the server itself, used to create databases
    pub fn without_db(&self) -> Result<PgConnectOptions, StartupError> {
        let options = PgConnectOptions::from_str(&self.uri)
            .map_err(|e| StartupError::Configuration(format!("invalid database.uri: {}", e)))?;
        Ok(options.username(&self.username).password(&self.password))
    }

    pub fn with_db(&self) -> Result<PgConnectOptions, StartupError> {
        Ok(self.without_db()?.database(&self.database_name))
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }
}

impl OAuthSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

impl fmt::Debug for DatabaseSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseSettings")
            .field("uri", &self.uri)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("database_name", &self.database_name)
            .field("collection", &self.collection)
            .field("connect_timeout_seconds", &self.connect_timeout_seconds)
            .finish()
    }
}

impl fmt::Debug for OAuthSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthSettings")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("state_secret", &"[REDACTED]")
            .field("redirect_url", &self.redirect_url)
            .field("auth_url", &self.auth_url)
            .field("token_url", &self.token_url)
            .field("userinfo_url", &self.userinfo_url)
            .field("scopes", &self.scopes)
            .field("identity_token_field", &self.identity_token_field)
            .field("request_timeout_seconds", &self.request_timeout_seconds)
            .field("state_ttl_seconds", &self.state_ttl_seconds)
            .finish()
    }
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Local => "local",
            Environment::Production => "production",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<String> for Environment {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "production" => Ok(Self::Production),
            other => Err(format!("{} is not a supported environment", other)),
        }
    }
}
