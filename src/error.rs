use actix_web::{
    error::ResponseError,
    http::{header::LOCATION, StatusCode},
    HttpResponse,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Every failure a request can run into once the service is up.
///
/// The OAuth variants carry the upstream detail so it can be logged, but it is
/// never part of the `Display` output and never reaches the browser.
#[derive(Debug, Error, PartialEq)]
pub enum DirectoryError {
    #[error("OAuth state did not match the login attempt")]
    InvalidState,

    #[error("Failed to exchange the authorization code")]
    TokenExchangeFailed(String),

    #[error("Failed to fetch the user profile")]
    UserInfoFetchFailed(String),

    #[error("User profile was malformed")]
    ProfileDecodeError(String),

    #[error("Identity provider has not verified the email address")]
    UnverifiedEmail,

    #[error("Validation failed for: {}", .0.join(", "))]
    ValidationFailed(Vec<String>),

    #[error("Identifier is not valid")]
    InvalidIdentifier(String),

    #[error("Could not find resource")]
    NotFound,

    #[error("A customer with that email already exists")]
    DuplicateEmail,

    #[error("A server error occurred")]
    StoreUnavailable,
}

/// Failures while booting. These never reach a client, `main` exits on them.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error("failed to load configuration")]
    ConfigSource(#[from] config::ConfigError),

    #[error("failed to connect to the customer store")]
    Database(#[from] sqlx::Error),

    #[error("failed to build the identity provider client")]
    HttpClient(#[from] reqwest::Error),

    #[error("failed to bind the listener")]
    Io(#[from] std::io::Error),
}

/// Where the browser is sent back to when the login flow fails
pub const LOGIN_FAILURE_REDIRECT: &str = "/";

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    fields: Option<&'a [String]>,
}

impl ErrorBody<'static> {
    fn new(error: &'static str) -> Self {
        Self {
            error,
            fields: None,
        }
    }
}

impl DirectoryError {
    pub fn is_login_failure(&self) -> bool {
        matches!(
            self,
            Self::InvalidState
                | Self::TokenExchangeFailed(_)
                | Self::UserInfoFetchFailed(_)
                | Self::ProfileDecodeError(_)
                | Self::UnverifiedEmail
        )
    }
}

impl ResponseError for DirectoryError {
    fn status_code(&self) -> StatusCode {
        match self {
            e if e.is_login_failure() => StatusCode::TEMPORARY_REDIRECT,
            Self::ValidationFailed(_) | Self::InvalidIdentifier(_) => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::DuplicateEmail => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            e if e.is_login_failure() => HttpResponse::TemporaryRedirect()
                .insert_header((LOCATION, LOGIN_FAILURE_REDIRECT))
                .finish(),
            Self::ValidationFailed(fields) => HttpResponse::BadRequest().json(ErrorBody {
                error: "validation_failed",
                fields: Some(fields.as_slice()),
            }),
            Self::InvalidIdentifier(_) => {
                HttpResponse::BadRequest().json(ErrorBody::new("invalid_identifier"))
            }
            Self::NotFound => HttpResponse::NotFound().json(ErrorBody::new("not_found")),
            Self::DuplicateEmail => {
                HttpResponse::Conflict().json(ErrorBody::new("duplicate_email"))
            }
            _ => HttpResponse::InternalServerError().finish(),
        }
    }
}

impl From<sqlx::Error> for DirectoryError {
    fn from(e: sqlx::Error) -> DirectoryError {
        match e {
            sqlx::Error::RowNotFound => DirectoryError::NotFound,
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                DirectoryError::DuplicateEmail
            }
            _ => {
                error!(err = ?e, "SQLx error occurred");
                DirectoryError::StoreUnavailable
            }
        }
    }
}

impl From<serde_json::Error> for DirectoryError {
    fn from(e: serde_json::Error) -> DirectoryError {
        error!(err = ?e, "JSON Serde error occurred");
        DirectoryError::ProfileDecodeError(e.to_string())
    }
}
