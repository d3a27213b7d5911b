use actix_web::{
    cookie::{time::Duration, Cookie, SameSite},
    http::header::LOCATION,
    web, HttpRequest, HttpResponse,
};
use serde::Deserialize;
use tracing::warn;

use crate::{
    auth::{OAuthFlow, STATE_COOKIE},
    configuration::ApplicationSettings,
    error::LOGIN_FAILURE_REDIRECT,
};

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub code: String,
    /// Set by the provider when the user declines the consent screen
    pub error: Option<String>,
}

fn state_cookie(value: String, max_age: Duration, secure: bool) -> Cookie<'static> {
    Cookie::build(STATE_COOKIE, value)
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(max_age)
        .finish()
}

/// Starts a login attempt: binds a fresh state to the browser through a
/// cookie and redirects to the provider's consent screen.
#[tracing::instrument(skip(flow, settings))]
pub async fn login(
    flow: web::Data<OAuthFlow>,
    settings: web::Data<ApplicationSettings>,
) -> HttpResponse {
    match flow.begin_login() {
        Ok(redirect) => HttpResponse::TemporaryRedirect()
            .insert_header((LOCATION, redirect.url))
            .cookie(state_cookie(
                redirect.state,
                Duration::seconds(flow.state_ttl_seconds()),
                settings.secure_cookies,
            ))
            .finish(),
        Err(_) => HttpResponse::TemporaryRedirect()
            .insert_header((LOCATION, LOGIN_FAILURE_REDIRECT))
            .finish(),
    }
}

/// Completes a login attempt.
///
/// On success responds `201 Created` pointing at the customer. Any failure,
/// whatever the cause, sends the browser back to the index page. The state
/// cookie is single use and is cleared in both cases.
#[tracing::instrument(skip(req, flow, settings, query), fields(provider_error = ?query.error))]
pub async fn callback(
    req: HttpRequest,
    flow: web::Data<OAuthFlow>,
    settings: web::Data<ApplicationSettings>,
    query: web::Query<CallbackQuery>,
) -> HttpResponse {
    let expected = req.cookie(STATE_COOKIE).map(|c| c.value().to_string());
    if query.error.is_some() {
        warn!("identity provider returned an error on the callback");
    }

    let mut removal = state_cookie(String::new(), Duration::ZERO, settings.secure_cookies);
    removal.make_removal();

    match flow
        .handle_callback(expected.as_deref(), &query.state, &query.code)
        .await
    {
        Ok(customer) => HttpResponse::Created()
            .insert_header((LOCATION, format!("/customer/{}", customer.id)))
            .cookie(removal)
            .finish(),
        Err(_) => HttpResponse::TemporaryRedirect()
            .insert_header((LOCATION, LOGIN_FAILURE_REDIRECT))
            .cookie(removal)
            .finish(),
    }
}
