use serde_json::{json, Value};
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const JOYCE_NAME: &str = "Joyce Aquino";
pub const JOYCE_EMAIL: &str = "joycesaquino@gmail.com";

/// Mounts a token endpoint that accepts `code` and a userinfo endpoint
/// returning Joyce's verified profile, each expected to be hit `calls` times
pub async fn mount_provider(server: &MockServer, code: &str, calls: u64) {
    let profile = json!({
        "sub": "110169484474386276334",
        "name": JOYCE_NAME,
        "email": JOYCE_EMAIL,
        "email_verified": true,
        "picture": "https://lh3.googleusercontent.com/a/photo.jpg"
    });
    mount_profile(server, code, calls, profile).await;
}

/// Like [`mount_provider`], but userinfo reports `email` as unverified
pub async fn mount_unverified_provider(server: &MockServer, code: &str, email: &str, calls: u64) {
    let profile = json!({
        "sub": "998877665544332211000",
        "name": "Mallory",
        "email": email,
        "email_verified": false
    });
    mount_profile(server, code, calls, profile).await;
}

/// The access token handed out for `code` is unique to it, so several
/// identities can be mounted on one server
async fn mount_profile(server: &MockServer, code: &str, calls: u64, profile: Value) {
    let access_token = format!("ya29.{}", code);

    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains(&format!("code={}", code)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": access_token,
            "token_type": "Bearer",
            "expires_in": 3599,
            "id_token": format!("eyJhbGciOiJSUzI1NiJ9.{}", code)
        })))
        .expect(calls)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/userinfo"))
        .and(header("authorization", format!("Bearer {}", access_token).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(profile))
        .expect(calls)
        .mount(server)
        .await;
}
