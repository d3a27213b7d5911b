use reqwest::{redirect::Policy, Client, ClientBuilder};
use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;
use wiremock::MockServer;

use customer_directory::{
    auth::GoogleOAuthClient,
    build_app,
    configuration::{ApplicationSettings, DatabaseSettings, OAuthSettings, Settings},
    database::MemoryDatabase,
};

use crate::helpers::TRACING;

pub struct TestApp {
    pub address: String,
    pub store: Arc<MemoryDatabase>,
    pub provider: MockServer,
    pub settings: Settings,
    /// Keeps cookies between requests and never follows redirects, so each
    /// hop of the login flow can be inspected
    pub client: Client,
}

fn test_settings(provider: &MockServer) -> Settings {
    Settings {
        application: ApplicationSettings {
            port: 0,
            host: "127.0.0.1".to_string(),
            secure_cookies: false,
        },
        database: DatabaseSettings {
            uri: "postgres://localhost:5432".to_string(),
            username: "postgres".to_string(),
            password: "password".to_string(),
            database_name: "customer".to_string(),
            collection: "customers".to_string(),
            connect_timeout_seconds: 1,
        },
        oauth: OAuthSettings {
            client_id: "integration-client.apps.googleusercontent.com".to_string(),
            client_secret: "GOCSPX-integration-secret".to_string(),
            state_secret: "integration-state-secret".to_string(),
            redirect_url: "http://127.0.0.1/callback".to_string(),
            auth_url: format!("{}/o/oauth2/auth", provider.uri()),
            token_url: format!("{}/token", provider.uri()),
            userinfo_url: format!("{}/userinfo", provider.uri()),
            scopes: vec!["email".to_string(), "profile".to_string()],
            identity_token_field: "id_token".to_string(),
            request_timeout_seconds: 2,
            state_ttl_seconds: 600,
        },
    }
}

pub async fn spawn_app() -> TestApp {
    lazy_static::initialize(&TRACING);

    let provider = MockServer::start().await;
    let settings = test_settings(&provider);

    let listener = TcpListener::bind("127.0.0.1:0").expect("failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    let store = Arc::new(MemoryDatabase::new());
    let google = GoogleOAuthClient::new(&settings.oauth).expect("failed to build oauth client");
    let server = build_app(listener, store.clone(), Arc::new(google), &settings)
        .expect("failed to bind address");
    let _ = tokio::spawn(server);

    let client = ClientBuilder::new()
        .cookie_store(true)
        .redirect(Policy::none())
        .timeout(Duration::from_secs(10))
        .build()
        .expect("failed to build http client");

    TestApp {
        address: format!("http://127.0.0.1:{}", port),
        store,
        provider,
        settings,
        client,
    }
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }
}
