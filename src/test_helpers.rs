use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::{
    auth::{IdentityProvider, ProviderError},
    configuration::{ApplicationSettings, DatabaseSettings, OAuthSettings, Settings},
    database::{CustomerFilter, CustomerStore, MemoryDatabase},
    models::{Customer, CustomerId, CustomerUpdate, OAuthCredential, TokenSet},
    Result,
};

pub fn test_settings() -> Settings {
    Settings {
        application: ApplicationSettings {
            port: 0,
            host: "127.0.0.1".to_string(),
            secure_cookies: false,
        },
        database: DatabaseSettings {
            uri: "postgres://localhost:5432".to_string(),
            username: "directory".to_string(),
            password: "db-pa55word-xyz".to_string(),
            database_name: "customer".to_string(),
            collection: "customers".to_string(),
            connect_timeout_seconds: 1,
        },
        oauth: OAuthSettings {
            client_id: "test-client-id.apps.googleusercontent.com".to_string(),
            client_secret: "GOCSPX-test-client-secret".to_string(),
            state_secret: "test-state-signing-secret".to_string(),
            redirect_url: "http://localhost:8080/callback".to_string(),
            auth_url: "https://accounts.google.com/o/oauth2/auth".to_string(),
            token_url: "https://oauth2.googleapis.com/token".to_string(),
            userinfo_url: "https://www.googleapis.com/oauth2/v3/userinfo".to_string(),
            scopes: vec!["email".to_string(), "profile".to_string()],
            identity_token_field: "id_token".to_string(),
            request_timeout_seconds: 10,
            state_ttl_seconds: 600,
        },
    }
}

pub fn sample_customer(email: &str) -> Customer {
    Customer {
        id: CustomerId::new(),
        name: "Joyce Aquino".to_string(),
        email: email.to_string(),
        cpf: Some("99999999999".to_string()),
        image: "image/profile.jpg".to_string(),
        created_at: Utc::now(),
        o_auth: OAuthCredential {
            access_token: "eyJ.identity".to_string(),
            token_type: "Bearer".to_string(),
            refresh_token: String::new(),
            expiry: None,
        },
    }
}

enum StubBehaviour {
    Profile(Vec<u8>),
    FailExchange,
    FailUserInfo,
}

/// Identity provider that never leaves the process and counts its calls
pub struct StubProvider {
    behaviour: StubBehaviour,
    exchange_calls: AtomicUsize,
    user_info_calls: AtomicUsize,
}

impl StubProvider {
    pub const ID_TOKEN: &'static str = "eyJhbGciOiJSUzI1NiJ9.stub-identity";

    fn new(behaviour: StubBehaviour) -> Self {
        Self {
            behaviour,
            exchange_calls: AtomicUsize::new(0),
            user_info_calls: AtomicUsize::new(0),
        }
    }

    pub fn returning(name: &str, email: &str) -> Self {
        Self::with_profile(name, email, true)
    }

    /// A profile whose email the provider has not verified
    pub fn unverified(name: &str, email: &str) -> Self {
        Self::with_profile(name, email, false)
    }

    fn with_profile(name: &str, email: &str, verified: bool) -> Self {
        let body = json!({
            "name": name,
            "email": email,
            "verified_email": verified,
            "picture": "https://lh3.googleusercontent.com/a/photo.jpg"
        });
        Self::with_body(body.to_string().into_bytes())
    }

    pub fn with_body(body: Vec<u8>) -> Self {
        Self::new(StubBehaviour::Profile(body))
    }

    pub fn failing_exchange() -> Self {
        Self::new(StubBehaviour::FailExchange)
    }

    pub fn failing_user_info() -> Self {
        Self::new(StubBehaviour::FailUserInfo)
    }

    pub fn exchange_calls(&self) -> usize {
        self.exchange_calls.load(Ordering::SeqCst)
    }

    pub fn user_info_calls(&self) -> usize {
        self.user_info_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityProvider for StubProvider {
    fn authorization_url(&self, state: &str) -> String {
        format!(
            "https://accounts.google.com/o/oauth2/auth?client_id={}&state={}",
            test_settings().oauth.client_id,
            state
        )
    }

    async fn exchange_code(&self, _code: &str) -> std::result::Result<TokenSet, ProviderError> {
        self.exchange_calls.fetch_add(1, Ordering::SeqCst);
        if let StubBehaviour::FailExchange = self.behaviour {
            return Err(ProviderError::Rejected {
                error: "invalid_grant".to_string(),
                description: "Bad Request".to_string(),
            });
        }
        let mut extra = HashMap::new();
        extra.insert("id_token".to_string(), json!(Self::ID_TOKEN));
        Ok(TokenSet {
            access_token: "ya29.stub-access".to_string(),
            token_type: "Bearer".to_string(),
            refresh_token: None,
            expires_in: Some(3599),
            extra,
        })
    }

    async fn fetch_user_info(&self, _token: &str) -> std::result::Result<Vec<u8>, ProviderError> {
        self.user_info_calls.fetch_add(1, Ordering::SeqCst);
        match &self.behaviour {
            StubBehaviour::Profile(body) => Ok(body.clone()),
            _ => Err(ProviderError::Status {
                status: 503,
                body: "backend unavailable".to_string(),
            }),
        }
    }
}

/// Wraps the in-memory store and counts how often each primitive is hit
#[derive(Default)]
pub struct CountingStore {
    inner: MemoryDatabase,
    calls: AtomicUsize,
}

impl CountingStore {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CustomerStore for CountingStore {
    async fn insert_one(&self, customer: Customer) -> Result<Customer> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.insert_one(customer).await
    }

    async fn find_one(&self, filter: CustomerFilter) -> Result<Option<Customer>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.find_one(filter).await
    }

    async fn find_one_and_update(
        &self,
        filter: CustomerFilter,
        update: CustomerUpdate,
    ) -> Result<Option<Customer>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.find_one_and_update(filter, update).await
    }

    async fn delete_one(&self, filter: CustomerFilter) -> Result<bool> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.delete_one(filter).await
    }
}
