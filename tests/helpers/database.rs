use chrono::Utc;
use sqlx::{Connection, Executor, PgConnection};
use uuid::Uuid;

use customer_directory::{
    configuration::DatabaseSettings,
    database::CustomerDatabase,
    models::{Customer, CustomerId, OAuthCredential},
};

/// Same server as `configuration/base.yaml`, with a fresh database per test
pub fn database_settings() -> DatabaseSettings {
    DatabaseSettings {
        uri: std::env::var("TEST_DATABASE_URI")
            .unwrap_or_else(|_| "postgres://localhost:5432".to_string()),
        username: "postgres".to_string(),
        password: "password".to_string(),
        database_name: Uuid::new_v4().to_string(),
        collection: "customers".to_string(),
        connect_timeout_seconds: 5,
    }
}

/// Creates the database named in `config` and connects the store to it, which
/// also creates the collection and its indexes
pub async fn configure_database(config: &DatabaseSettings) -> CustomerDatabase {
    let options = config.without_db().expect("invalid database settings");
    let mut connection = PgConnection::connect_with(&options)
        .await
        .expect("failed to connect to postgres");
    connection
        .execute(&*format!(r#"CREATE DATABASE "{}";"#, config.database_name))
        .await
        .expect("failed to create database");

    CustomerDatabase::connect(config)
        .await
        .expect("failed to connect the customer store")
}

pub fn customer(email: &str) -> Customer {
    Customer {
        id: CustomerId::new(),
        name: "Joyce Aquino".to_string(),
        email: email.to_string(),
        cpf: Some("99999999999".to_string()),
        image: "image/profile.jpg".to_string(),
        created_at: Utc::now(),
        o_auth: OAuthCredential {
            access_token: "eyJhbGciOiJSUzI1NiJ9.identity".to_string(),
            token_type: "Bearer".to_string(),
            refresh_token: "1//refresh".to_string(),
            expiry: Some(Utc::now()),
        },
    }
}
