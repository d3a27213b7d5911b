#![allow(dead_code, unused_imports)]
mod app;
mod database;
mod provider;

pub use app::{spawn_app, TestApp};
pub use database::{configure_database, customer, database_settings};
pub use provider::{mount_provider, mount_unverified_provider, JOYCE_EMAIL, JOYCE_NAME};

use lazy_static::lazy_static;

use customer_directory::telemetry::{generate_subscriber, init_subscriber};

lazy_static! {
    /// To ensure logs are only outputted in tests when required, by default
    /// tests run with no logs being captured
    ///
    /// In order to set logs to be captured during tests run them with:
    /// `TEST_LOG=true cargo test | bunyan`
    pub static ref TRACING: () = {
        let name = "test".to_string();
        if std::env::var("TEST_LOG").is_ok() {
            let subscriber = generate_subscriber(name, "debug".into(), std::io::stdout);
            init_subscriber(subscriber).expect("failed to set up test tracing");
        } else {
            let subscriber = generate_subscriber(name, "debug".into(), std::io::sink);
            init_subscriber(subscriber).expect("failed to set up test tracing");
        }
    };
}
