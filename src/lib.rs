pub mod auth;
pub mod configuration;
pub mod database;
pub mod directory;
mod error;
pub mod models;
pub mod routes;
mod startup;
pub mod telemetry;

#[cfg(test)]
mod test_helpers;

pub use configuration::get_configuration;
pub use directory::CustomerDirectory;
pub use error::{DirectoryError, StartupError, LOGIN_FAILURE_REDIRECT};
pub use startup::{build_app, Application};

pub type Result<T, E = DirectoryError> = std::result::Result<T, E>;
