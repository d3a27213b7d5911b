use actix_web::{dev::Server, error::InternalError, web, App, HttpResponse, HttpServer};
use std::net::TcpListener;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_actix_web::TracingLogger;

use crate::{
    auth::{GoogleOAuthClient, IdentityProvider, OAuthFlow},
    configuration::Settings,
    database::{CustomerDatabase, CustomerStore},
    directory::CustomerDirectory,
    error::StartupError,
    routes::*,
};

/// A bound, ready to run server. Building it is the only place the service
/// reaches out to its collaborators at boot.
pub struct Application {
    port: u16,
    server: Server,
}

impl Application {
    pub async fn build(settings: Settings) -> Result<Self, StartupError> {
        let database = CustomerDatabase::connect(&settings.database).await?;
        let provider = GoogleOAuthClient::new(&settings.oauth)?;

        let address = format!(
            "{}:{}",
            settings.application.host, settings.application.port
        );
        let listener = TcpListener::bind(&address)?;
        let port = listener.local_addr()?.port();
        info!(%address, port, "listening");

        let server = build_app(listener, Arc::new(database), Arc::new(provider), &settings)?;
        Ok(Self { port, server })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> Result<(), std::io::Error> {
        self.server.await
    }
}

pub fn build_app(
    listener: TcpListener,
    store: Arc<dyn CustomerStore>,
    provider: Arc<dyn IdentityProvider>,
    settings: &Settings,
) -> Result<Server, std::io::Error> {
    let directory = CustomerDirectory::new(store);
    let flow = OAuthFlow::new(provider, directory.clone(), &settings.oauth);

    let directory = web::Data::new(directory);
    let flow = web::Data::new(flow);
    let application = web::Data::new(settings.application.clone());

    let server = HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .app_data(json_config())
            .app_data(directory.clone())
            .app_data(flow.clone())
            .app_data(application.clone())
            .route("/", web::get().to(index))
            .route("/health_check", web::get().to(health_check))
            .route("/login", web::get().to(login))
            .route("/callback", web::get().to(callback))
            .service(
                web::resource("/customer")
                    .route(web::post().to(create)),
            )
            .service(
                web::resource("/customer/{key}")
                    .route(web::get().to(find_by_id))
                    .route(web::put().to(update_by_email))
                    .route(web::delete().to(delete_by_id)),
            )
    })
    .listen(listener)?
    .run();

    Ok(server)
}

/// Malformed or unexpected request bodies get the same shape as a validation
/// failure instead of actix's plain text error
fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        warn!(err = %err, "rejected request body");
        let body = serde_json::json!({
            "error": "validation_failed",
            "fields": ["body"],
            "detail": err.to_string(),
        });
        InternalError::from_response(err, HttpResponse::BadRequest().json(body)).into()
    })
}
