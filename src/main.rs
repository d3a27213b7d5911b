use customer_directory::{
    get_configuration,
    telemetry::{generate_subscriber, init_subscriber},
    Application,
};

#[actix_rt::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = generate_subscriber(
        String::from("customer-directory"),
        String::from("info"),
        std::io::stdout,
    );
    init_subscriber(subscriber)?;

    let configuration = get_configuration()?;
    let application = Application::build(configuration).await.map_err(|e| {
        tracing::error!(err = ?e, "failed to start");
        e
    })?;
    application.run_until_stopped().await?;
    Ok(())
}
