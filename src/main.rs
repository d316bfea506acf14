use anyhow::Context;
use weather_notifier::configuration::get_configuration;
use weather_notifier::startup::Application;
use weather_notifier::telemetry::{get_subscriber, init_subscriber};

#[rocket::main]
async fn main() -> Result<(), anyhow::Error> {
    let subscriber = get_subscriber("weather-notifier".into(), "info".into(), std::io::stdout);
    init_subscriber(subscriber)?;

    let configuration = get_configuration().context("Failed to read configuration")?;
    configuration.validate()?;

    let application = Application::build(&configuration).await?;
    application.run_until_stopped().await
}
