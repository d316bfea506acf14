use crate::advisory::Advisor;
use crate::bot::{BotHandler, UpdatePoller};
use crate::configuration::{ApplicationSettings, Settings};
use crate::delivery::DeliveryChannel;
use crate::listening_port::{self, ListeningPort};
use crate::registry::{PgRegistry, SubscriberRegistry};
use crate::routes::*;
use crate::scheduler::{NotificationScheduler, Notifier, SchedulerClock};
use crate::telegram::TelegramClient;
use crate::weather::{WeatherGateway, WttrClient};
use anyhow::Context;
use rocket::config::LogLevel;
use rocket::{Build, Config, Ignite, Rocket, Shutdown};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Every long-lived component, wired and ready to run.
pub struct Application {
    pub server: Rocket<Ignite>,
    pub port: ListeningPort,
    pub scheduler: Arc<NotificationScheduler>,
    poller: UpdatePoller,
}

impl Application {
    pub async fn build(configuration: &Settings) -> Result<Application, anyhow::Error> {
        let registry = PgRegistry::connect(&configuration.database)
            .context("Failed to connect to Postgres")?;
        registry.run_migrations().await?;
        let registry: Arc<dyn SubscriberRegistry> = Arc::new(registry);

        let telegram = Arc::new(TelegramClient::new(&configuration.telegram)?);
        let gateway: Arc<dyn WeatherGateway> = Arc::new(WttrClient::new(&configuration.weather)?);
        let advisor = Advisor::from_settings(&configuration.advisory)?;
        if !advisor.is_configured() {
            tracing::info!("No advisory API key configured, clothing advice is disabled");
        }
        let clock = SchedulerClock::from_settings(&configuration.scheduler)?;

        let channel: Arc<dyn DeliveryChannel> = telegram.clone();
        let notifier = Notifier::new(gateway, channel, advisor);
        let scheduler = Arc::new(NotificationScheduler::new(
            Arc::clone(&registry),
            notifier,
            clock,
        ));
        let handler = Arc::new(BotHandler::new(registry, Arc::clone(&scheduler)));
        let poller = UpdatePoller::new(
            telegram,
            handler,
            Duration::from_secs(configuration.application.startup_delay_seconds),
        );

        let (server, port) = http_server(&configuration.application, Arc::clone(&scheduler));
        let server = server
            .ignite()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to configure the HTTP server: {:?}", e.kind()))?;

        Ok(Application {
            server,
            port,
            scheduler,
            poller,
        })
    }

    /// Runs until the HTTP server shuts down (Ctrl-C or SIGTERM), then stops
    /// the scheduler and the poller.
    pub async fn run_until_stopped(self) -> Result<(), anyhow::Error> {
        let Application {
            server,
            scheduler,
            poller,
            ..
        } = self;

        scheduler.start().await;
        let (stop_polling, polling_stopped) = watch::channel(false);
        let poller = tokio::spawn(poller.run(polling_stopped));
        let terminate = tokio::spawn(notify_on_terminate(server.shutdown()));

        let served = server.launch().await;
        tracing::info!("HTTP server stopped, shutting down");
        terminate.abort();

        scheduler.stop().await;
        // The poller may have exited on its own already.
        let _ = stop_polling.send(true);
        if let Err(e) = poller.await {
            tracing::error!(error.cause_chain = ?e, "The update poller ended abnormally");
        }

        served
            .map(|_| ())
            .map_err(|e| anyhow::anyhow!("The HTTP server failed: {:?}", e.kind()))
    }
}

/// The health surface. Binds to a random port when none is configured.
pub fn http_server(
    settings: &ApplicationSettings,
    scheduler: Arc<NotificationScheduler>,
) -> (Rocket<Build>, ListeningPort) {
    let (port_reporter, port) = listening_port::create_pair();
    let rocket = rocket::custom(Config {
        address: settings.host,
        port: settings.port.unwrap_or(0),
        log_level: LogLevel::Off,
        ..Config::release_default()
    })
    .attach(port_reporter)
    .manage(scheduler)
    .mount("/", routes![index, health, status]);
    (rocket, port)
}

#[cfg(unix)]
async fn notify_on_terminate(shutdown: Shutdown) {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut terminate) => {
            terminate.recv().await;
            tracing::info!("SIGTERM received");
            shutdown.notify();
        }
        Err(e) => tracing::warn!(error.cause_chain = ?e, "Cannot listen for SIGTERM"),
    }
}

#[cfg(not(unix))]
async fn notify_on_terminate(_shutdown: Shutdown) {}
