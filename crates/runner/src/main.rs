use std::sync::Arc;
use std::time::Duration;

use qae_gateway::{
    ExchangeRegistry, FanOut, ProfileRegistry, SessionState, WsClientFactory, load_config,
    load_default_config,
};
use qae_runner::{credentials_from_env, health_line};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const HEALTH_INTERVAL: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::from_default_env()
                .add_directive("qae_gateway=info".parse()?)
                .add_directive("qae_runner=info".parse()?),
        )
        .init();

    // A missing .env file is fine
    if let Ok(path) = dotenvy::dotenv() {
        tracing::info!(path = %path.display(), "Loaded environment file");
    }

    let config = match std::env::var("QAE_CONFIG") {
        Ok(path) => {
            tracing::info!(path = %path, "Loading feed config");
            load_config(&path)?
        }
        Err(_) => {
            tracing::info!("Using embedded default feed config");
            load_default_config()?
        }
    };
    config.validate()?;

    let mut factory = WsClientFactory::new();
    for venue in config.enabled_venues() {
        if let Some(endpoints) = venue.endpoints() {
            tracing::info!(venue = %venue.id, rest = %endpoints.rest, ws = %endpoints.ws, "Endpoint override");
            factory = factory.with_endpoints(venue.venue(), endpoints);
        }
    }

    let fan_out = FanOut::new(config.fan_out.to_fan_out_config());
    let registry = Arc::new(ExchangeRegistry::new(
        ProfileRegistry::builtin(),
        Arc::new(factory),
        fan_out.clone(),
        config.tracked_symbols(),
        config.session.to_session_config(),
    ));

    for venue in config.enabled_venues() {
        let id = venue.venue();
        let credentials = credentials_from_env(&id);
        if let Err(e) = registry.register_with_symbols(id, credentials, config.symbols_for(venue)) {
            tracing::error!(venue = %venue.id, error = %e, "Skipping venue");
        }
    }

    // Subscribe before starting so the first tickers are not missed
    let mut tickers = fan_out.subscribe();
    let consumer = tokio::spawn(async move {
        while let Some(ticker) = tickers.recv().await {
            tracing::debug!(
                venue = %ticker.venue,
                symbol = %ticker.symbol,
                bid = ?ticker.bid,
                ask = ?ticker.ask,
                last = ?ticker.last,
                "Ticker"
            );
        }
    });

    for health in registry.start_all().await {
        match health.state {
            SessionState::Failed => tracing::warn!("{}", health_line(&health)),
            _ => tracing::info!("{}", health_line(&health)),
        }
    }

    let reporter = tokio::spawn({
        let registry = Arc::clone(&registry);
        let fan_out = fan_out.clone();
        async move {
            let mut interval = tokio::time::interval(HEALTH_INTERVAL);
            interval.tick().await;
            loop {
                interval.tick().await;
                for health in registry.sessions() {
                    tracing::info!("{}", health_line(&health));
                }
                tracing::info!(
                    published = fan_out.total_published(),
                    dropped = fan_out.total_dropped(),
                    subscribers = fan_out.subscriber_count(),
                    "Fan-out stats"
                );
            }
        }
    });

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown requested");

    reporter.abort();
    registry.stop_all().await;
    consumer.abort();

    tracing::info!("Feed runner stopped");
    Ok(())
}
