//! Connection Session
//!
//! Owns the connection to one venue: builds the public (and optionally
//! private) client, loads the catalog under a deadline, opens the
//! subscriptions the venue profile allows, and keeps them alive.
//!
//! Two recovery policies, deliberately separate:
//! - setup errors (client construction, catalog load) end the run in
//!   `Failed` and are never retried automatically
//! - transport errors while streaming are retried after a fixed delay,
//!   forever, until the session is stopped
//!
//! Every run executes on a spawned driver task that is the only writer of the
//! session's health; `stop()` cancels it and waits for its teardown.

use std::collections::HashSet;
use std::sync::Arc;

use qae_core::{Credentials, Symbol, Ticker, VenueId};
use tokio::sync::{Mutex, broadcast, watch};
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;

use crate::domain::{
    ClientFactory, Coverage, SessionHealth, SessionState, StateTransition, SubscriptionPlan,
    SubscriptionStrategy, VenueClient, VenueProfile,
};
use crate::error::{GatewayError, TransportError};
use crate::presentation::FanOut;

use super::config::SessionConfig;

const TRANSITION_BUFFER: usize = 64;

/// One active run of a session
struct Run {
    token: CancellationToken,
    driver: JoinHandle<()>,
}

/// Clients opened by the current run, closed on every exit path
#[derive(Default)]
struct OpenClients {
    public: Option<Arc<dyn VenueClient>>,
    private: Option<Arc<dyn VenueClient>>,
}

impl OpenClients {
    async fn close_all(&mut self, venue: &VenueId) {
        if let Some(private) = self.private.take()
            && let Err(e) = private.close().await
        {
            tracing::warn!(venue = %venue, error = %e, "Failed to close private client");
        }
        if let Some(public) = self.public.take()
            && let Err(e) = public.close().await
        {
            tracing::warn!(venue = %venue, error = %e, "Failed to close public client");
        }
        tracing::debug!(venue = %venue, "Venue clients closed");
    }
}

/// State shared between the session handle and its driver tasks
struct SessionContext {
    venue: VenueId,
    profile: VenueProfile,
    credentials: Option<Credentials>,
    symbols: Vec<Symbol>,
    config: SessionConfig,
    factory: Arc<dyn ClientFactory>,
    fan_out: FanOut,
    health: watch::Sender<SessionHealth>,
    transitions: broadcast::Sender<StateTransition>,
    /// Streams currently waiting out the reconnect delay
    backing_off: parking_lot::Mutex<usize>,
}

impl SessionContext {
    fn transition(&self, to: SessionState) {
        let mut from = to;
        let changed = self.health.send_if_modified(|health| {
            from = health.state;
            health.state = to;
            from != to
        });

        if changed {
            tracing::info!(venue = %self.venue, from = %from, to = %to, "Session state changed");
            // No receivers is fine
            let _ = self.transitions.send(StateTransition {
                venue: self.venue.clone(),
                from,
                to,
                at: chrono::Utc::now(),
            });
        }
    }

    fn update(&self, modify: impl FnOnce(&mut SessionHealth)) {
        self.health.send_modify(modify);
    }

    fn fail(&self, error: GatewayError) {
        tracing::error!(venue = %self.venue, error = %error, "Session setup failed");
        let message = error.to_string();
        self.update(|health| {
            health.last_error = Some(message);
            health.is_private_enabled = false;
            health.subscribed_symbol_count = 0;
        });
        self.transition(SessionState::Failed);
    }

    /// Count a recovered transport error, returning the new retry count
    fn record_transport_error(&self, error: &TransportError) -> u64 {
        let mut retry_count = 0;
        let message = error.to_string();
        self.update(|health| {
            health.retry_count += 1;
            health.last_error = Some(message);
            retry_count = health.retry_count;
        });
        retry_count
    }

    fn enter_backoff(&self) {
        let mut backing_off = self.backing_off.lock();
        *backing_off += 1;
        if *backing_off == 1 {
            self.transition(SessionState::Reconnecting);
        }
    }

    fn leave_backoff(&self) {
        let mut backing_off = self.backing_off.lock();
        *backing_off = backing_off.saturating_sub(1);
        if *backing_off == 0 {
            self.transition(SessionState::Streaming);
        }
    }

    fn report_coverage(&self, coverage: &Coverage) {
        if !coverage.unlisted.is_empty() {
            tracing::warn!(
                venue = %self.venue,
                unlisted = ?coverage.unlisted,
                "Requested symbols not listed on venue, dropping"
            );
        }
        if !coverage.truncated.is_empty() {
            tracing::warn!(
                venue = %self.venue,
                subscribed = coverage.subscribed.len(),
                truncated = ?coverage.truncated,
                strategy = ?self.profile.strategy,
                "Symbol set exceeds venue limit, streaming degraded coverage"
            );
        }
    }

    async fn connect(
        &self,
        clients: &mut OpenClients,
    ) -> Result<(Arc<dyn VenueClient>, HashSet<Symbol>), GatewayError> {
        tracing::info!(venue = %self.venue, "Connecting");

        let public = self
            .factory
            .public_client(&self.venue)
            .await
            .map_err(|source| GatewayError::ClientUnavailable {
                venue: self.venue.clone(),
                source,
            })?;
        clients.public = Some(Arc::clone(&public));

        let private_enabled = match &self.credentials {
            Some(credentials) => self.open_private(credentials, clients).await,
            None => {
                tracing::info!(venue = %self.venue, "No credentials, using public API only");
                false
            }
        };

        let catalog = match tokio::time::timeout(self.config.catalog_timeout, public.load_catalog())
            .await
        {
            Ok(Ok(catalog)) => catalog,
            Ok(Err(source)) => {
                return Err(GatewayError::CatalogLoad {
                    venue: self.venue.clone(),
                    source,
                });
            }
            Err(_) => {
                return Err(GatewayError::CatalogLoadTimeout {
                    venue: self.venue.clone(),
                    timeout: self.config.catalog_timeout,
                });
            }
        };
        tracing::info!(venue = %self.venue, markets = catalog.len(), "Catalog loaded");

        self.update(|health| health.is_private_enabled = private_enabled);
        self.transition(if private_enabled {
            SessionState::ConnectedPublicAndPrivate
        } else {
            SessionState::ConnectedPublic
        });

        Ok((public, catalog))
    }

    /// Build the private client; any problem leaves the session public-only
    /// with the reason recorded in its health
    async fn open_private(&self, credentials: &Credentials, clients: &mut OpenClients) -> bool {
        let refusal = if !credentials.is_complete() {
            Some("credentials missing api key or secret".to_string())
        } else if self.profile.requires_passphrase && !credentials.has_passphrase() {
            Some("venue requires a passphrase for private access".to_string())
        } else {
            match self.factory.private_client(&self.venue, credentials).await {
                Ok(client) => {
                    clients.private = Some(client);
                    None
                }
                Err(e) => Some(e.to_string()),
            }
        };

        match refusal {
            None => {
                tracing::info!(venue = %self.venue, "Private API enabled");
                true
            }
            Some(reason) => {
                tracing::warn!(
                    venue = %self.venue,
                    reason = %reason,
                    "Private API unavailable, continuing public-only"
                );
                self.update(|health| health.last_error = Some(format!("private API disabled: {reason}")));
                false
            }
        }
    }
}

/// Driver task for one run
async fn drive(ctx: Arc<SessionContext>, token: CancellationToken) {
    let mut clients = OpenClients::default();

    let connected = tokio::select! {
        biased;
        _ = token.cancelled() => None,
        result = ctx.connect(&mut clients) => Some(result),
    };

    let (public, catalog) = match connected {
        None => {
            // stop() records the Stopped state once this task returns
            clients.close_all(&ctx.venue).await;
            return;
        }
        Some(Err(error)) => {
            clients.close_all(&ctx.venue).await;
            ctx.fail(error);
            return;
        }
        Some(Ok(connected)) => connected,
    };

    let plan = SubscriptionPlan::build(
        &ctx.profile,
        &ctx.symbols,
        &catalog,
        ctx.config.max_per_symbol_streams,
    );
    ctx.report_coverage(&plan.coverage);

    if plan.is_empty() {
        clients.close_all(&ctx.venue).await;
        ctx.update(|health| health.coverage = plan.coverage.clone());
        // Listed symbols that were all cut by the limit are a capacity problem
        if plan.coverage.truncated.is_empty() {
            ctx.fail(GatewayError::NoListedSymbols(ctx.venue.clone()));
        } else {
            ctx.fail(GatewayError::NoSubscriptionCapacity(ctx.venue.clone()));
        }
        return;
    }

    ctx.update(|health| {
        health.subscribed_symbol_count = plan.coverage.subscribed.len();
        health.coverage = plan.coverage.clone();
    });
    ctx.transition(SessionState::Streaming);
    tracing::info!(
        venue = %ctx.venue,
        symbols = plan.coverage.subscribed.len(),
        streams = plan.streams.len(),
        "Streaming started"
    );

    let mut streams = JoinSet::new();
    for symbols in plan.streams {
        streams.spawn(stream_loop(
            Arc::clone(&ctx),
            Arc::clone(&public),
            symbols,
            token.clone(),
        ));
    }

    while let Some(result) = streams.join_next().await {
        if let Err(e) = result
            && e.is_panic()
        {
            tracing::error!(venue = %ctx.venue, error = %e, "Stream task panicked");
        }
    }

    clients.close_all(&ctx.venue).await;
}

/// Receive loop for one subscription; returns only when cancelled
async fn stream_loop(
    ctx: Arc<SessionContext>,
    client: Arc<dyn VenueClient>,
    symbols: Vec<Symbol>,
    token: CancellationToken,
) {
    let wanted: HashSet<Symbol> = symbols.iter().cloned().collect();

    loop {
        let received = tokio::select! {
            biased;
            _ = token.cancelled() => break,
            result = receive(ctx.profile.strategy, client.as_ref(), &symbols) => result,
        };

        match received {
            Ok(tickers) => {
                for ticker in tickers {
                    if wanted.contains(&ticker.symbol) {
                        ctx.fan_out.publish(ticker);
                    }
                }
            }
            Err(error) => {
                let attempt = ctx.record_transport_error(&error);
                tracing::warn!(
                    venue = %ctx.venue,
                    symbols = ?symbols,
                    error = %error,
                    attempt,
                    delay_ms = ctx.config.reconnect_delay.as_millis() as u64,
                    "Stream error, reconnecting"
                );
                ctx.enter_backoff();

                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = tokio::time::sleep(ctx.config.reconnect_delay) => {}
                }

                tracing::info!(venue = %ctx.venue, symbols = ?symbols, attempt, "Resubscribing");
                ctx.leave_backoff();
            }
        }
    }

    tracing::debug!(venue = %ctx.venue, symbols = ?symbols, "Stream loop stopped");
}

async fn receive(
    strategy: SubscriptionStrategy,
    client: &dyn VenueClient,
    symbols: &[Symbol],
) -> Result<Vec<Ticker>, TransportError> {
    match (strategy, symbols) {
        (SubscriptionStrategy::PerSymbol, [symbol]) => {
            client.subscribe_one(symbol).await.map(|ticker| vec![ticker])
        }
        _ => client.subscribe_batch(symbols).await,
    }
}

/// Handle to the connection for one venue
pub struct ConnectionSession {
    ctx: Arc<SessionContext>,
    run: Mutex<Option<Run>>,
}

impl ConnectionSession {
    pub fn new(
        profile: VenueProfile,
        credentials: Option<Credentials>,
        symbols: Vec<Symbol>,
        config: SessionConfig,
        factory: Arc<dyn ClientFactory>,
        fan_out: FanOut,
    ) -> Self {
        let venue = profile.venue.clone();
        let (health, _) = watch::channel(SessionHealth::new(venue.clone()));
        let (transitions, _) = broadcast::channel(TRANSITION_BUFFER);

        ConnectionSession {
            ctx: Arc::new(SessionContext {
                venue,
                profile,
                credentials,
                symbols,
                config,
                factory,
                fan_out,
                health,
                transitions,
                backing_off: parking_lot::Mutex::new(0),
            }),
            run: Mutex::new(None),
        }
    }

    pub fn venue(&self) -> &VenueId {
        &self.ctx.venue
    }

    pub fn profile(&self) -> &VenueProfile {
        &self.ctx.profile
    }

    /// Symbols this session was asked to stream
    pub fn requested_symbols(&self) -> &[Symbol] {
        &self.ctx.symbols
    }

    /// Start connecting; returns once streaming has begun or setup failed
    ///
    /// Idempotent: calling it on a running session just waits for the
    /// current run to settle. A `Failed` or `Stopped` session starts a new run.
    pub async fn start(&self) -> SessionHealth {
        let mut health_rx = {
            let mut run = self.run.lock().await;
            let state = self.ctx.health.borrow().state;

            if state.can_start() {
                *self.ctx.backing_off.lock() = 0;
                self.ctx.update(|health| {
                    health.is_private_enabled = false;
                    health.subscribed_symbol_count = 0;
                    health.coverage = Coverage::default();
                });
                self.ctx.transition(SessionState::Connecting);

                let token = CancellationToken::new();
                let driver = tokio::spawn(drive(Arc::clone(&self.ctx), token.clone()));
                *run = Some(Run { token, driver });
            }

            self.ctx.health.subscribe()
        };

        match health_rx.wait_for(|health| health.state.is_settled()).await {
            Ok(health) => health.clone(),
            Err(_) => self.health(),
        }
    }

    /// Cancel the current run and wait for its teardown
    ///
    /// Idempotent; always ends in `Stopped`.
    pub async fn stop(&self) -> SessionHealth {
        let mut run = self.run.lock().await;

        if let Some(Run { token, driver }) = run.take() {
            token.cancel();
            if let Err(e) = driver.await
                && e.is_panic()
            {
                tracing::error!(venue = %self.ctx.venue, error = %e, "Session driver panicked");
            }
        }

        *self.ctx.backing_off.lock() = 0;
        self.ctx.update(|health| health.subscribed_symbol_count = 0);
        self.ctx.transition(SessionState::Stopped);
        drop(run);

        self.health()
    }

    /// Current health snapshot; never waits on the session
    pub fn health(&self) -> SessionHealth {
        self.ctx.health.borrow().clone()
    }

    pub fn state(&self) -> SessionState {
        self.ctx.health.borrow().state
    }

    /// Stream of state changes from now on
    pub fn transitions(&self) -> broadcast::Receiver<StateTransition> {
        self.ctx.transitions.subscribe()
    }

    /// Watch the health value as it changes
    pub fn watch_health(&self) -> watch::Receiver<SessionHealth> {
        self.ctx.health.subscribe()
    }
}

impl Drop for ConnectionSession {
    fn drop(&mut self) {
        // Detached drivers still close their clients once cancelled
        if let Ok(run) = self.run.try_lock()
            && let Some(run) = run.as_ref()
        {
            run.token.cancel();
        }
    }
}
