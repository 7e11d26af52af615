//! Exchange Registry
//!
//! Owns one [`ConnectionSession`] per registered venue. Sessions start and
//! stop concurrently and in isolation: a venue that fails setup never stops
//! the others from streaming.

use std::sync::Arc;

use futures_util::future::join_all;
use parking_lot::RwLock;
use qae_core::{Credentials, Symbol, VenueId};

use crate::domain::{ClientFactory, ProfileRegistry, SessionHealth, SessionState};
use crate::error::GatewayError;
use crate::presentation::FanOut;

use super::config::SessionConfig;
use super::session::ConnectionSession;

pub struct ExchangeRegistry {
    profiles: ProfileRegistry,
    factory: Arc<dyn ClientFactory>,
    fan_out: FanOut,
    /// Symbols for venues registered without an override
    symbols: Vec<Symbol>,
    config: SessionConfig,
    /// Sessions in registration order
    sessions: RwLock<Vec<Arc<ConnectionSession>>>,
}

impl ExchangeRegistry {
    pub fn new(
        profiles: ProfileRegistry,
        factory: Arc<dyn ClientFactory>,
        fan_out: FanOut,
        symbols: Vec<Symbol>,
        config: SessionConfig,
    ) -> Self {
        ExchangeRegistry {
            profiles,
            factory,
            fan_out,
            symbols,
            config,
            sessions: RwLock::new(Vec::new()),
        }
    }

    /// Create an idle session for `venue` tracking the default symbols
    pub fn register(
        &self,
        venue: impl Into<VenueId>,
        credentials: Option<Credentials>,
    ) -> Result<(), GatewayError> {
        let symbols = self.symbols.clone();
        self.register_with_symbols(venue, credentials, symbols)
    }

    /// Create an idle session for `venue` tracking its own symbol set
    pub fn register_with_symbols(
        &self,
        venue: impl Into<VenueId>,
        credentials: Option<Credentials>,
        symbols: Vec<Symbol>,
    ) -> Result<(), GatewayError> {
        let venue = venue.into();
        let profile = self.profiles.profile_for(&venue)?;

        let mut sessions = self.sessions.write();
        if sessions.iter().any(|session| session.venue() == &venue) {
            return Err(GatewayError::DuplicateVenue(venue));
        }

        tracing::info!(
            venue = %venue,
            strategy = ?profile.strategy,
            symbols = symbols.len(),
            private = credentials.is_some(),
            "Venue registered"
        );

        sessions.push(Arc::new(ConnectionSession::new(
            profile,
            credentials,
            symbols,
            self.config.clone(),
            Arc::clone(&self.factory),
            self.fan_out.clone(),
        )));

        Ok(())
    }

    /// Start every registered session concurrently
    ///
    /// Returns each venue's health once it is streaming or has failed, in
    /// registration order.
    pub async fn start_all(&self) -> Vec<SessionHealth> {
        let sessions = self.snapshot();
        tracing::info!(venues = sessions.len(), "Starting all venue sessions");

        let healths = join_all(sessions.iter().map(|session| session.start())).await;

        let failed = healths
            .iter()
            .filter(|health| health.state == SessionState::Failed)
            .count();
        tracing::info!(venues = healths.len(), failed, "Venue sessions started");

        healths
    }

    /// Stop every session concurrently and wait for teardown
    pub async fn stop_all(&self) -> Vec<SessionHealth> {
        let sessions = self.snapshot();
        tracing::info!(venues = sessions.len(), "Stopping all venue sessions");

        let healths = join_all(sessions.iter().map(|session| session.stop())).await;

        tracing::info!("All venue sessions stopped");
        healths
    }

    /// Stop then start one venue; the way out of `Failed`
    pub async fn restart(&self, venue: &VenueId) -> Result<SessionHealth, GatewayError> {
        let session = self.handle(venue)?;
        tracing::info!(venue = %venue, "Restarting venue session");
        session.stop().await;
        Ok(session.start().await)
    }

    /// Health of every session in registration order
    pub fn sessions(&self) -> Vec<SessionHealth> {
        self.sessions.read().iter().map(|session| session.health()).collect()
    }

    /// Health of one session
    pub fn session(&self, venue: &VenueId) -> Result<SessionHealth, GatewayError> {
        self.handle(venue).map(|session| session.health())
    }

    /// Shared handle to one session
    pub fn handle(&self, venue: &VenueId) -> Result<Arc<ConnectionSession>, GatewayError> {
        self.sessions
            .read()
            .iter()
            .find(|session| session.venue() == venue)
            .cloned()
            .ok_or_else(|| GatewayError::UnknownVenue(venue.clone()))
    }

    pub fn venues(&self) -> Vec<VenueId> {
        self.sessions
            .read()
            .iter()
            .map(|session| session.venue().clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }

    pub fn fan_out(&self) -> &FanOut {
        &self.fan_out
    }

    pub fn profiles(&self) -> &ProfileRegistry {
        &self.profiles
    }

    fn snapshot(&self) -> Vec<Arc<ConnectionSession>> {
        self.sessions.read().clone()
    }
}
