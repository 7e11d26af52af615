use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use qae_core::{Credentials, Symbol, Ticker, VenueId};

use crate::error::TransportError;

/// Opaque per-venue streaming capability
///
/// The wire protocol lives behind this trait. Subscriptions are
/// receive-style: each call waits for the next update on the subscription,
/// opening the underlying stream on first use or after an error.
#[async_trait]
pub trait VenueClient: Send + Sync {
    /// Unified symbols the venue lists
    async fn load_catalog(&self) -> Result<HashSet<Symbol>, TransportError>;

    /// Next batch of tickers for a multi-symbol subscription
    async fn subscribe_batch(&self, symbols: &[Symbol]) -> Result<Vec<Ticker>, TransportError>;

    /// Next ticker for a single-symbol subscription
    async fn subscribe_one(&self, symbol: &Symbol) -> Result<Ticker, TransportError>;

    /// Release every open network handle
    async fn close(&self) -> Result<(), TransportError>;
}

/// Builds venue clients for sessions
///
/// Implements Dependency Inversion - sessions never name a concrete client,
/// which lets tests substitute a scripted transport.
#[async_trait]
pub trait ClientFactory: Send + Sync {
    /// Client used for catalog loading and streaming
    async fn public_client(&self, venue: &VenueId) -> Result<Arc<dyn VenueClient>, TransportError>;

    /// Authenticated client for account access
    async fn private_client(
        &self,
        venue: &VenueId,
        credentials: &Credentials,
    ) -> Result<Arc<dyn VenueClient>, TransportError>;
}
