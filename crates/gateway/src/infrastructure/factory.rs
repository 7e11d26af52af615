use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use qae_core::{Credentials, VenueId};
use url::Url;

use super::dialect::{Dialect, Endpoints};
use super::ws_client::WsVenueClient;
use crate::domain::{ClientFactory, VenueClient};
use crate::error::TransportError;

/// Builds [`WsVenueClient`]s for the venues the gateway has a dialect for
///
/// Implements Dependency Inversion - the registry only sees `ClientFactory`.
#[derive(Debug, Clone, Default)]
pub struct WsClientFactory {
    /// Endpoint overrides, e.g. testnets
    overrides: HashMap<VenueId, Endpoints>,
}

impl WsClientFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Point a venue at different base URLs
    pub fn with_endpoints(mut self, venue: impl Into<VenueId>, endpoints: Endpoints) -> Self {
        self.overrides.insert(venue.into(), endpoints);
        self
    }

    fn build(&self, venue: &VenueId) -> Result<WsVenueClient, TransportError> {
        let dialect = Dialect::for_venue(venue).ok_or_else(|| {
            TransportError::Unsupported(format!("no streaming dialect for {venue}"))
        })?;

        let endpoints = self
            .overrides
            .get(venue)
            .cloned()
            .unwrap_or_else(|| dialect.default_endpoints());
        validate_endpoints(&endpoints)?;

        Ok(WsVenueClient::new(venue.clone(), dialect, endpoints))
    }
}

fn validate_endpoints(endpoints: &Endpoints) -> Result<(), TransportError> {
    for (raw, schemes) in [
        (&endpoints.rest, ["http", "https"]),
        (&endpoints.ws, ["ws", "wss"]),
    ] {
        let url = Url::parse(raw)
            .map_err(|e| TransportError::Connection(format!("invalid endpoint {raw}: {e}")))?;
        if !schemes.contains(&url.scheme()) {
            return Err(TransportError::Connection(format!(
                "endpoint {raw} must use one of {schemes:?}"
            )));
        }
    }
    Ok(())
}

#[async_trait]
impl ClientFactory for WsClientFactory {
    async fn public_client(&self, venue: &VenueId) -> Result<Arc<dyn VenueClient>, TransportError> {
        let client = self.build(venue)?;
        tracing::debug!(venue = %venue, "Public client created");
        Ok(Arc::new(client))
    }

    async fn private_client(
        &self,
        venue: &VenueId,
        credentials: &Credentials,
    ) -> Result<Arc<dyn VenueClient>, TransportError> {
        if !credentials.is_complete() {
            return Err(TransportError::Credentials(
                "api key and secret are required".to_string(),
            ));
        }

        let client = self.build(venue)?.authenticated();
        tracing::debug!(venue = %venue, "Private client created");
        Ok(Arc::new(client))
    }
}
