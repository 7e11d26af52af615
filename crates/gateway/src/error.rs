//! Error types for the gateway crate

use qae_core::VenueId;
use std::time::Duration;
use thiserror::Error;

/// Transport-level errors raised by venue clients
///
/// Inside a streaming session these are transient: they are logged, counted
/// and answered with a reconnect, never escalated.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Connection closed by venue")]
    Closed,

    #[error("Venue not supported: {0}")]
    Unsupported(String),

    #[error("Invalid credentials: {0}")]
    Credentials(String),
}

impl From<tokio_tungstenite::tungstenite::Error> for TransportError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        use tokio_tungstenite::tungstenite::Error as WsError;
        match e {
            WsError::ConnectionClosed | WsError::AlreadyClosed => TransportError::Closed,
            other => TransportError::Connection(other.to_string()),
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        TransportError::Http(e.to_string())
    }
}

impl From<serde_json::Error> for TransportError {
    fn from(e: serde_json::Error) -> Self {
        TransportError::Protocol(e.to_string())
    }
}

/// Gateway-level errors
///
/// Configuration errors (`UnknownVenue`, `DuplicateVenue`) are returned to the
/// caller. Setup errors end a session in `Failed` and are reported through its
/// health, never thrown across the registry boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("Unknown venue: {0}")]
    UnknownVenue(VenueId),

    #[error("Venue already registered: {0}")]
    DuplicateVenue(VenueId),

    #[error("Catalog load for {venue} timed out after {timeout:?}")]
    CatalogLoadTimeout { venue: VenueId, timeout: Duration },

    #[error("Catalog load for {venue} failed: {source}")]
    CatalogLoad {
        venue: VenueId,
        source: TransportError,
    },

    #[error("Client for {venue} unavailable: {source}")]
    ClientUnavailable {
        venue: VenueId,
        source: TransportError,
    },

    #[error("None of the requested symbols are listed on {0}")]
    NoListedSymbols(VenueId),

    #[error("Subscription limit on {0} is zero, no listed symbol can be streamed")]
    NoSubscriptionCapacity(VenueId),
}
