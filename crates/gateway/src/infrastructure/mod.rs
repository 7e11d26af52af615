//! Infrastructure Layer - Inbound adapters from upstream systems
//!
//! This layer contains adapters for systems we consume from:
//! - RestClient: HTTP client for venue reference data (catalogs)
//! - WsVenueClient: WebSocket ticker streams, one socket per subscription
//! - Dialect: per-venue endpoints, subscribe frames and keepalives
//! - Parsers: catalog and ticker parsing from exchange formats
//! - WsClientFactory: builds clients for sessions
//!
//! Follows Hexagonal Architecture:
//! - Infrastructure = inbound (exchanges → gateway)
//! - Presentation = outbound (gateway → consumers)

pub mod dialect;
pub mod factory;
pub mod parsers;
pub mod rest_client;
pub mod ws_client;

pub use dialect::{Dialect, Endpoints};
pub use factory::WsClientFactory;
pub use parsers::{BinanceParser, BybitParser, KrakenParser, MexcParser, VenueParser};
pub use rest_client::{RestClient, RestError};
pub use ws_client::WsVenueClient;
