//! Presentation Layer - Outbound interfaces to downstream consumers
//!
//! This layer contains adapters for systems that consume from us:
//! - FanOut: distributes normalized tickers to the market-state store,
//!   the arbitrage detector, and any other subscriber
//!
//! Follows Hexagonal Architecture:
//! - Infrastructure = inbound (exchanges → gateway)
//! - Presentation = outbound (gateway → consumers)

mod fan_out;

pub use fan_out::{Delivery, FanOut, SubscriberId, TickerSubscription};
