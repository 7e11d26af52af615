//! Gateway Crate
//!
//! Multi-exchange streaming gateway: keeps ticker subscriptions alive on
//! every enabled venue and hands normalized tickers to downstream consumers.
//!
//! # Architecture
//!
//! The gateway:
//! - Resolves each venue's streaming quirks once (batch limits, per-symbol
//!   fallback, passphrase requirement)
//! - Runs one connection session per venue with its own state machine
//! - Retries transport errors forever, fails setup errors once
//! - Fans tickers out to bounded per-subscriber buffers
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  Binance    │     │   Kraken    │     │    ...      │
//! │  (batched)  │     │ (per-symbol)│     │             │
//! └──────┬──────┘     └──────┬──────┘     └──────┬──────┘
//!        │ REST + WebSocket  │                    │
//!        ▼                   ▼                    ▼
//! ┌──────────────────────────────────────────────────────┐
//! │                 ExchangeRegistry                     │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────┐   │
//! │  │ Connection  │  │ Connection  │  │ Connection  │   │
//! │  │  Session    │  │  Session    │  │  Session    │   │
//! │  └──────┬──────┘  └──────┬──────┘  └──────┬──────┘   │
//! │         │                │                │          │
//! │         ▼                ▼                ▼          │
//! │  ┌────────────────────────────────────────────────┐  │
//! │  │                    FanOut                      │  │
//! │  │      (bounded buffers, drop newest on full)    │  │
//! │  └────────────────────────────────────────────────┘  │
//! └──────────────────────────┬───────────────────────────┘
//!                            │ TickerSubscription
//!                            ▼
//!              ┌───────────────────────────┐
//!              │ Market state / Arbitrage  │
//!              └───────────────────────────┘
//! ```

pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod presentation;

// Re-export key types
pub use domain::{
    ClientFactory, Coverage, FallbackMode, ProfileRegistry, SessionHealth, SessionState,
    StateTransition, SubscriptionPlan, SubscriptionStrategy, VenueClient, VenueProfile,
};
pub use error::{GatewayError, TransportError};

pub use application::config::{FanOutConfig, SessionConfig};
pub use application::exchange_manager::ExchangeRegistry;
pub use application::session::ConnectionSession;

pub use infrastructure::dialect::{Dialect, Endpoints};
pub use infrastructure::factory::WsClientFactory;
pub use infrastructure::ws_client::WsVenueClient;

pub use presentation::{Delivery, FanOut, SubscriberId, TickerSubscription};

pub use config::{
    ConfigError, FeedConfigFile, VenueConfig, load_config, load_config_from_str,
    load_default_config,
};
