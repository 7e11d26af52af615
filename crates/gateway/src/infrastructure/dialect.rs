use std::sync::Arc;
use std::time::Duration;

use qae_core::VenueId;
use serde_json::json;

use super::parsers::{BinanceParser, BybitParser, KrakenParser, MexcParser, VenueParser};

/// Base URLs for one venue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub rest: String,
    pub ws: String,
}

impl Endpoints {
    pub fn new(rest: impl Into<String>, ws: impl Into<String>) -> Self {
        Endpoints {
            rest: rest.into(),
            ws: ws.into(),
        }
    }
}

/// Wire protocol spoken by a venue's public market-data API
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Binance,
    Bybit,
    Kraken,
    Mexc,
}

impl Dialect {
    /// Dialect for a venue, if the gateway speaks it
    pub fn for_venue(venue: &VenueId) -> Option<Self> {
        match venue.as_str() {
            "binance" => Some(Dialect::Binance),
            "bybit" => Some(Dialect::Bybit),
            "kraken" => Some(Dialect::Kraken),
            "mexc" => Some(Dialect::Mexc),
            _ => None,
        }
    }

    pub fn default_endpoints(&self) -> Endpoints {
        match self {
            Dialect::Binance => {
                Endpoints::new("https://api.binance.com", "wss://stream.binance.com:9443")
            }
            Dialect::Bybit => {
                Endpoints::new("https://api.bybit.com", "wss://stream.bybit.com/v5/public/spot")
            }
            Dialect::Kraken => Endpoints::new("https://api.kraken.com", "wss://ws.kraken.com/v2"),
            Dialect::Mexc => Endpoints::new("https://api.mexc.com", "wss://wbs.mexc.com/ws"),
        }
    }

    /// REST path listing tradable instruments
    pub fn catalog_path(&self) -> &'static str {
        match self {
            Dialect::Binance => "/api/v3/exchangeInfo",
            Dialect::Bybit => "/v5/market/instruments-info?category=spot",
            Dialect::Kraken => "/0/public/AssetPairs",
            Dialect::Mexc => "/api/v3/exchangeInfo",
        }
    }

    pub fn parser(&self) -> Arc<dyn VenueParser> {
        match self {
            Dialect::Binance => Arc::new(BinanceParser),
            Dialect::Bybit => Arc::new(BybitParser),
            Dialect::Kraken => Arc::new(KrakenParser),
            Dialect::Mexc => Arc::new(MexcParser),
        }
    }

    /// URL of the socket carrying `natives`
    ///
    /// Binance encodes the subscription in the URL; the others subscribe
    /// with a frame after connecting.
    pub fn stream_url(&self, ws_base: &str, natives: &[String]) -> String {
        let ws_base = ws_base.trim_end_matches('/');
        match self {
            Dialect::Binance => {
                let streams: Vec<String> = natives
                    .iter()
                    .map(|native| format!("{}@ticker", native.to_lowercase()))
                    .collect();
                format!("{}/stream?streams={}", ws_base, streams.join("/"))
            }
            Dialect::Bybit | Dialect::Kraken | Dialect::Mexc => ws_base.to_string(),
        }
    }

    /// Frame sent right after connecting
    pub fn subscribe_frame(&self, natives: &[String]) -> Option<String> {
        match self {
            Dialect::Binance => None,
            Dialect::Bybit => {
                let topics: Vec<String> = natives
                    .iter()
                    .map(|native| format!("tickers.{native}"))
                    .collect();
                Some(json!({"op": "subscribe", "args": topics}).to_string())
            }
            Dialect::Kraken => Some(
                json!({
                    "method": "subscribe",
                    "params": {"channel": "ticker", "symbol": natives}
                })
                .to_string(),
            ),
            Dialect::Mexc => {
                let params: Vec<String> = natives
                    .iter()
                    .map(|native| format!("spot@public.bookTicker.v3.api@{native}"))
                    .collect();
                Some(json!({"method": "SUBSCRIPTION", "params": params}).to_string())
            }
        }
    }

    /// Application-level keepalive the venue expects from clients
    pub fn keepalive(&self) -> Option<(Duration, String)> {
        match self {
            // Bybit drops sockets that stay silent for longer than 20s
            Dialect::Bybit => Some((Duration::from_secs(20), json!({"op": "ping"}).to_string())),
            // MEXC closes sockets without a PING inside a minute
            Dialect::Mexc => Some((Duration::from_secs(20), json!({"method": "PING"}).to_string())),
            Dialect::Binance | Dialect::Kraken => None,
        }
    }
}
