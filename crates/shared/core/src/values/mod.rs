use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Price value - uses Decimal for precision
pub type Price = Decimal;

/// Timestamp in UTC
pub type Timestamp = DateTime<Utc>;

/// Unique identifier for a venue (exchange)
///
/// Always lowercase so that "Binance" and "binance" name the same venue.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct VenueId(String);

impl VenueId {
    pub fn new(id: impl Into<String>) -> Self {
        VenueId(id.into().trim().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VenueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for VenueId {
    fn from(s: &str) -> Self {
        VenueId::new(s)
    }
}

impl From<String> for VenueId {
    fn from(s: String) -> Self {
        VenueId::new(s)
    }
}

impl From<VenueId> for String {
    fn from(id: VenueId) -> Self {
        id.0
    }
}

/// Well-known venue identifiers
impl VenueId {
    pub fn binance() -> Self {
        VenueId::new("binance")
    }

    pub fn bybit() -> Self {
        VenueId::new("bybit")
    }

    pub fn kraken() -> Self {
        VenueId::new("kraken")
    }

    pub fn mexc() -> Self {
        VenueId::new("mexc")
    }

    pub fn okx() -> Self {
        VenueId::new("okx")
    }

    pub fn kucoin() -> Self {
        VenueId::new("kucoin")
    }

    pub fn gate() -> Self {
        VenueId::new("gate")
    }
}

/// Unified market symbol in `BASE/QUOTE` form (e.g. `BTC/USDT`)
///
/// Venue-native spellings (`BTCUSDT`, `XBT/USD`) are mapped to this form by
/// the venue clients before a symbol reaches the rest of the system.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Symbol(String);

impl Symbol {
    pub fn new(symbol: impl Into<String>) -> Self {
        Symbol(symbol.into().trim().to_uppercase())
    }

    /// Build a symbol from its base and quote assets
    pub fn from_parts(base: &str, quote: &str) -> Self {
        Symbol::new(format!("{}/{}", base, quote))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Base asset, if the symbol is in `BASE/QUOTE` form
    pub fn base(&self) -> Option<&str> {
        self.0.split_once('/').map(|(base, _)| base)
    }

    /// Quote asset, if the symbol is in `BASE/QUOTE` form
    pub fn quote(&self) -> Option<&str> {
        self.0.split_once('/').map(|(_, quote)| quote)
    }

    /// Whether the symbol has a non-empty base and quote
    pub fn is_well_formed(&self) -> bool {
        matches!(
            self.0.split_once('/'),
            Some((base, quote)) if !base.is_empty() && !quote.is_empty() && !quote.contains('/')
        )
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Symbol {
    fn from(s: &str) -> Self {
        Symbol::new(s)
    }
}

impl From<String> for Symbol {
    fn from(s: String) -> Self {
        Symbol::new(s)
    }
}

impl From<Symbol> for String {
    fn from(symbol: Symbol) -> Self {
        symbol.0
    }
}
