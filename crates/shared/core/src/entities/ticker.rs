use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::values::{Price, Symbol, Timestamp, VenueId};

/// Normalized best-bid / best-ask / last-trade snapshot for one symbol on one venue
///
/// Venues do not always report every field (spot tickers on some venues carry
/// no book top), so the prices are optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticker {
    pub venue: VenueId,
    pub symbol: Symbol,
    pub bid: Option<Price>,
    pub ask: Option<Price>,
    pub last: Option<Price>,
    pub timestamp: Timestamp,
}

impl Ticker {
    /// Create a ticker with no prices, stamped now
    pub fn new(venue: impl Into<VenueId>, symbol: impl Into<Symbol>) -> Self {
        Ticker {
            venue: venue.into(),
            symbol: symbol.into(),
            bid: None,
            ask: None,
            last: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_bid(mut self, bid: Price) -> Self {
        self.bid = Some(bid);
        self
    }

    pub fn with_ask(mut self, ask: Price) -> Self {
        self.ask = Some(ask);
        self
    }

    pub fn with_last(mut self, last: Price) -> Self {
        self.last = Some(last);
        self
    }

    pub fn with_timestamp(mut self, timestamp: Timestamp) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Midpoint of bid and ask, when both are known
    pub fn mid(&self) -> Option<Price> {
        match (self.bid, self.ask) {
            (Some(bid), Some(ask)) => Some((bid + ask) / Price::TWO),
            _ => None,
        }
    }

    /// Ask minus bid, when both are known
    pub fn spread(&self) -> Option<Price> {
        match (self.bid, self.ask) {
            (Some(bid), Some(ask)) => Some(ask - bid),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_mid_and_spread() {
        let ticker = Ticker::new("binance", "BTC/USDT")
            .with_bid(dec!(50000))
            .with_ask(dec!(50010));

        assert_eq!(ticker.mid(), Some(dec!(50005)));
        assert_eq!(ticker.spread(), Some(dec!(10)));
    }

    #[test]
    fn test_partial_ticker() {
        let ticker = Ticker::new("bybit", "ETH/USDT").with_last(dec!(3000.5));

        assert_eq!(ticker.last, Some(dec!(3000.5)));
        assert!(ticker.mid().is_none());
        assert!(ticker.spread().is_none());
    }
}
