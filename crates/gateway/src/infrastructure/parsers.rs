use std::collections::HashSet;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use qae_core::{Price, Symbol, Ticker, VenueId};
use rust_decimal::Decimal;
use serde_json::Value;
use tracing::debug;

use crate::error::TransportError;

/// Venue wire format: catalog documents, native symbol names and ticker
/// messages
///
/// Infrastructure component - keeps every exchange-specific field name out
/// of the session logic.
pub trait VenueParser: Send + Sync {
    fn venue(&self) -> VenueId;

    /// Exchange spelling of a unified symbol
    fn native_symbol(&self, symbol: &Symbol) -> String;

    /// Unified symbols from the venue's instrument listing
    fn parse_catalog(&self, body: &Value) -> Result<HashSet<Symbol>, TransportError>;

    /// Tickers carried by one text frame, limited to `subscribed`
    ///
    /// Acks, heartbeats and other control frames yield an empty list.
    fn parse_tickers(
        &self,
        text: &str,
        subscribed: &[Symbol],
    ) -> Result<Vec<Ticker>, TransportError>;
}

/// Parser for Binance spot `exchangeInfo` and combined `@ticker` streams
pub struct BinanceParser;

impl VenueParser for BinanceParser {
    fn venue(&self) -> VenueId {
        VenueId::binance()
    }

    fn native_symbol(&self, symbol: &Symbol) -> String {
        concat_native(symbol)
    }

    fn parse_catalog(&self, body: &Value) -> Result<HashSet<Symbol>, TransportError> {
        let listed = body
            .get("symbols")
            .and_then(Value::as_array)
            .ok_or_else(|| protocol("binance exchangeInfo has no symbols array"))?;

        Ok(listed
            .iter()
            .filter(|entry| entry.get("status").and_then(Value::as_str) == Some("TRADING"))
            .filter_map(|entry| {
                Some(Symbol::from_parts(
                    entry.get("baseAsset")?.as_str()?,
                    entry.get("quoteAsset")?.as_str()?,
                ))
            })
            .collect())
    }

    fn parse_tickers(
        &self,
        text: &str,
        subscribed: &[Symbol],
    ) -> Result<Vec<Ticker>, TransportError> {
        let value: Value = serde_json::from_str(text)?;

        // Combined streams wrap the payload; raw streams do not
        let data = value.get("data").unwrap_or(&value);
        if data.get("e").and_then(Value::as_str) != Some("24hrTicker") {
            debug!(frame = %text, "BinanceParser: skipping non-ticker frame");
            return Ok(Vec::new());
        }

        let native = data
            .get("s")
            .and_then(Value::as_str)
            .ok_or_else(|| protocol("binance ticker without symbol"))?;
        let Some(symbol) = resolve(self, native, subscribed) else {
            return Ok(Vec::new());
        };

        let mut ticker = Ticker::new(self.venue(), symbol);
        if let Some(bid) = decimal_field(data, "b") {
            ticker = ticker.with_bid(bid);
        }
        if let Some(ask) = decimal_field(data, "a") {
            ticker = ticker.with_ask(ask);
        }
        if let Some(last) = decimal_field(data, "c") {
            ticker = ticker.with_last(last);
        }
        if let Some(at) = millis_field(data, "E") {
            ticker = ticker.with_timestamp(at);
        }

        Ok(vec![ticker])
    }
}

/// Parser for Bybit v5 spot instruments and `tickers.<SYMBOL>` topics
pub struct BybitParser;

impl VenueParser for BybitParser {
    fn venue(&self) -> VenueId {
        VenueId::bybit()
    }

    fn native_symbol(&self, symbol: &Symbol) -> String {
        concat_native(symbol)
    }

    fn parse_catalog(&self, body: &Value) -> Result<HashSet<Symbol>, TransportError> {
        let code = body.get("retCode").and_then(Value::as_i64).unwrap_or(-1);
        if code != 0 {
            let message = body.get("retMsg").and_then(Value::as_str).unwrap_or("unknown");
            return Err(protocol(format!("bybit instruments-info retCode {code}: {message}")));
        }

        let listed = body
            .pointer("/result/list")
            .and_then(Value::as_array)
            .ok_or_else(|| protocol("bybit instruments-info has no result list"))?;

        Ok(listed
            .iter()
            .filter(|entry| entry.get("status").and_then(Value::as_str) == Some("Trading"))
            .filter_map(|entry| {
                Some(Symbol::from_parts(
                    entry.get("baseCoin")?.as_str()?,
                    entry.get("quoteCoin")?.as_str()?,
                ))
            })
            .collect())
    }

    fn parse_tickers(
        &self,
        text: &str,
        subscribed: &[Symbol],
    ) -> Result<Vec<Ticker>, TransportError> {
        let value: Value = serde_json::from_str(text)?;

        if value.get("success").and_then(Value::as_bool) == Some(false) {
            let message = value.get("ret_msg").and_then(Value::as_str).unwrap_or("rejected");
            return Err(protocol(format!("bybit subscription rejected: {message}")));
        }

        let is_ticker = value
            .get("topic")
            .and_then(Value::as_str)
            .is_some_and(|topic| topic.starts_with("tickers."));
        if !is_ticker {
            return Ok(Vec::new());
        }

        let data = value
            .get("data")
            .ok_or_else(|| protocol("bybit ticker without data"))?;
        let native = data
            .get("symbol")
            .and_then(Value::as_str)
            .ok_or_else(|| protocol("bybit ticker without symbol"))?;
        let Some(symbol) = resolve(self, native, subscribed) else {
            return Ok(Vec::new());
        };

        let mut ticker = Ticker::new(self.venue(), symbol);
        if let Some(bid) = decimal_field(data, "bid1Price") {
            ticker = ticker.with_bid(bid);
        }
        if let Some(ask) = decimal_field(data, "ask1Price") {
            ticker = ticker.with_ask(ask);
        }
        if let Some(last) = decimal_field(data, "lastPrice") {
            ticker = ticker.with_last(last);
        }
        if let Some(at) = millis_field(&value, "ts") {
            ticker = ticker.with_timestamp(at);
        }

        Ok(vec![ticker])
    }
}

/// Parser for Kraken `AssetPairs` and the v2 `ticker` channel
pub struct KrakenParser;

impl KrakenParser {
    /// Kraken still lists bitcoin as XBT in REST responses
    fn normalize_asset(asset: &str) -> &str {
        match asset {
            "XBT" => "BTC",
            "XDG" => "DOGE",
            other => other,
        }
    }
}

impl VenueParser for KrakenParser {
    fn venue(&self) -> VenueId {
        VenueId::kraken()
    }

    fn native_symbol(&self, symbol: &Symbol) -> String {
        symbol.as_str().to_string()
    }

    fn parse_catalog(&self, body: &Value) -> Result<HashSet<Symbol>, TransportError> {
        if let Some(errors) = body.get("error").and_then(Value::as_array)
            && !errors.is_empty()
        {
            return Err(protocol(format!("kraken AssetPairs error: {errors:?}")));
        }

        let pairs = body
            .get("result")
            .and_then(Value::as_object)
            .ok_or_else(|| protocol("kraken AssetPairs has no result object"))?;

        Ok(pairs
            .values()
            .filter(|pair| {
                pair.get("status")
                    .and_then(Value::as_str)
                    .is_none_or(|status| status == "online")
            })
            .filter_map(|pair| {
                let wsname = pair.get("wsname")?.as_str()?;
                let (base, quote) = wsname.split_once('/')?;
                Some(Symbol::from_parts(
                    Self::normalize_asset(base),
                    Self::normalize_asset(quote),
                ))
            })
            .collect())
    }

    fn parse_tickers(
        &self,
        text: &str,
        subscribed: &[Symbol],
    ) -> Result<Vec<Ticker>, TransportError> {
        let value: Value = serde_json::from_str(text)?;

        if value.get("method").and_then(Value::as_str) == Some("subscribe")
            && value.get("success").and_then(Value::as_bool) == Some(false)
        {
            let message = value.get("error").and_then(Value::as_str).unwrap_or("rejected");
            return Err(protocol(format!("kraken subscription rejected: {message}")));
        }

        if value.get("channel").and_then(Value::as_str) != Some("ticker") {
            return Ok(Vec::new());
        }

        let entries = value
            .get("data")
            .and_then(Value::as_array)
            .ok_or_else(|| protocol("kraken ticker without data array"))?;

        let now = Utc::now();
        let mut tickers = Vec::with_capacity(entries.len());
        for entry in entries {
            let Some(native) = entry.get("symbol").and_then(Value::as_str) else {
                continue;
            };
            let Some(symbol) = resolve(self, native, subscribed) else {
                continue;
            };

            let mut ticker = Ticker::new(self.venue(), symbol).with_timestamp(now);
            if let Some(bid) = decimal_field(entry, "bid") {
                ticker = ticker.with_bid(bid);
            }
            if let Some(ask) = decimal_field(entry, "ask") {
                ticker = ticker.with_ask(ask);
            }
            if let Some(last) = decimal_field(entry, "last") {
                ticker = ticker.with_last(last);
            }
            tickers.push(ticker);
        }

        Ok(tickers)
    }
}

/// Parser for MEXC spot `exchangeInfo` and `bookTicker` JSON channels
pub struct MexcParser;

impl VenueParser for MexcParser {
    fn venue(&self) -> VenueId {
        VenueId::mexc()
    }

    fn native_symbol(&self, symbol: &Symbol) -> String {
        concat_native(symbol)
    }

    fn parse_catalog(&self, body: &Value) -> Result<HashSet<Symbol>, TransportError> {
        let listed = body
            .get("symbols")
            .and_then(Value::as_array)
            .ok_or_else(|| protocol("mexc exchangeInfo has no symbols array"))?;

        // "1" is online; older deployments still report "ENABLED"
        Ok(listed
            .iter()
            .filter(|entry| {
                matches!(
                    entry.get("status").and_then(Value::as_str),
                    Some("1") | Some("ENABLED")
                )
            })
            .filter(|entry| {
                entry
                    .get("isSpotTradingAllowed")
                    .and_then(Value::as_bool)
                    .unwrap_or(true)
            })
            .filter_map(|entry| {
                Some(Symbol::from_parts(
                    entry.get("baseAsset")?.as_str()?,
                    entry.get("quoteAsset")?.as_str()?,
                ))
            })
            .collect())
    }

    fn parse_tickers(
        &self,
        text: &str,
        subscribed: &[Symbol],
    ) -> Result<Vec<Ticker>, TransportError> {
        let value: Value = serde_json::from_str(text)?;

        // Acks and PONG replies carry a code; anything but 0 is a rejection
        if let Some(code) = value.get("code").and_then(Value::as_i64) {
            if code != 0 {
                let message = value.get("msg").and_then(Value::as_str).unwrap_or("rejected");
                return Err(protocol(format!("mexc subscription rejected: {message}")));
            }
            return Ok(Vec::new());
        }

        let is_book_ticker = value
            .get("c")
            .and_then(Value::as_str)
            .is_some_and(|channel| channel.starts_with("spot@public.bookTicker"));
        if !is_book_ticker {
            debug!(frame = %text, "MexcParser: skipping non-ticker frame");
            return Ok(Vec::new());
        }

        let native = value
            .get("s")
            .and_then(Value::as_str)
            .ok_or_else(|| protocol("mexc ticker without symbol"))?;
        let Some(symbol) = resolve(self, native, subscribed) else {
            return Ok(Vec::new());
        };
        let data = value
            .get("d")
            .ok_or_else(|| protocol("mexc ticker without data"))?;

        let mut ticker = Ticker::new(self.venue(), symbol);
        if let Some(bid) = decimal_field(data, "b") {
            ticker = ticker.with_bid(bid);
        }
        if let Some(ask) = decimal_field(data, "a") {
            ticker = ticker.with_ask(ask);
        }
        if let Some(at) = millis_field(&value, "t") {
            ticker = ticker.with_timestamp(at);
        }

        Ok(vec![ticker])
    }
}

fn protocol(message: impl Into<String>) -> TransportError {
    TransportError::Protocol(message.into())
}

/// `BTC/USDT` -> `BTCUSDT`
fn concat_native(symbol: &Symbol) -> String {
    symbol.as_str().replace('/', "")
}

fn resolve(parser: &dyn VenueParser, native: &str, subscribed: &[Symbol]) -> Option<Symbol> {
    subscribed
        .iter()
        .find(|symbol| parser.native_symbol(symbol).eq_ignore_ascii_case(native))
        .cloned()
}

/// Prices arrive as strings on Binance/Bybit/MEXC and as numbers on Kraken
fn decimal_field(data: &Value, field: &str) -> Option<Price> {
    let parsed = match data.get(field)? {
        Value::String(s) if s.is_empty() => return None,
        Value::String(s) => Decimal::from_str(s).or_else(|_| Decimal::from_scientific(s)),
        Value::Number(n) => {
            let s = n.to_string();
            Decimal::from_str(&s).or_else(|_| Decimal::from_scientific(&s))
        }
        _ => return None,
    };

    match parsed {
        Ok(price) => Some(price),
        Err(e) => {
            debug!(field, error = %e, "Failed to parse decimal field");
            None
        }
    }
}

fn millis_field(data: &Value, field: &str) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(data.get(field)?.as_i64()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn symbols(list: &[&str]) -> Vec<Symbol> {
        list.iter().map(|s| Symbol::new(*s)).collect()
    }

    #[test]
    fn test_binance_catalog_keeps_trading_pairs() {
        let body = serde_json::json!({
            "symbols": [
                {"symbol": "BTCUSDT", "status": "TRADING", "baseAsset": "BTC", "quoteAsset": "USDT"},
                {"symbol": "ETHUSDT", "status": "TRADING", "baseAsset": "ETH", "quoteAsset": "USDT"},
                {"symbol": "LUNAUSDT", "status": "BREAK", "baseAsset": "LUNA", "quoteAsset": "USDT"}
            ]
        });

        let catalog = BinanceParser.parse_catalog(&body).unwrap();

        assert_eq!(catalog.len(), 2);
        assert!(catalog.contains(&Symbol::new("BTC/USDT")));
        assert!(!catalog.contains(&Symbol::new("LUNA/USDT")));
    }

    #[test]
    fn test_binance_combined_ticker() {
        let frame = r#"{"stream":"btcusdt@ticker","data":{"e":"24hrTicker","E":1700000000000,"s":"BTCUSDT","c":"37000.50","b":"37000.00","a":"37001.00"}}"#;

        let tickers = BinanceParser
            .parse_tickers(frame, &symbols(&["BTC/USDT", "ETH/USDT"]))
            .unwrap();

        assert_eq!(tickers.len(), 1);
        let ticker = &tickers[0];
        assert_eq!(ticker.venue, VenueId::binance());
        assert_eq!(ticker.symbol, Symbol::new("BTC/USDT"));
        assert_eq!(ticker.bid, Some(dec!(37000.00)));
        assert_eq!(ticker.ask, Some(dec!(37001.00)));
        assert_eq!(ticker.last, Some(dec!(37000.50)));
        assert_eq!(ticker.timestamp.timestamp_millis(), 1_700_000_000_000);
    }

    #[test]
    fn test_binance_ignores_unsubscribed_and_control_frames() {
        let subscribed = symbols(&["ETH/USDT"]);
        let other = r#"{"stream":"btcusdt@ticker","data":{"e":"24hrTicker","E":1,"s":"BTCUSDT","c":"1"}}"#;
        let ack = r#"{"result":null,"id":1}"#;

        assert!(BinanceParser.parse_tickers(other, &subscribed).unwrap().is_empty());
        assert!(BinanceParser.parse_tickers(ack, &subscribed).unwrap().is_empty());
        assert!(BinanceParser.parse_tickers("not json", &subscribed).is_err());
    }

    #[test]
    fn test_bybit_catalog_and_ticker() {
        let body = serde_json::json!({
            "retCode": 0,
            "retMsg": "OK",
            "result": {"category": "spot", "list": [
                {"symbol": "BTCUSDT", "baseCoin": "BTC", "quoteCoin": "USDT", "status": "Trading"},
                {"symbol": "SOLUSDT", "baseCoin": "SOL", "quoteCoin": "USDT", "status": "Trading"}
            ]}
        });
        let catalog = BybitParser.parse_catalog(&body).unwrap();
        assert!(catalog.contains(&Symbol::new("SOL/USDT")));

        let frame = r#"{"topic":"tickers.SOLUSDT","ts":1700000000123,"type":"snapshot","data":{"symbol":"SOLUSDT","lastPrice":"61.25","bid1Price":"61.24","ask1Price":"61.26"}}"#;
        let tickers = BybitParser
            .parse_tickers(frame, &symbols(&["SOL/USDT"]))
            .unwrap();

        assert_eq!(tickers.len(), 1);
        assert_eq!(tickers[0].last, Some(dec!(61.25)));
        assert_eq!(tickers[0].spread(), Some(dec!(0.02)));
    }

    #[test]
    fn test_bybit_error_responses() {
        let body = serde_json::json!({"retCode": 10001, "retMsg": "params error"});
        assert!(matches!(
            BybitParser.parse_catalog(&body),
            Err(TransportError::Protocol(_))
        ));

        let rejected = r#"{"success":false,"ret_msg":"args size >10","op":"subscribe"}"#;
        assert!(BybitParser.parse_tickers(rejected, &[]).is_err());

        let pong = r#"{"success":true,"ret_msg":"pong","op":"ping"}"#;
        assert!(BybitParser.parse_tickers(pong, &[]).unwrap().is_empty());
    }

    #[test]
    fn test_kraken_catalog_normalizes_xbt() {
        let body = serde_json::json!({
            "error": [],
            "result": {
                "XXBTZUSD": {"altname": "XBTUSD", "wsname": "XBT/USD", "status": "online"},
                "XETHZUSD": {"altname": "ETHUSD", "wsname": "ETH/USD", "status": "online"},
                "XDGUSD": {"altname": "XDGUSD", "wsname": "XDG/USD", "status": "cancel_only"}
            }
        });

        let catalog = KrakenParser.parse_catalog(&body).unwrap();

        assert!(catalog.contains(&Symbol::new("BTC/USD")));
        assert!(catalog.contains(&Symbol::new("ETH/USD")));
        assert!(!catalog.contains(&Symbol::new("DOGE/USD")));
    }

    #[test]
    fn test_kraken_ticker_numbers() {
        let frame = r#"{"channel":"ticker","type":"update","data":[{"symbol":"BTC/USD","bid":37000.1,"ask":37000.2,"last":37000.15}]}"#;

        let tickers = KrakenParser
            .parse_tickers(frame, &symbols(&["BTC/USD"]))
            .unwrap();

        assert_eq!(tickers.len(), 1);
        assert_eq!(tickers[0].bid, Some(dec!(37000.1)));
        assert_eq!(tickers[0].last, Some(dec!(37000.15)));

        let heartbeat = r#"{"channel":"heartbeat"}"#;
        assert!(KrakenParser.parse_tickers(heartbeat, &[]).unwrap().is_empty());
    }

    #[test]
    fn test_mexc_catalog_keeps_online_spot_pairs() {
        let body = serde_json::json!({
            "symbols": [
                {"symbol": "BTCUSDT", "status": "1", "baseAsset": "BTC", "quoteAsset": "USDT", "isSpotTradingAllowed": true},
                {"symbol": "KASUSDT", "status": "ENABLED", "baseAsset": "KAS", "quoteAsset": "USDT"},
                {"symbol": "OLDUSDT", "status": "2", "baseAsset": "OLD", "quoteAsset": "USDT"},
                {"symbol": "APIUSDT", "status": "1", "baseAsset": "API", "quoteAsset": "USDT", "isSpotTradingAllowed": false}
            ]
        });

        let catalog = MexcParser.parse_catalog(&body).unwrap();

        assert_eq!(catalog.len(), 2);
        assert!(catalog.contains(&Symbol::new("BTC/USDT")));
        assert!(catalog.contains(&Symbol::new("KAS/USDT")));
    }

    #[test]
    fn test_mexc_book_ticker_and_acks() {
        let frame = r#"{"c":"spot@public.bookTicker.v3.api@BTCUSDT","d":{"A":"0.5","B":"1.2","a":"37001.0","b":"37000.0"},"s":"BTCUSDT","t":1700000000000}"#;
        let tickers = MexcParser
            .parse_tickers(frame, &symbols(&["BTC/USDT"]))
            .unwrap();

        assert_eq!(tickers.len(), 1);
        assert_eq!(tickers[0].venue, VenueId::mexc());
        assert_eq!(tickers[0].bid, Some(dec!(37000.0)));
        assert_eq!(tickers[0].ask, Some(dec!(37001.0)));
        assert_eq!(tickers[0].last, None);

        let ack = r#"{"id":0,"code":0,"msg":"spot@public.bookTicker.v3.api@BTCUSDT"}"#;
        assert!(MexcParser.parse_tickers(ack, &[]).unwrap().is_empty());

        let pong = r#"{"id":0,"code":0,"msg":"PONG"}"#;
        assert!(MexcParser.parse_tickers(pong, &[]).unwrap().is_empty());

        let rejected = r#"{"id":0,"code":1,"msg":"Not Subscribed successfully! Reason: Blocked!"}"#;
        assert!(MexcParser.parse_tickers(rejected, &[]).is_err());
    }
}
