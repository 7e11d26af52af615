use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use futures_util::{SinkExt, StreamExt};
use qae_core::{Symbol, Ticker, VenueId};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::time::{Instant, sleep_until};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use super::dialect::{Dialect, Endpoints};
use super::parsers::VenueParser;
use super::rest_client::RestClient;
use crate::domain::VenueClient;
use crate::error::TransportError;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// One open subscription socket
struct Connection {
    socket: Socket,
    last_keepalive: Instant,
}

type Slot = Arc<Mutex<Option<Connection>>>;

/// WebSocket client for one venue
/// Infrastructure component - handles REST catalog loading and ticker streams
///
/// Every distinct symbol set gets its own socket, opened lazily on the first
/// receive and discarded after any error so the next receive reconnects.
pub struct WsVenueClient {
    venue: VenueId,
    dialect: Dialect,
    ws_base: String,
    rest: RestClient,
    parser: Arc<dyn VenueParser>,
    connections: DashMap<String, Slot>,
    authenticated: bool,
}

impl WsVenueClient {
    pub fn new(venue: VenueId, dialect: Dialect, endpoints: Endpoints) -> Self {
        WsVenueClient {
            venue,
            dialect,
            ws_base: endpoints.ws,
            rest: RestClient::new(endpoints.rest),
            parser: dialect.parser(),
            connections: DashMap::new(),
            authenticated: false,
        }
    }

    /// Mark the client as built from validated account credentials
    pub fn authenticated(mut self) -> Self {
        self.authenticated = true;
        self
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    /// Sockets currently open
    pub fn open_sockets(&self) -> usize {
        self.connections
            .iter()
            .filter(|entry| entry.value().try_lock().map(|c| c.is_some()).unwrap_or(true))
            .count()
    }

    async fn receive(&self, symbols: &[Symbol]) -> Result<Vec<Ticker>, TransportError> {
        let key = subscription_key(symbols);
        let slot = Arc::clone(
            self.connections
                .entry(key)
                .or_insert_with(|| Arc::new(Mutex::new(None)))
                .value(),
        );

        let mut connection = slot.lock().await;
        let result = self.receive_on(&mut connection, symbols).await;

        if let Err(e) = &result
            && let Some(mut dead) = connection.take()
        {
            tracing::debug!(venue = %self.venue, error = %e, "Discarding websocket after error");
            let _ = dead.socket.close(None).await;
        }

        result
    }

    async fn receive_on(
        &self,
        slot: &mut Option<Connection>,
        symbols: &[Symbol],
    ) -> Result<Vec<Ticker>, TransportError> {
        if slot.is_none() {
            *slot = Some(self.open(symbols).await?);
        }
        let Some(connection) = slot.as_mut() else {
            return Err(TransportError::Closed);
        };
        let keepalive = self.dialect.keepalive();

        loop {
            let message = match &keepalive {
                Some((interval, frame)) => {
                    tokio::select! {
                        message = connection.socket.next() => message,
                        _ = sleep_until(connection.last_keepalive + *interval) => {
                            connection.socket.send(Message::text(frame.clone())).await?;
                            connection.last_keepalive = Instant::now();
                            tracing::trace!(venue = %self.venue, "Sent keepalive");
                            continue;
                        }
                    }
                }
                None => connection.socket.next().await,
            };

            match message {
                Some(Ok(Message::Text(text))) => {
                    let tickers = self.parser.parse_tickers(text.as_str(), symbols)?;
                    if !tickers.is_empty() {
                        return Ok(tickers);
                    }
                }
                Some(Ok(Message::Ping(payload))) => {
                    connection.socket.send(Message::Pong(payload)).await?;
                }
                Some(Ok(Message::Close(frame))) => {
                    tracing::debug!(venue = %self.venue, frame = ?frame, "Venue closed websocket");
                    return Err(TransportError::Closed);
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e.into()),
                None => return Err(TransportError::Closed),
            }
        }
    }

    async fn open(&self, symbols: &[Symbol]) -> Result<Connection, TransportError> {
        let natives: Vec<String> = symbols
            .iter()
            .map(|symbol| self.parser.native_symbol(symbol))
            .collect();
        let url = self.dialect.stream_url(&self.ws_base, &natives);

        tracing::debug!(venue = %self.venue, url = %url, "Opening websocket");
        let (mut socket, _) = connect_async(url.as_str()).await?;

        if let Some(frame) = self.dialect.subscribe_frame(&natives) {
            socket.send(Message::text(frame)).await?;
        }
        tracing::info!(venue = %self.venue, symbols = ?symbols, "Websocket subscribed");

        Ok(Connection {
            socket,
            last_keepalive: Instant::now(),
        })
    }
}

#[async_trait]
impl VenueClient for WsVenueClient {
    async fn load_catalog(&self) -> Result<HashSet<Symbol>, TransportError> {
        let body = self.rest.get_json(self.dialect.catalog_path()).await?;
        self.parser.parse_catalog(&body)
    }

    async fn subscribe_batch(&self, symbols: &[Symbol]) -> Result<Vec<Ticker>, TransportError> {
        self.receive(symbols).await
    }

    async fn subscribe_one(&self, symbol: &Symbol) -> Result<Ticker, TransportError> {
        let tickers = self.receive(std::slice::from_ref(symbol)).await?;
        newest(&self.venue, tickers)
    }

    async fn close(&self) -> Result<(), TransportError> {
        let slots: Vec<Slot> = self
            .connections
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        self.connections.clear();

        for slot in slots {
            if let Some(mut connection) = slot.lock().await.take()
                && let Err(e) = connection.socket.close(None).await
            {
                tracing::debug!(venue = %self.venue, error = %e, "Websocket close failed");
            }
        }

        tracing::debug!(venue = %self.venue, "Venue client closed");
        Ok(())
    }
}

/// Latest ticker of a single-symbol frame
///
/// Venues may pack several snapshots of the same symbol into one frame; the
/// earlier ones are superseded by the last.
fn newest(venue: &VenueId, mut tickers: Vec<Ticker>) -> Result<Ticker, TransportError> {
    let latest = tickers.pop().ok_or(TransportError::Closed)?;
    if !tickers.is_empty() {
        tracing::trace!(
            venue = %venue,
            symbol = %latest.symbol,
            discarded = tickers.len(),
            "Superseded tickers in frame discarded"
        );
    }
    Ok(latest)
}

/// Stable key for a symbol set, independent of order
fn subscription_key(symbols: &[Symbol]) -> String {
    let mut names: Vec<&str> = symbols.iter().map(Symbol::as_str).collect();
    names.sort_unstable();
    names.join(",")
}
