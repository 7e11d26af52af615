//! Scripted venue transport shared by the integration tests
//!
//! Each venue gets a `VenueScript`. Tests push tickers or errors onto the
//! feed for a symbol set and the session receives them in order. The script
//! counts every client it hands out and every close, so tests can assert
//! that no handle outlives a session.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use qae_core::{Credentials, Symbol, Ticker, VenueId};
use qae_gateway::{ClientFactory, SessionState, TransportError, VenueClient};
use tokio::sync::mpsc;

type Step = Result<Vec<Ticker>, TransportError>;

/// How `load_catalog` behaves
#[derive(Clone)]
pub enum CatalogBehavior {
    Listed(HashSet<Symbol>),
    Fail(TransportError),
    Hang,
}

struct Feed {
    tx: mpsc::UnboundedSender<Step>,
    rx: Arc<tokio::sync::Mutex<mpsc::UnboundedReceiver<Step>>>,
}

pub struct VenueScript {
    venue: VenueId,
    catalog: parking_lot::Mutex<CatalogBehavior>,
    public_failure: parking_lot::Mutex<Option<TransportError>>,
    private_failure: parking_lot::Mutex<Option<TransportError>>,
    feeds: parking_lot::Mutex<HashMap<String, Feed>>,
    opens: AtomicUsize,
    closes: AtomicUsize,
    private_opens: AtomicUsize,
    catalog_loads: AtomicUsize,
}

impl VenueScript {
    pub fn new(venue: impl Into<VenueId>, listed: &[&str]) -> Arc<Self> {
        Arc::new(VenueScript {
            venue: venue.into(),
            catalog: parking_lot::Mutex::new(CatalogBehavior::Listed(symbol_set(listed))),
            public_failure: parking_lot::Mutex::new(None),
            private_failure: parking_lot::Mutex::new(None),
            feeds: parking_lot::Mutex::new(HashMap::new()),
            opens: AtomicUsize::new(0),
            closes: AtomicUsize::new(0),
            private_opens: AtomicUsize::new(0),
            catalog_loads: AtomicUsize::new(0),
        })
    }

    pub fn set_catalog(&self, behavior: CatalogBehavior) {
        *self.catalog.lock() = behavior;
    }

    pub fn fail_public(&self, error: TransportError) {
        *self.public_failure.lock() = Some(error);
    }

    pub fn fail_private(&self, error: TransportError) {
        *self.private_failure.lock() = Some(error);
    }

    /// Queue tickers for the subscription covering `symbols`
    pub fn push(&self, symbols: &[&str], tickers: Vec<Ticker>) {
        self.step(symbols, Ok(tickers));
    }

    /// Queue a transport error for the subscription covering `symbols`
    pub fn push_error(&self, symbols: &[&str], error: TransportError) {
        self.step(symbols, Err(error));
    }

    pub fn ticker(&self, symbol: &str, last: rust_decimal::Decimal) -> Ticker {
        Ticker::new(self.venue.clone(), symbol).with_last(last)
    }

    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn private_opens(&self) -> usize {
        self.private_opens.load(Ordering::SeqCst)
    }

    pub fn catalog_loads(&self) -> usize {
        self.catalog_loads.load(Ordering::SeqCst)
    }

    /// Clients handed out and not yet closed
    pub fn open_handles(&self) -> usize {
        self.opens() - self.closes()
    }

    fn step(&self, symbols: &[&str], step: Step) {
        let key = feed_key(symbols.iter().map(|s| Symbol::new(*s)));
        // The receiver lives in the map, so sending cannot fail
        let _ = self.feed(&key).0.send(step);
    }

    fn feed(
        &self,
        key: &str,
    ) -> (
        mpsc::UnboundedSender<Step>,
        Arc<tokio::sync::Mutex<mpsc::UnboundedReceiver<Step>>>,
    ) {
        let mut feeds = self.feeds.lock();
        let feed = feeds.entry(key.to_string()).or_insert_with(|| {
            let (tx, rx) = mpsc::unbounded_channel();
            Feed {
                tx,
                rx: Arc::new(tokio::sync::Mutex::new(rx)),
            }
        });
        (feed.tx.clone(), Arc::clone(&feed.rx))
    }
}

fn feed_key(symbols: impl Iterator<Item = Symbol>) -> String {
    symbols
        .map(|s| s.as_str().to_string())
        .collect::<Vec<_>>()
        .join(",")
}

pub fn symbol_set(symbols: &[&str]) -> HashSet<Symbol> {
    symbols.iter().map(|s| Symbol::new(*s)).collect()
}

pub fn symbols(symbols: &[&str]) -> Vec<Symbol> {
    symbols.iter().map(|s| Symbol::new(*s)).collect()
}

pub struct ScriptedClient {
    script: Arc<VenueScript>,
    closed: AtomicBool,
}

impl ScriptedClient {
    async fn next(&self, symbols: &[Symbol]) -> Step {
        let key = feed_key(symbols.iter().cloned());
        let (_, rx) = self.script.feed(&key);
        let mut rx = rx.lock().await;
        match rx.recv().await {
            Some(step) => step,
            None => std::future::pending().await,
        }
    }
}

#[async_trait]
impl VenueClient for ScriptedClient {
    async fn load_catalog(&self) -> Result<HashSet<Symbol>, TransportError> {
        self.script.catalog_loads.fetch_add(1, Ordering::SeqCst);
        let behavior = self.script.catalog.lock().clone();
        match behavior {
            CatalogBehavior::Listed(symbols) => Ok(symbols),
            CatalogBehavior::Fail(error) => Err(error),
            CatalogBehavior::Hang => std::future::pending().await,
        }
    }

    async fn subscribe_batch(&self, symbols: &[Symbol]) -> Result<Vec<Ticker>, TransportError> {
        self.next(symbols).await
    }

    async fn subscribe_one(&self, symbol: &Symbol) -> Result<Ticker, TransportError> {
        let mut tickers = self.next(std::slice::from_ref(symbol)).await?;
        tickers.pop().ok_or(TransportError::Closed)
    }

    async fn close(&self) -> Result<(), TransportError> {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.script.closes.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeFactory {
    venues: HashMap<VenueId, Arc<VenueScript>>,
}

impl FakeFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_venue(mut self, script: &Arc<VenueScript>) -> Self {
        self.venues.insert(script.venue.clone(), Arc::clone(script));
        self
    }

    fn script(&self, venue: &VenueId) -> Result<Arc<VenueScript>, TransportError> {
        self.venues
            .get(venue)
            .cloned()
            .ok_or_else(|| TransportError::Unsupported(venue.to_string()))
    }

    fn client(script: Arc<VenueScript>) -> Arc<dyn VenueClient> {
        script.opens.fetch_add(1, Ordering::SeqCst);
        Arc::new(ScriptedClient {
            script,
            closed: AtomicBool::new(false),
        })
    }
}

#[async_trait]
impl ClientFactory for FakeFactory {
    async fn public_client(&self, venue: &VenueId) -> Result<Arc<dyn VenueClient>, TransportError> {
        let script = self.script(venue)?;
        if let Some(error) = script.public_failure.lock().clone() {
            return Err(error);
        }
        Ok(Self::client(script))
    }

    async fn private_client(
        &self,
        venue: &VenueId,
        _credentials: &Credentials,
    ) -> Result<Arc<dyn VenueClient>, TransportError> {
        let script = self.script(venue)?;
        if let Some(error) = script.private_failure.lock().clone() {
            return Err(error);
        }
        script.private_opens.fetch_add(1, Ordering::SeqCst);
        Ok(Self::client(script))
    }
}

/// Route gateway logs to the test output; safe to call from every test
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("qae_gateway=debug")
        .with_test_writer()
        .try_init();
}

/// Wait until `condition` holds, panicking after a second
pub async fn eventually(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(1), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

/// Wait for the session state to reach `state`
pub async fn wait_for_state(
    health: &mut tokio::sync::watch::Receiver<qae_gateway::SessionHealth>,
    state: SessionState,
) {
    tokio::time::timeout(Duration::from_secs(1), health.wait_for(|h| h.state == state))
        .await
        .expect("state not reached in time")
        .expect("session dropped");
}
