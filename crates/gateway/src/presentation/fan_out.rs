//! Ticker Fan-Out
//!
//! Delivers every normalized ticker to all current subscribers. Each
//! subscriber owns a bounded buffer; when it is full the new ticker is
//! dropped for that subscriber and counted, so a slow consumer never stalls
//! a venue's receive loop.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use dashmap::DashMap;
use qae_core::Ticker;
use tokio::sync::mpsc::{self, error::TryRecvError, error::TrySendError};

use crate::application::config::FanOutConfig;

/// Identifier of one subscriber
pub type SubscriberId = u64;

/// Result of one publish call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Delivery {
    pub delivered: usize,
    pub dropped: usize,
}

struct SubscriberSlot {
    tx: mpsc::Sender<Ticker>,
    dropped: Arc<AtomicU64>,
}

struct FanOutInner {
    subscribers: DashMap<SubscriberId, SubscriberSlot>,
    next_id: AtomicU64,
    buffer_capacity: usize,
    total_dropped: AtomicU64,
    total_published: AtomicU64,
}

/// Cloneable handle to the shared subscriber list
#[derive(Clone)]
pub struct FanOut {
    inner: Arc<FanOutInner>,
}

impl Default for FanOut {
    fn default() -> Self {
        Self::new(FanOutConfig::default())
    }
}

impl FanOut {
    pub fn new(config: FanOutConfig) -> Self {
        FanOut {
            inner: Arc::new(FanOutInner {
                subscribers: DashMap::new(),
                next_id: AtomicU64::new(1),
                // tokio rejects zero-capacity channels
                buffer_capacity: config.buffer_capacity.max(1),
                total_dropped: AtomicU64::new(0),
                total_published: AtomicU64::new(0),
            }),
        }
    }

    /// Register a new subscriber with an empty buffer
    pub fn subscribe(&self) -> TickerSubscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(self.inner.buffer_capacity);
        let dropped = Arc::new(AtomicU64::new(0));

        self.inner.subscribers.insert(
            id,
            SubscriberSlot {
                tx,
                dropped: Arc::clone(&dropped),
            },
        );
        tracing::debug!(subscriber = id, "Ticker subscriber registered");

        TickerSubscription {
            id,
            rx,
            dropped,
            fan_out: Arc::downgrade(&self.inner),
        }
    }

    /// Remove a subscriber, discarding anything still buffered for it
    pub fn unsubscribe(&self, subscription: TickerSubscription) {
        drop(subscription);
    }

    /// Offer a ticker to every subscriber without waiting
    pub fn publish(&self, ticker: Ticker) -> Delivery {
        self.inner.total_published.fetch_add(1, Ordering::Relaxed);

        let mut delivery = Delivery::default();
        let mut closed = Vec::new();

        for entry in self.inner.subscribers.iter() {
            match entry.tx.try_send(ticker.clone()) {
                Ok(()) => delivery.delivered += 1,
                Err(TrySendError::Full(_)) => {
                    let subscriber_drops = entry.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                    self.inner.total_dropped.fetch_add(1, Ordering::Relaxed);
                    delivery.dropped += 1;
                    tracing::warn!(
                        subscriber = *entry.key(),
                        venue = %ticker.venue,
                        symbol = %ticker.symbol,
                        dropped = subscriber_drops,
                        "Subscriber buffer full, dropping ticker"
                    );
                }
                Err(TrySendError::Closed(_)) => closed.push(*entry.key()),
            }
        }

        // Removing while iterating would deadlock the shard lock
        for id in closed {
            self.inner.subscribers.remove(&id);
            tracing::debug!(subscriber = id, "Pruned closed ticker subscriber");
        }

        delivery
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.len()
    }

    /// Drops across all subscribers since creation
    pub fn total_dropped(&self) -> u64 {
        self.inner.total_dropped.load(Ordering::Relaxed)
    }

    pub fn total_published(&self) -> u64 {
        self.inner.total_published.load(Ordering::Relaxed)
    }

    pub fn buffer_capacity(&self) -> usize {
        self.inner.buffer_capacity
    }
}

/// Receiving end of one subscription
///
/// A lazy, unbounded, non-restartable sequence of tickers. Dropping it
/// unsubscribes.
pub struct TickerSubscription {
    id: SubscriberId,
    rx: mpsc::Receiver<Ticker>,
    dropped: Arc<AtomicU64>,
    fan_out: Weak<FanOutInner>,
}

impl TickerSubscription {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Wait for the next ticker; `None` once the fan-out is gone
    pub async fn recv(&mut self) -> Option<Ticker> {
        self.rx.recv().await
    }

    /// Next buffered ticker, if any
    pub fn try_recv(&mut self) -> Option<Ticker> {
        match self.rx.try_recv() {
            Ok(ticker) => Some(ticker),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Tickers currently waiting in the buffer
    pub fn buffered(&self) -> usize {
        self.rx.len()
    }

    /// Tickers dropped for this subscriber because its buffer was full
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl Drop for TickerSubscription {
    fn drop(&mut self) {
        if let Some(inner) = self.fan_out.upgrade() {
            inner.subscribers.remove(&self.id);
            tracing::debug!(subscriber = self.id, "Ticker subscriber removed");
        }
    }
}
