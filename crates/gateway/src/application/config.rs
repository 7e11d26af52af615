use std::time::Duration;

/// Policies applied by every connection session
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Deadline for loading the venue catalog during connect
    pub catalog_timeout: Duration,
    /// Fixed delay before retrying a subscription after a transport error
    pub reconnect_delay: Duration,
    /// Maximum concurrent per-symbol subscriptions on fallback venues
    pub max_per_symbol_streams: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            catalog_timeout: Duration::from_secs(15),
            reconnect_delay: Duration::from_secs(5),
            max_per_symbol_streams: 5,
        }
    }
}

impl SessionConfig {
    pub fn with_catalog_timeout(mut self, timeout: Duration) -> Self {
        self.catalog_timeout = timeout;
        self
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    pub fn with_max_per_symbol_streams(mut self, cap: usize) -> Self {
        self.max_per_symbol_streams = cap;
        self
    }
}

/// Fan-out buffering policy
#[derive(Debug, Clone)]
pub struct FanOutConfig {
    /// Tickers buffered per subscriber before new ones are dropped
    pub buffer_capacity: usize,
}

impl Default for FanOutConfig {
    fn default() -> Self {
        FanOutConfig {
            buffer_capacity: 1024,
        }
    }
}
