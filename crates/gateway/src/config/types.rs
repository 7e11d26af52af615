use std::time::Duration;

use qae_core::{Symbol, VenueId};
use serde::{Deserialize, Serialize};

use crate::application::{FanOutConfig, SessionConfig};
use crate::infrastructure::{Dialect, Endpoints};

/// Root configuration file structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfigFile {
    /// Symbols tracked on every venue without its own list
    pub symbols: Vec<String>,
    pub venues: Vec<VenueConfig>,
    #[serde(default)]
    pub session: SessionConfigJson,
    #[serde(default)]
    pub fan_out: FanOutConfigJson,
}

/// Venue entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VenueConfig {
    pub id: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Overrides the global symbol list
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbols: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rest_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ws_url: Option<String>,
}

fn default_enabled() -> bool {
    true
}

impl VenueConfig {
    pub fn venue(&self) -> VenueId {
        VenueId::new(&self.id)
    }

    /// Endpoint override, with unset URLs taken from the venue's defaults
    pub fn endpoints(&self) -> Option<Endpoints> {
        if self.rest_url.is_none() && self.ws_url.is_none() {
            return None;
        }
        let defaults = Dialect::for_venue(&self.venue())?.default_endpoints();
        Some(Endpoints::new(
            self.rest_url.clone().unwrap_or(defaults.rest),
            self.ws_url.clone().unwrap_or(defaults.ws),
        ))
    }
}

/// Session policies in milliseconds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfigJson {
    #[serde(default = "default_catalog_timeout_ms")]
    pub catalog_timeout_ms: u64,
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,
    #[serde(default = "default_max_per_symbol_streams")]
    pub max_per_symbol_streams: usize,
}

fn default_catalog_timeout_ms() -> u64 {
    15_000
}

fn default_reconnect_delay_ms() -> u64 {
    5_000
}

fn default_max_per_symbol_streams() -> usize {
    5
}

impl Default for SessionConfigJson {
    fn default() -> Self {
        SessionConfigJson {
            catalog_timeout_ms: default_catalog_timeout_ms(),
            reconnect_delay_ms: default_reconnect_delay_ms(),
            max_per_symbol_streams: default_max_per_symbol_streams(),
        }
    }
}

impl SessionConfigJson {
    pub fn to_session_config(&self) -> SessionConfig {
        SessionConfig::default()
            .with_catalog_timeout(Duration::from_millis(self.catalog_timeout_ms))
            .with_reconnect_delay(Duration::from_millis(self.reconnect_delay_ms))
            .with_max_per_symbol_streams(self.max_per_symbol_streams)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FanOutConfigJson {
    #[serde(default = "default_buffer_capacity")]
    pub buffer_capacity: usize,
}

fn default_buffer_capacity() -> usize {
    1024
}

impl Default for FanOutConfigJson {
    fn default() -> Self {
        FanOutConfigJson {
            buffer_capacity: default_buffer_capacity(),
        }
    }
}

impl FanOutConfigJson {
    pub fn to_fan_out_config(&self) -> FanOutConfig {
        FanOutConfig {
            buffer_capacity: self.buffer_capacity,
        }
    }
}

pub(crate) fn parse_symbols(raw: &[String]) -> Vec<Symbol> {
    raw.iter().map(Symbol::new).collect()
}
