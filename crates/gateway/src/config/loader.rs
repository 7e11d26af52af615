use std::path::Path;

use qae_core::Symbol;
use thiserror::Error;

use super::types::{FeedConfigFile, VenueConfig, parse_symbols};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("No enabled venues in config")]
    NoEnabledVenues,
    #[error("Invalid symbol {symbol:?}, expected BASE/QUOTE")]
    InvalidSymbol { symbol: String },
    #[error("{field} must be greater than zero")]
    ZeroSetting { field: &'static str },
}

/// Load feed configuration from a JSON file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<FeedConfigFile, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    load_config_from_str(&content)
}

/// Load configuration from a JSON string
pub fn load_config_from_str(json: &str) -> Result<FeedConfigFile, ConfigError> {
    let config: FeedConfigFile = serde_json::from_str(json)?;
    Ok(config)
}

/// Load the default embedded configuration
pub fn load_default_config() -> Result<FeedConfigFile, ConfigError> {
    let default_config = include_str!("feed_config.json");
    load_config_from_str(default_config)
}

impl FeedConfigFile {
    /// Get only enabled venues
    pub fn enabled_venues(&self) -> Vec<&VenueConfig> {
        self.venues.iter().filter(|v| v.enabled).collect()
    }

    /// Get a specific venue by id
    pub fn get_venue(&self, id: &str) -> Option<&VenueConfig> {
        self.venues.iter().find(|v| v.id.eq_ignore_ascii_case(id))
    }

    /// Global symbol list
    pub fn tracked_symbols(&self) -> Vec<Symbol> {
        parse_symbols(&self.symbols)
    }

    /// Symbols a venue should track: its own list or the global one
    pub fn symbols_for(&self, venue: &VenueConfig) -> Vec<Symbol> {
        match &venue.symbols {
            Some(symbols) => parse_symbols(symbols),
            None => self.tracked_symbols(),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.enabled_venues().is_empty() {
            return Err(ConfigError::NoEnabledVenues);
        }

        let zero_settings = [
            ("session.catalog_timeout_ms", self.session.catalog_timeout_ms == 0),
            ("session.max_per_symbol_streams", self.session.max_per_symbol_streams == 0),
            ("fan_out.buffer_capacity", self.fan_out.buffer_capacity == 0),
        ];
        if let Some((field, _)) = zero_settings.into_iter().find(|(_, is_zero)| *is_zero) {
            return Err(ConfigError::ZeroSetting { field });
        }

        let venue_symbols = self.venues.iter().filter_map(|v| v.symbols.as_ref()).flatten();
        for raw in self.symbols.iter().chain(venue_symbols) {
            if !Symbol::new(raw).is_well_formed() {
                return Err(ConfigError::InvalidSymbol {
                    symbol: raw.clone(),
                });
            }
        }

        Ok(())
    }
}
