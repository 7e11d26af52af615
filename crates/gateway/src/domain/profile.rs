//! Venue Profiles
//!
//! Static per-venue streaming quirks, resolved once per session. Adding a
//! venue means adding one entry to [`ProfileRegistry::builtin`].

use std::collections::HashMap;

use qae_core::VenueId;

use crate::error::GatewayError;

/// How a venue accepts ticker subscriptions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionStrategy {
    /// One subscription covering many symbols. `max_symbols = None` means the
    /// venue accepts any batch size.
    Batched { max_symbols: Option<usize> },
    /// No batched ticker stream; one subscription per symbol.
    PerSymbol,
}

/// Fallback used when batched subscription is unavailable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackMode {
    None,
    PerSymbolWatch,
}

/// Immutable streaming metadata for one venue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VenueProfile {
    pub venue: VenueId,
    pub strategy: SubscriptionStrategy,
    /// Private access needs a passphrase in addition to key and secret
    pub requires_passphrase: bool,
}

impl VenueProfile {
    /// Batched venue with no symbol limit
    pub fn batched(venue: impl Into<VenueId>) -> Self {
        VenueProfile {
            venue: venue.into(),
            strategy: SubscriptionStrategy::Batched { max_symbols: None },
            requires_passphrase: false,
        }
    }

    /// Batched venue that rejects batches above `max_symbols`
    pub fn batched_with_limit(venue: impl Into<VenueId>, max_symbols: usize) -> Self {
        VenueProfile {
            venue: venue.into(),
            strategy: SubscriptionStrategy::Batched {
                max_symbols: Some(max_symbols),
            },
            requires_passphrase: false,
        }
    }

    /// Venue without batched tickers
    pub fn per_symbol(venue: impl Into<VenueId>) -> Self {
        VenueProfile {
            venue: venue.into(),
            strategy: SubscriptionStrategy::PerSymbol,
            requires_passphrase: false,
        }
    }

    pub fn with_passphrase_required(mut self) -> Self {
        self.requires_passphrase = true;
        self
    }

    pub fn supports_batched_subscribe(&self) -> bool {
        matches!(self.strategy, SubscriptionStrategy::Batched { .. })
    }

    /// Batch limit; `None` when unbounded or when batching is unsupported
    pub fn max_symbols_per_batch(&self) -> Option<usize> {
        match self.strategy {
            SubscriptionStrategy::Batched { max_symbols } => max_symbols,
            SubscriptionStrategy::PerSymbol => None,
        }
    }

    pub fn fallback_mode(&self) -> FallbackMode {
        match self.strategy {
            SubscriptionStrategy::Batched { .. } => FallbackMode::None,
            SubscriptionStrategy::PerSymbol => FallbackMode::PerSymbolWatch,
        }
    }
}

/// Read-only lookup of venue profiles
#[derive(Debug, Clone, Default)]
pub struct ProfileRegistry {
    profiles: HashMap<VenueId, VenueProfile>,
}

impl ProfileRegistry {
    /// Empty registry; use [`ProfileRegistry::with_profile`] to populate
    pub fn new() -> Self {
        Self::default()
    }

    /// Profiles for every venue the gateway knows how to stream
    pub fn builtin() -> Self {
        ProfileRegistry::new()
            .with_profile(VenueProfile::batched(VenueId::binance()))
            // watchTickers is rejected above 10 symbols
            .with_profile(VenueProfile::batched_with_limit(VenueId::bybit(), 10))
            .with_profile(VenueProfile::per_symbol(VenueId::kraken()))
            .with_profile(VenueProfile::per_symbol(VenueId::mexc()))
            .with_profile(VenueProfile::batched(VenueId::okx()).with_passphrase_required())
            .with_profile(VenueProfile::batched(VenueId::kucoin()).with_passphrase_required())
            .with_profile(VenueProfile::batched(VenueId::gate()))
    }

    /// Add or replace a profile
    pub fn with_profile(mut self, profile: VenueProfile) -> Self {
        self.profiles.insert(profile.venue.clone(), profile);
        self
    }

    pub fn profile_for(&self, venue: &VenueId) -> Result<VenueProfile, GatewayError> {
        self.profiles
            .get(venue)
            .cloned()
            .ok_or_else(|| GatewayError::UnknownVenue(venue.clone()))
    }

    pub fn contains(&self, venue: &VenueId) -> bool {
        self.profiles.contains_key(venue)
    }

    /// Known venues, sorted for stable output
    pub fn venues(&self) -> Vec<VenueId> {
        let mut venues: Vec<VenueId> = self.profiles.keys().cloned().collect();
        venues.sort();
        venues
    }
}
