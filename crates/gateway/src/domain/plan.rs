use std::collections::HashSet;

use qae_core::Symbol;

use super::profile::{SubscriptionStrategy, VenueProfile};

/// How much of the requested symbol set a session actually streams
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Coverage {
    /// Symbols with an active subscription
    pub subscribed: Vec<Symbol>,
    /// Listed symbols cut by the venue batch limit or the per-symbol cap
    pub truncated: Vec<Symbol>,
    /// Requested symbols the venue catalog does not list
    pub unlisted: Vec<Symbol>,
}

impl Coverage {
    /// Fewer symbols streamed than requested
    pub fn is_degraded(&self) -> bool {
        !self.truncated.is_empty() || !self.unlisted.is_empty()
    }

    pub fn uncovered_count(&self) -> usize {
        self.truncated.len() + self.unlisted.len()
    }
}

/// Subscriptions a session opens after its catalog has loaded
///
/// Each entry of `streams` is served by one receive loop: a single entry with
/// every symbol for batched venues, one single-symbol entry per loop for
/// per-symbol venues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionPlan {
    pub streams: Vec<Vec<Symbol>>,
    pub coverage: Coverage,
}

impl SubscriptionPlan {
    /// Filter `requested` against the catalog, then apply the venue's limit
    ///
    /// Truncation is deterministic: the first symbols in request order win.
    /// Duplicate requests are collapsed.
    pub fn build(
        profile: &VenueProfile,
        requested: &[Symbol],
        catalog: &HashSet<Symbol>,
        per_symbol_cap: usize,
    ) -> Self {
        let mut seen = HashSet::new();
        let mut listed = Vec::new();
        let mut unlisted = Vec::new();

        for symbol in requested {
            if !seen.insert(symbol.clone()) {
                continue;
            }
            if catalog.contains(symbol) {
                listed.push(symbol.clone());
            } else {
                unlisted.push(symbol.clone());
            }
        }

        let limit = match profile.strategy {
            SubscriptionStrategy::Batched { max_symbols } => max_symbols,
            SubscriptionStrategy::PerSymbol => Some(per_symbol_cap),
        };

        let truncated = match limit {
            Some(limit) if listed.len() > limit => listed.split_off(limit),
            _ => Vec::new(),
        };

        let streams = if listed.is_empty() {
            Vec::new()
        } else {
            match profile.strategy {
                SubscriptionStrategy::Batched { .. } => vec![listed.clone()],
                SubscriptionStrategy::PerSymbol => {
                    listed.iter().map(|symbol| vec![symbol.clone()]).collect()
                }
            }
        };

        SubscriptionPlan {
            streams,
            coverage: Coverage {
                subscribed: listed,
                truncated,
                unlisted,
            },
        }
    }

    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }
}
