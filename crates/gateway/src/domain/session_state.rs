use std::fmt;

use qae_core::{Timestamp, VenueId};

use super::plan::Coverage;

/// Lifecycle state of a connection session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// Constructed, not yet started
    Idle,
    /// Building clients and loading the venue catalog
    Connecting,
    /// Catalog loaded, public client only
    ConnectedPublic,
    /// Catalog loaded, public and private clients
    ConnectedPublicAndPrivate,
    /// Subscriptions open, updates flowing
    Streaming,
    /// Waiting out the reconnect delay after a transport error
    Reconnecting,
    /// Stopped on request, no live resources
    Stopped,
    /// Initial setup failed; terminal until restarted
    Failed,
}

impl SessionState {
    /// `start()` has nothing more to wait for in this state
    pub fn is_settled(&self) -> bool {
        matches!(
            self,
            SessionState::Streaming
                | SessionState::Reconnecting
                | SessionState::Stopped
                | SessionState::Failed
        )
    }

    /// A new run may be started from this state
    pub fn can_start(&self) -> bool {
        matches!(
            self,
            SessionState::Idle | SessionState::Stopped | SessionState::Failed
        )
    }

    /// Subscriptions are established (possibly backing off after an error)
    pub fn is_live(&self) -> bool {
        matches!(self, SessionState::Streaming | SessionState::Reconnecting)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::Connecting => "connecting",
            SessionState::ConnectedPublic => "connected_public",
            SessionState::ConnectedPublicAndPrivate => "connected_public_and_private",
            SessionState::Streaming => "streaming",
            SessionState::Reconnecting => "reconnecting",
            SessionState::Stopped => "stopped",
            SessionState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// One observed state change
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateTransition {
    pub venue: VenueId,
    pub from: SessionState,
    pub to: SessionState,
    pub at: Timestamp,
}

/// Point-in-time health of one session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionHealth {
    pub venue: VenueId,
    pub state: SessionState,
    pub is_private_enabled: bool,
    pub subscribed_symbol_count: usize,
    pub coverage: Coverage,
    /// Transport errors recovered by reconnecting
    pub retry_count: u64,
    pub last_error: Option<String>,
}

impl SessionHealth {
    pub fn new(venue: VenueId) -> Self {
        SessionHealth {
            venue,
            state: SessionState::Idle,
            is_private_enabled: false,
            subscribed_symbol_count: 0,
            coverage: Coverage::default(),
            retry_count: 0,
            last_error: None,
        }
    }

    /// Fewer symbols streamed than requested
    pub fn is_degraded(&self) -> bool {
        self.coverage.is_degraded()
    }
}
