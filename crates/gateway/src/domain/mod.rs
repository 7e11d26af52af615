pub mod plan;
pub mod profile;
pub mod session_state;
pub mod traits;

pub use plan::{Coverage, SubscriptionPlan};
pub use profile::{FallbackMode, ProfileRegistry, SubscriptionStrategy, VenueProfile};
pub use session_state::{SessionHealth, SessionState, StateTransition};
pub use traits::{ClientFactory, VenueClient};

// Shared kernel types used throughout the gateway
pub use qae_core::{Credentials, Symbol, Ticker, VenueId};
