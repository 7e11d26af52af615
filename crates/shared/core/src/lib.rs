//! QAE Core Domain
//!
//! Pure domain types shared by the market data gateway and its consumers.
//! This crate contains no async, no I/O, and is 100% unit testable.

pub mod entities;
pub mod values;

// Re-export commonly used types at crate root
pub use entities::{Credentials, Ticker};
pub use values::{Price, Symbol, Timestamp, VenueId};
