//! Feed runner
//!
//! Wires configuration, credentials and the gateway registry together for
//! the `qae-runner` binary.

pub mod credentials;
pub mod report;

pub use credentials::{credentials_for, credentials_from_env};
pub use report::health_line;
