pub mod config;
pub mod exchange_manager;
pub mod session;

pub use config::{FanOutConfig, SessionConfig};
pub use exchange_manager::ExchangeRegistry;
pub use session::ConnectionSession;
