mod credentials;
mod ticker;

pub use credentials::Credentials;
pub use ticker::Ticker;
