use reqwest::Client;
use serde_json::Value;
use thiserror::Error;

use crate::error::TransportError;

#[derive(Error, Debug)]
pub enum RestError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Convert infrastructure RestError to the transport error sessions see
impl From<RestError> for TransportError {
    fn from(err: RestError) -> Self {
        match err {
            RestError::Http(e) => TransportError::Http(e.to_string()),
            RestError::Status { status, body } => {
                TransportError::Http(format!("status {status}: {body}"))
            }
            RestError::Parse(msg) => TransportError::Protocol(msg),
        }
    }
}

/// Public REST client for venue reference data
/// Infrastructure component - handles HTTP communication
#[derive(Clone)]
pub struct RestClient {
    client: Client,
    base_url: String,
}

impl RestClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        RestClient {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET `path` and decode the body as JSON
    pub async fn get_json(&self, path: &str) -> Result<Value, RestError> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(url = %url, "REST request");

        let resp = self.client.get(&url).send().await?;
        let status = resp.status();
        let text = resp.text().await?;

        if !status.is_success() {
            return Err(RestError::Status {
                status: status.as_u16(),
                body: truncate(&text, 256),
            });
        }

        serde_json::from_str(&text).map_err(|e| RestError::Parse(e.to_string()))
    }
}

fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = RestClient::new("https://api.binance.com/");
        assert_eq!(client.base_url(), "https://api.binance.com");
    }

    #[test]
    fn test_status_error_maps_to_http() {
        let err: TransportError = RestError::Status {
            status: 418,
            body: "teapot".into(),
        }
        .into();
        assert_eq!(err, TransportError::Http("status 418: teapot".into()));

        let err: TransportError = RestError::Parse("bad json".into()).into();
        assert_eq!(err, TransportError::Protocol("bad json".into()));
    }

    #[test]
    fn test_truncate_long_bodies() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdef", 3), "abc...");
    }
}
