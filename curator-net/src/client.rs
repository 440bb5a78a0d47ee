//! HTTP client construction
//!
//! Builds the `reqwest` client every outbound signal request goes through,
//! with a rotating browser user agent and an optional proxy.

use reqwest::{Client, Proxy};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Client configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetConfig {
    /// Proxy URL for all requests (http, https or socks5h)
    pub proxy: Option<String>,
    /// Fixed user agent; a random browser agent is used when unset
    pub user_agent: Option<String>,
}

/// Errors from outbound HTTP
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NetError {
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("{url} returned status {status}")]
    Status { url: String, status: u16 },

    #[error("{url} timed out after {secs} seconds")]
    Timeout { url: String, secs: u64 },

    #[error("Request to {url} failed: {reason}")]
    Transport { url: String, reason: String },

    #[error("Malformed response body: {0}")]
    Body(String),

    #[error("Concurrency limiter closed")]
    Closed,
}

impl NetError {
    /// 429, 5xx and timeouts are worth another attempt
    pub fn is_retryable(&self) -> bool {
        match self {
            NetError::Status { status, .. } => *status == 429 || (500..600).contains(status),
            NetError::Timeout { .. } => true,
            _ => false,
        }
    }
}

/// User agents for rotation
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/135.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/135.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/135.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:137.0) Gecko/20100101 Firefox/137.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14.7; rv:137.0) Gecko/20100101 Firefox/137.0",
];

/// Get a random user agent
pub fn random_user_agent() -> &'static str {
    use rand::Rng;
    let idx = rand::thread_rng().gen_range(0..USER_AGENTS.len());
    USER_AGENTS[idx]
}

/// Create the HTTP client used for signal sources
///
/// Per-request timeouts are set by the fetch policy; the client only bounds
/// connection setup.
pub fn create_client(config: &NetConfig) -> Result<Client, NetError> {
    let user_agent = config
        .user_agent
        .clone()
        .unwrap_or_else(|| random_user_agent().to_string());

    let mut builder = Client::builder()
        .user_agent(user_agent)
        .connect_timeout(Duration::from_secs(10));

    if let Some(proxy) = &config.proxy {
        let proxy = Proxy::all(proxy).map_err(|e| NetError::ClientBuild(e.to_string()))?;
        builder = builder.proxy(proxy);
    }

    builder
        .build()
        .map_err(|e| NetError::ClientBuild(e.to_string()))
}
