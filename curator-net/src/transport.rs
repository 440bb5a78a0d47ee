//! Transport seam
//!
//! The fetch policy only needs "GET this URL within this timeout". Keeping
//! that behind a trait lets tests script responses without a network.

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::{create_client, NetConfig, NetError};

/// Status and body of a completed GET
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    pub fn with_status(status: u16) -> Self {
        Self {
            status,
            body: String::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Decode the body as JSON
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, NetError> {
        serde_json::from_str(&self.body).map_err(|e| NetError::Body(e.to_string()))
    }
}

/// Anything that can perform a GET
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &str, timeout: Duration) -> Result<HttpResponse, NetError>;
}

pub type SharedTransport = Arc<dyn Transport>;

/// Production transport over `reqwest`
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(config: &NetConfig) -> Result<Self, NetError> {
        Ok(Self {
            client: create_client(config)?,
        })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn get(&self, url: &str, timeout: Duration) -> Result<HttpResponse, NetError> {
        let map_err = |e: reqwest::Error| {
            if e.is_timeout() {
                NetError::Timeout {
                    url: url.to_string(),
                    secs: timeout.as_secs(),
                }
            } else {
                NetError::Transport {
                    url: url.to_string(),
                    reason: e.to_string(),
                }
            }
        };

        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(map_err)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(map_err)?;
        debug!("GET {} -> {} ({} bytes)", url, status, body.len());
        Ok(HttpResponse { status, body })
    }
}

/// Scripted transport for tests and offline runs
///
/// Responses are queued per exact URL. When a URL's queue holds one entry
/// it is replayed forever; an unknown URL answers 404.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    routes: Mutex<HashMap<String, VecDeque<Result<HttpResponse, NetError>>>>,
    calls: Mutex<Vec<String>>,
    latency: Option<Duration>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call sleeps this long before answering
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Queue a response for `url`
    pub fn push(&self, url: &str, response: Result<HttpResponse, NetError>) -> &Self {
        self.routes
            .lock()
            .entry(url.to_string())
            .or_default()
            .push_back(response);
        self
    }

    pub fn respond(&self, url: &str, body: impl Into<String>) -> &Self {
        self.push(url, Ok(HttpResponse::ok(body)))
    }

    /// URLs requested so far, in call order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    fn next_response(&self, url: &str) -> Result<HttpResponse, NetError> {
        let mut routes = self.routes.lock();
        match routes.get_mut(url) {
            Some(queue) if queue.len() > 1 => queue
                .pop_front()
                .unwrap_or_else(|| Ok(HttpResponse::with_status(404))),
            Some(queue) => queue
                .front()
                .cloned()
                .unwrap_or_else(|| Ok(HttpResponse::with_status(404))),
            None => Ok(HttpResponse::with_status(404)),
        }
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn get(&self, url: &str, _timeout: Duration) -> Result<HttpResponse, NetError> {
        self.calls.lock().push(url.to_string());
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        self.next_response(url)
    }
}
