//! Rate-limited fetch policy
//!
//! Every request to a third-party signal source goes through one shared
//! `FetchPolicy`:
//! - at most `domain_concurrency` in-flight requests per host
//! - at most `total_concurrency` in-flight requests overall
//! - a random pause of `jitter_min_secs..=jitter_max_secs` since the start
//!   of the previous request, shared across all hosts
//! - a fixed retry ladder for 429, 5xx and timeouts
//!
//! Permits are held for the whole retry sequence of one call.

use dashmap::DashMap;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore};
use tokio::time::Instant;
use tracing::{debug, info, warn};
use url::Url;

use crate::{HttpResponse, NetConfig, NetError, ReqwestTransport, SharedTransport};

/// Upper bound for either end of the jitter range
pub const MAX_JITTER_SECS: f64 = 3600.0;

/// Politeness and retry settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Concurrent requests per host
    pub domain_concurrency: usize,
    /// Concurrent requests overall
    pub total_concurrency: usize,
    pub jitter_min_secs: f64,
    pub jitter_max_secs: f64,
    /// Per-attempt timeout
    pub timeout_secs: u64,
    /// Waits before each retry; its length is the retry count
    pub retry_delays_secs: Vec<u64>,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            domain_concurrency: 1,
            total_concurrency: 3,
            jitter_min_secs: 3.0,
            jitter_max_secs: 6.0,
            timeout_secs: 5,
            retry_delays_secs: vec![2, 4, 8],
        }
    }
}

impl PolicyConfig {
    /// No pacing and no retries, for tests and one-shot tools
    pub fn immediate() -> Self {
        Self {
            jitter_min_secs: 0.0,
            jitter_max_secs: 0.0,
            retry_delays_secs: Vec::new(),
            ..Self::default()
        }
    }

    /// Whether the jitter range is finite, ordered and within `MAX_JITTER_SECS`
    pub fn jitter_is_valid(&self) -> bool {
        let (lo, hi) = (self.jitter_min_secs, self.jitter_max_secs);
        lo.is_finite() && hi.is_finite() && 0.0 <= lo && lo <= hi && hi <= MAX_JITTER_SECS
    }

    /// Non-finite or out-of-range bounds are clamped into `0..=MAX_JITTER_SECS`
    fn draw_jitter(&self) -> Duration {
        let clamp = |secs: f64| {
            if secs.is_nan() {
                0.0
            } else {
                secs.clamp(0.0, MAX_JITTER_SECS)
            }
        };
        let (lo, hi) = (clamp(self.jitter_min_secs), clamp(self.jitter_max_secs));
        let secs = if hi > lo {
            rand::thread_rng().gen_range(lo..=hi)
        } else {
            lo
        };
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::ZERO)
    }
}

/// Where one call stands in its retry sequence
#[derive(Debug)]
enum FetchState {
    Attempting { attempt: usize },
    RetryWait { attempt: usize, delay: Duration },
    Success(HttpResponse),
    Failed(NetError),
}

struct RequestPermits {
    _domain: OwnedSemaphorePermit,
    _global: OwnedSemaphorePermit,
}

/// Shared rate limiter and retrier for one run
pub struct FetchPolicy {
    config: PolicyConfig,
    transport: SharedTransport,
    global: Arc<Semaphore>,
    domains: DashMap<String, Arc<Semaphore>>,
    last_request: Mutex<Option<Instant>>,
}

pub type SharedPolicy = Arc<FetchPolicy>;

impl std::fmt::Debug for FetchPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchPolicy")
            .field("config", &self.config)
            .field("domains", &self.domains.len())
            .finish()
    }
}

impl FetchPolicy {
    pub fn new(config: PolicyConfig, transport: SharedTransport) -> Self {
        let global = Arc::new(Semaphore::new(config.total_concurrency.max(1)));
        Self {
            config,
            transport,
            global,
            domains: DashMap::new(),
            last_request: Mutex::new(None),
        }
    }

    /// Policy over a real `reqwest` client
    pub fn with_client(config: PolicyConfig, net: &NetConfig) -> Result<Self, NetError> {
        let transport = ReqwestTransport::new(net)?;
        Ok(Self::new(config, Arc::new(transport)))
    }

    /// GET `url` under the policy; success means a 2xx response
    pub async fn fetch(&self, url: &str) -> Result<HttpResponse, NetError> {
        let host = Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.to_lowercase()))
            .ok_or_else(|| NetError::InvalidUrl(url.to_string()))?;

        let _permits = self.acquire_permits(&host).await?;
        self.pace().await;

        let mut state = FetchState::Attempting { attempt: 0 };
        loop {
            state = match state {
                FetchState::Attempting { attempt } => match self.attempt(url).await {
                    Ok(response) => FetchState::Success(response),
                    Err(err) if err.is_retryable() => {
                        match self.config.retry_delays_secs.get(attempt) {
                            Some(&secs) => {
                                warn!("{} (attempt {}), retrying in {}s", err, attempt + 1, secs);
                                FetchState::RetryWait {
                                    attempt: attempt + 1,
                                    delay: Duration::from_secs(secs),
                                }
                            }
                            None => FetchState::Failed(err),
                        }
                    }
                    Err(err) => FetchState::Failed(err),
                },
                FetchState::RetryWait { attempt, delay } => {
                    tokio::time::sleep(delay).await;
                    FetchState::Attempting { attempt }
                }
                FetchState::Success(response) => return Ok(response),
                FetchState::Failed(err) => {
                    warn!("Giving up on {}: {}", url, err);
                    return Err(err);
                }
            };
        }
    }

    async fn attempt(&self, url: &str) -> Result<HttpResponse, NetError> {
        let timeout = Duration::from_secs(self.config.timeout_secs);
        let response = tokio::time::timeout(timeout, self.transport.get(url, timeout))
            .await
            .map_err(|_| NetError::Timeout {
                url: url.to_string(),
                secs: self.config.timeout_secs,
            })??;

        if response.is_success() {
            Ok(response)
        } else {
            Err(NetError::Status {
                url: url.to_string(),
                status: response.status,
            })
        }
    }

    /// Domain gate first so a request queued behind its own host holds no global slot
    async fn acquire_permits(&self, host: &str) -> Result<RequestPermits, NetError> {
        let domain_sem = self
            .domains
            .entry(host.to_string())
            .or_insert_with(|| Arc::new(Semaphore::new(self.config.domain_concurrency.max(1))))
            .clone();
        let domain = domain_sem
            .acquire_owned()
            .await
            .map_err(|_| NetError::Closed)?;
        let global = self
            .global
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| NetError::Closed)?;
        Ok(RequestPermits {
            _domain: domain,
            _global: global,
        })
    }

    /// Wait until the drawn jitter has passed since the previous request start
    async fn pace(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(prev) = *last {
            let jitter = self.config.draw_jitter();
            let elapsed = prev.elapsed();
            if elapsed < jitter {
                let wait = jitter - elapsed;
                debug!("Pacing for {:.2}s", wait.as_secs_f64());
                tokio::time::sleep(wait).await;
            }
        }
        *last = Some(Instant::now());
    }
}

/// Log a one-line summary of the policy
pub fn describe(config: &PolicyConfig) {
    info!(
        "Fetch policy: {} per domain, {} total, jitter {:.1}-{:.1}s, timeout {}s, retries {:?}",
        config.domain_concurrency,
        config.total_concurrency,
        config.jitter_min_secs,
        config.jitter_max_secs,
        config.timeout_secs,
        config.retry_delays_secs
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ScriptedTransport, Transport};
    use async_trait::async_trait;
    use futures::future::join_all;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn no_jitter(retries: Vec<u64>) -> PolicyConfig {
        PolicyConfig {
            jitter_min_secs: 0.0,
            jitter_max_secs: 0.0,
            retry_delays_secs: retries,
            ..PolicyConfig::default()
        }
    }

    fn assert_elapsed(started: Instant, secs: u64) {
        let elapsed = started.elapsed();
        assert!(
            elapsed >= Duration::from_secs(secs) && elapsed < Duration::from_secs(secs + 1),
            "elapsed {elapsed:?}, expected about {secs}s"
        );
    }

    #[test]
    fn test_default_config() {
        let config = PolicyConfig::default();
        assert_eq!(config.domain_concurrency, 1);
        assert_eq!(config.total_concurrency, 3);
        assert_eq!(config.timeout_secs, 5);
        assert_eq!(config.retry_delays_secs, vec![2, 4, 8]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_transient_status_then_succeeds() {
        let url = "https://api.example.com/x";
        let transport = Arc::new(ScriptedTransport::new());
        transport
            .push(url, Ok(HttpResponse::with_status(503)))
            .push(url, Ok(HttpResponse::with_status(429)))
            .respond(url, "done");
        let policy = FetchPolicy::new(no_jitter(vec![2, 4, 8]), transport.clone());

        let started = Instant::now();
        let response = policy.fetch(url).await.unwrap();
        assert_eq!(response.body, "done");
        assert_eq!(transport.call_count(), 3);
        assert_elapsed(started, 6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_client_error_fails_immediately() {
        let url = "https://api.example.com/missing";
        let transport = Arc::new(ScriptedTransport::new());
        transport.push(url, Ok(HttpResponse::with_status(404)));
        let policy = FetchPolicy::new(no_jitter(vec![2, 4, 8]), transport.clone());

        let err = policy.fetch(url).await.unwrap_err();
        assert_eq!(err, NetError::Status { url: url.to_string(), status: 404 });
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ladder_exhausted_returns_last_error() {
        let url = "https://api.example.com/busy";
        let transport = Arc::new(ScriptedTransport::new());
        transport.push(url, Ok(HttpResponse::with_status(429)));
        let policy = FetchPolicy::new(no_jitter(vec![2, 4, 8]), transport.clone());

        let started = Instant::now();
        let err = policy.fetch(url).await.unwrap_err();
        assert!(matches!(err, NetError::Status { status: 429, .. }));
        assert_eq!(transport.call_count(), 4);
        assert_elapsed(started, 14);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_retried() {
        let url = "https://slow.example.com/";
        let transport = Arc::new(ScriptedTransport::new().with_latency(Duration::from_secs(30)));
        transport.respond(url, "late");
        let policy = FetchPolicy::new(no_jitter(vec![1]), transport.clone());

        let err = policy.fetch(url).await.unwrap_err();
        assert!(matches!(err, NetError::Timeout { secs: 5, .. }));
        assert_eq!(transport.call_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_connection_error_not_retried() {
        let url = "https://down.example.com/";
        let transport = Arc::new(ScriptedTransport::new());
        transport.push(
            url,
            Err(NetError::Transport {
                url: url.to_string(),
                reason: "connection refused".to_string(),
            }),
        );
        let policy = FetchPolicy::new(no_jitter(vec![2, 4, 8]), transport.clone());

        assert!(matches!(policy.fetch(url).await, Err(NetError::Transport { .. })));
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test]
    async fn test_invalid_url() {
        let policy = FetchPolicy::new(no_jitter(vec![]), Arc::new(ScriptedTransport::new()));
        assert!(matches!(policy.fetch("not a url").await, Err(NetError::InvalidUrl(_))));
    }

    /// Counts in-flight requests per host and overall
    #[derive(Default)]
    struct GaugeTransport {
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        per_host: parking_lot::Mutex<HashMap<String, (usize, usize)>>,
    }

    #[async_trait]
    impl Transport for GaugeTransport {
        async fn get(&self, url: &str, _timeout: Duration) -> Result<HttpResponse, NetError> {
            let host = Url::parse(url).unwrap().host_str().unwrap().to_string();
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            {
                let mut hosts = self.per_host.lock();
                let entry = hosts.entry(host.clone()).or_default();
                entry.0 += 1;
                entry.1 = entry.1.max(entry.0);
            }
            tokio::time::sleep(Duration::from_secs(1)).await;
            self.per_host.lock().get_mut(&host).unwrap().0 -= 1;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(HttpResponse::ok("ok"))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_domain_and_global_caps() {
        let transport = Arc::new(GaugeTransport::default());
        let policy = FetchPolicy::new(no_jitter(vec![]), transport.clone());

        let urls: Vec<String> = (0..5)
            .flat_map(|i| {
                ["a", "b", "c", "d", "e"]
                    .into_iter()
                    .map(move |host| format!("https://{host}.example.com/{i}"))
            })
            .collect();
        let results = join_all(urls.iter().map(|u| policy.fetch(u))).await;
        assert!(results.iter().all(|r| r.is_ok()));

        assert_eq!(transport.max_in_flight.load(Ordering::SeqCst), 3);
        for (_, (_, max)) in transport.per_host.lock().iter() {
            assert_eq!(*max, 1);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_pacing_spans_domains() {
        let transport = Arc::new(ScriptedTransport::new());
        transport
            .respond("https://one.example.com/", "1")
            .respond("https://two.example.com/", "2");
        let config = PolicyConfig {
            jitter_min_secs: 3.0,
            jitter_max_secs: 3.0,
            ..no_jitter(vec![])
        };
        let policy = FetchPolicy::new(config, transport.clone());

        let started = Instant::now();
        policy.fetch("https://one.example.com/").await.unwrap();
        assert_elapsed(started, 0);
        policy.fetch("https://two.example.com/").await.unwrap();
        assert_elapsed(started, 3);
    }

    #[test]
    fn test_jitter_draw_in_range() {
        let config = PolicyConfig::default();
        for _ in 0..100 {
            let j = config.draw_jitter().as_secs_f64();
            assert!((3.0..=6.0).contains(&j));
        }
        assert_eq!(PolicyConfig::immediate().draw_jitter(), Duration::ZERO);
    }

    #[test]
    fn test_unbounded_jitter_is_clamped() {
        let config = PolicyConfig {
            jitter_min_secs: 1e20,
            jitter_max_secs: f64::INFINITY,
            ..PolicyConfig::default()
        };
        assert!(!config.jitter_is_valid());
        assert_eq!(config.draw_jitter(), Duration::from_secs_f64(MAX_JITTER_SECS));

        let config = PolicyConfig {
            jitter_min_secs: f64::NAN,
            jitter_max_secs: f64::NAN,
            ..PolicyConfig::default()
        };
        assert_eq!(config.draw_jitter(), Duration::ZERO);
        assert!(PolicyConfig::default().jitter_is_valid());
    }

    #[tokio::test(start_paused = true)]
    async fn test_infinite_jitter_does_not_panic() {
        let url = "https://api.example.com/x";
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond(url, "ok");
        let config = PolicyConfig {
            jitter_min_secs: 0.0,
            jitter_max_secs: f64::INFINITY,
            ..no_jitter(vec![])
        };
        let policy = FetchPolicy::new(config, transport.clone());

        policy.fetch(url).await.unwrap();
        policy.fetch(url).await.unwrap();
        assert_eq!(transport.call_count(), 2);
    }
}
