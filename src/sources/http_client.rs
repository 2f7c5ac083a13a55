//! Shared HTTP client with rate limiting and a circuit breaker

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::Client;
use serde::de::DeserializeOwned;
use tokio::sync::{Mutex, Semaphore};
use tokio::time::sleep;

use crate::config::{CircuitBreakerConfig, HttpConfig};
use crate::error::LocusError;
use crate::Result;

/// Circuit breaker state
#[derive(Debug, Clone, PartialEq)]
pub enum CircuitState {
    Closed,
    Open { opened_at: Instant },
    HalfOpen,
}

/// HTTP client shared by the UCSC, NCBI and scoring clients.
///
/// One instance guards one upstream host: the breaker opens after
/// `failure_threshold` consecutive failures and fails calls fast until
/// `recovery_timeout_seconds` have passed.
#[derive(Debug)]
pub struct ResilientClient {
    client: Client,
    rate_limiter: Arc<Semaphore>,
    rate_limit_delay: Option<Duration>,
    last_request_time: Arc<Mutex<Option<Instant>>>,
    circuit_state: Arc<Mutex<CircuitState>>,
    circuit_config: CircuitBreakerConfig,
    failure_count: Arc<AtomicU32>,
    /// Successes seen while half-open
    success_count: Arc<AtomicU32>,
    request_count: Arc<AtomicU64>,
}

impl ResilientClient {
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .gzip(true)
            .deflate(true)
            .user_agent(concat!("ferro-locus/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| LocusError::Config {
                msg: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            rate_limiter: Arc::new(Semaphore::new(1)),
            rate_limit_delay: config.rate_limit_ms.map(Duration::from_millis),
            last_request_time: Arc::new(Mutex::new(None)),
            circuit_state: Arc::new(Mutex::new(CircuitState::Closed)),
            circuit_config: config.circuit_breaker.clone(),
            failure_count: Arc::new(AtomicU32::new(0)),
            success_count: Arc::new(AtomicU32::new(0)),
            request_count: Arc::new(AtomicU64::new(0)),
        })
    }

    /// GET `url` with query parameters and decode the JSON body.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        service: &str,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let response = self
            .execute(service, false, || self.client.get(url).query(query))
            .await?;
        decode_body(service, response).await
    }

    /// GET like [`get_json`](Self::get_json), but a 4xx reply whose body
    /// still decodes as `T` is returned as data.
    ///
    /// Used for services that report data problems in an error body.
    pub async fn get_json_lenient<T: DeserializeOwned>(
        &self,
        service: &str,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let response = self
            .execute(service, true, || self.client.get(url).query(query))
            .await?;
        let status = response.status();
        if status.is_success() {
            return decode_body(service, response).await;
        }
        let body = response
            .bytes()
            .await
            .map_err(|e| LocusError::upstream(service, e))?;
        serde_json::from_slice(&body).map_err(|_| {
            LocusError::upstream(
                service,
                error_detail(&String::from_utf8_lossy(&body))
                    .unwrap_or_else(|| format!("HTTP {}", status)),
            )
        })
    }

    /// POST to `url` with query parameters and an empty body, decoding JSON.
    pub async fn post_json<T: DeserializeOwned>(
        &self,
        service: &str,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let response = self
            .execute(service, false, || self.client.post(url).query(query))
            .await?;
        decode_body(service, response).await
    }

    /// Send a request behind the breaker and rate limiter.
    ///
    /// With `pass_client_errors`, 4xx responses are handed back to the
    /// caller and do not count against the breaker.
    async fn execute<F>(
        &self,
        service: &str,
        pass_client_errors: bool,
        request_builder: F,
    ) -> Result<reqwest::Response>
    where
        F: FnOnce() -> reqwest::RequestBuilder,
    {
        self.check_circuit_breaker(service).await?;

        let _permit = self
            .rate_limiter
            .acquire()
            .await
            .map_err(|e| LocusError::upstream(service, format!("rate limiter closed: {}", e)))?;

        if let Some(delay) = self.rate_limit_delay {
            let mut last_time = self.last_request_time.lock().await;
            if let Some(last) = *last_time {
                let elapsed = last.elapsed();
                if elapsed < delay {
                    sleep(delay - elapsed).await;
                }
            }
            *last_time = Some(Instant::now());
        }

        self.request_count.fetch_add(1, Ordering::Relaxed);
        let result = request_builder().send().await;

        match result {
            Ok(response) if response.status().is_success() => {
                self.record_success().await;
                Ok(response)
            }
            Ok(response) if pass_client_errors && response.status().is_client_error() => {
                self.record_success().await;
                Ok(response)
            }
            Ok(response) => {
                self.record_failure().await;
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                tracing::warn!("{} returned {}: {}", service, status, body);
                Err(LocusError::upstream(
                    service,
                    error_detail(&body).unwrap_or_else(|| format!("HTTP {}", status)),
                ))
            }
            Err(e) => {
                self.record_failure().await;
                Err(LocusError::upstream(service, e))
            }
        }
    }

    async fn check_circuit_breaker(&self, service: &str) -> Result<()> {
        let mut state = self.circuit_state.lock().await;

        match *state {
            CircuitState::Closed | CircuitState::HalfOpen => Ok(()),
            CircuitState::Open { opened_at } => {
                let recovery_timeout =
                    Duration::from_secs(self.circuit_config.recovery_timeout_seconds);
                if opened_at.elapsed() >= recovery_timeout {
                    *state = CircuitState::HalfOpen;
                    self.success_count.store(0, Ordering::Relaxed);
                    tracing::info!("{} circuit breaker half-open", service);
                    Ok(())
                } else {
                    Err(LocusError::upstream(service, "circuit breaker open"))
                }
            }
        }
    }

    async fn record_success(&self) {
        let mut state = self.circuit_state.lock().await;

        match *state {
            CircuitState::Closed => {
                self.failure_count.store(0, Ordering::Relaxed);
            }
            CircuitState::HalfOpen => {
                let success_count = self.success_count.fetch_add(1, Ordering::Relaxed) + 1;
                if success_count >= self.circuit_config.success_threshold {
                    *state = CircuitState::Closed;
                    self.failure_count.store(0, Ordering::Relaxed);
                    self.success_count.store(0, Ordering::Relaxed);
                    tracing::info!(
                        "Circuit breaker closed after {} successful requests",
                        success_count
                    );
                }
            }
            CircuitState::Open { .. } => {
                *state = CircuitState::Closed;
                self.failure_count.store(0, Ordering::Relaxed);
            }
        }
    }

    async fn record_failure(&self) {
        let failure_count = self.failure_count.fetch_add(1, Ordering::Relaxed) + 1;
        let mut state = self.circuit_state.lock().await;
        let reopen = match *state {
            CircuitState::HalfOpen => true,
            CircuitState::Closed => failure_count >= self.circuit_config.failure_threshold,
            CircuitState::Open { .. } => false,
        };
        if reopen {
            *state = CircuitState::Open {
                opened_at: Instant::now(),
            };
            tracing::warn!("Circuit breaker opened after {} failures", failure_count);
        }
    }

    pub async fn circuit_state(&self) -> CircuitState {
        self.circuit_state.lock().await.clone()
    }

    pub fn total_requests(&self) -> u64 {
        self.request_count.load(Ordering::Relaxed)
    }
}

async fn decode_body<T: DeserializeOwned>(service: &str, response: reqwest::Response) -> Result<T> {
    let bytes = response
        .bytes()
        .await
        .map_err(|e| LocusError::upstream(service, e))?;
    serde_json::from_slice(&bytes).map_err(|e| LocusError::decode(service, e))
}

/// Pull a readable message out of an error body (`{"detail": ...}` or
/// `{"error": ...}`), falling back to short plain text.
fn error_detail(body: &str) -> Option<String> {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["detail", "error", "message"] {
            if let Some(msg) = value.get(key).and_then(|v| v.as_str()) {
                return Some(msg.to_string());
            }
        }
    }
    let trimmed = body.trim();
    (!trimmed.is_empty() && trimmed.len() <= 200).then(|| trimmed.to_string())
}
