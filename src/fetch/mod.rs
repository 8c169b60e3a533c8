//! HTTP fetcher
//!
//! Issues polite HTTP requests for the worker pool:
//! - a randomized delay before every attempt (politeness jitter)
//! - a browser-identity header rotated per request
//! - bounded retries with exponential backoff on transient failures
//! - an append-only audit log of every attempt
//!
//! The audit log is pure observability; nothing reads it for control flow.

use crate::config::CrawlerConfig;
use chrono::{DateTime, Utc};
use rand::Rng;
use reqwest::header::USER_AGENT;
use reqwest::Client;
use serde::Serialize;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Browser identities rotated across requests
///
/// Rotation happens per request, not per worker, so a single worker does not
/// present one stable fingerprint across a run.
const IDENTITY_POOL: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.1 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36 Edg/120.0.0.0",
];

/// Fetch failure classification
#[derive(Debug, Error)]
pub enum FetchError {
    /// Timeout, connection trouble, or 5xx; retried up to the ceiling
    #[error("transient failure for {url} after {attempts} attempts: {reason}")]
    Transient {
        url: String,
        attempts: u32,
        reason: String,
    },

    /// 4xx client error; never retried
    #[error("permanent failure for {url}: HTTP {status}")]
    Permanent { url: String, status: u16 },
}

/// Outcome of a single fetch attempt, as recorded in the audit log
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum AttemptOutcome {
    Success { status: u16 },
    HttpError { status: u16 },
    NetworkError { message: String },
}

/// One audit-log entry per fetch attempt, success or failure
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchAttempt {
    pub address: String,
    pub attempt: u32,
    pub outcome: AttemptOutcome,
    pub timestamp: DateTime<Utc>,
}

/// Append-only log of every fetch attempt made during a run
#[derive(Debug, Default)]
pub struct AuditLog {
    entries: Mutex<Vec<FetchAttempt>>,
}

impl AuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, address: &Url, attempt: u32, outcome: AttemptOutcome) {
        let entry = FetchAttempt {
            address: address.to_string(),
            attempt,
            outcome,
            timestamp: Utc::now(),
        };
        self.entries.lock().unwrap().push(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of all entries recorded so far
    pub fn snapshot(&self) -> Vec<FetchAttempt> {
        self.entries.lock().unwrap().clone()
    }
}

/// Builds the HTTP client shared by the fetcher and the policy gate
///
/// No default user agent is set; the fetcher attaches a rotated identity
/// header to each request.
pub fn build_http_client(timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Backoff delay before retry number `attempt` (1-based attempt that failed)
pub(crate) fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base * 2u32.saturating_pow(attempt.saturating_sub(1))
}

/// Polite HTTP fetcher with retry and identity rotation
pub struct Fetcher {
    client: Client,
    delay_range: (f64, f64),
    retry_ceiling: u32,
    retry_base: Duration,
    audit: Arc<AuditLog>,
}

impl Fetcher {
    pub fn new(client: Client, config: &CrawlerConfig, audit: Arc<AuditLog>) -> Self {
        Self {
            client,
            delay_range: (config.delay_min_secs, config.delay_max_secs),
            retry_ceiling: config.retry_ceiling,
            retry_base: config.retry_base(),
            audit,
        }
    }

    /// Fetches an address and returns its body
    ///
    /// Each attempt pays the politeness delay; retries additionally pay the
    /// exponential backoff, so the two are additive. Transient failures
    /// (timeout, connection errors, 5xx) are retried up to the configured
    /// ceiling; 4xx responses fail immediately.
    pub async fn fetch(&self, address: &Url) -> Result<String, FetchError> {
        let mut last_reason = String::new();

        for attempt in 1..=self.retry_ceiling {
            self.politeness_delay().await;

            let identity = pick_identity();
            tracing::debug!("GET {} (attempt {})", address, attempt);

            match self
                .client
                .get(address.clone())
                .header(USER_AGENT, identity)
                .send()
                .await
            {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        match response.text().await {
                            Ok(body) => {
                                self.audit.record(
                                    address,
                                    attempt,
                                    AttemptOutcome::Success {
                                        status: status.as_u16(),
                                    },
                                );
                                return Ok(body);
                            }
                            Err(e) => {
                                last_reason = format!("body read failed: {}", e);
                                self.audit.record(
                                    address,
                                    attempt,
                                    AttemptOutcome::NetworkError {
                                        message: last_reason.clone(),
                                    },
                                );
                            }
                        }
                    } else if status.is_client_error() {
                        self.audit.record(
                            address,
                            attempt,
                            AttemptOutcome::HttpError {
                                status: status.as_u16(),
                            },
                        );
                        return Err(FetchError::Permanent {
                            url: address.to_string(),
                            status: status.as_u16(),
                        });
                    } else {
                        // 5xx and anything else unexpected is worth retrying
                        last_reason = format!("HTTP {}", status.as_u16());
                        self.audit.record(
                            address,
                            attempt,
                            AttemptOutcome::HttpError {
                                status: status.as_u16(),
                            },
                        );
                    }
                }
                Err(e) => {
                    last_reason = if e.is_timeout() {
                        "request timeout".to_string()
                    } else if e.is_connect() {
                        format!("connection failed: {}", e)
                    } else {
                        e.to_string()
                    };
                    self.audit.record(
                        address,
                        attempt,
                        AttemptOutcome::NetworkError {
                            message: last_reason.clone(),
                        },
                    );
                }
            }

            if attempt < self.retry_ceiling {
                let backoff = backoff_delay(self.retry_base, attempt);
                tracing::debug!("retrying {} in {:?}", address, backoff);
                tokio::time::sleep(backoff).await;
            }
        }

        Err(FetchError::Transient {
            url: address.to_string(),
            attempts: self.retry_ceiling,
            reason: last_reason,
        })
    }

    async fn politeness_delay(&self) {
        let (min, max) = self.delay_range;
        if max <= 0.0 {
            return;
        }
        let secs = {
            let mut rng = rand::thread_rng();
            rng.gen_range(min..=max)
        };
        tokio::time::sleep(Duration::from_secs_f64(secs)).await;
    }
}

fn pick_identity() -> &'static str {
    let index = {
        let mut rng = rand::thread_rng();
        rng.gen_range(0..IDENTITY_POOL.len())
    };
    IDENTITY_POOL[index]
}
