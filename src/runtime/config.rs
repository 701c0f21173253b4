//! Runtime configuration for the block watcher.
//!
//! All instances are constructed via [`WatcherConfig::builder`] so invariants
//! are validated before any consumer observes the values. Every knob the
//! client and driver need is injected from here; nothing reads globals.

use crate::rpc::options::{DEFAULT_MAX_RESPONSE_BODY_BYTES, MIN_RESPONSE_BODY_BYTES};
use crate::runtime::telemetry;
use anyhow::{bail, Result};
use std::time::Duration;

/// Public endpoint polled when no override is supplied.
pub const DEFAULT_RPC_URL: &str = "https://polygon-rpc.com";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 5;
const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatcherConfig {
    rpc_url: String,
    request_timeout: Duration,
    poll_interval: Duration,
    max_response_body_bytes: usize,
    metrics_interval: Duration,
}

impl WatcherConfig {
    /// Returns a builder to incrementally construct and validate a
    /// configuration. Every field has a default, so `builder().build()`
    /// yields the stock production configuration.
    pub fn builder() -> WatcherConfigBuilder {
        WatcherConfigBuilder::default()
    }

    /// Full RPC URL (including scheme) the watcher polls.
    pub fn rpc_url(&self) -> &str {
        &self.rpc_url
    }

    /// Hard per-request timeout covering connection and body read.
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Fixed wait between polling cycles.
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Cap on a single response body.
    pub fn max_response_body_bytes(&self) -> usize {
        self.max_response_body_bytes
    }

    /// Interval used by the telemetry reporter.
    pub fn metrics_interval(&self) -> Duration {
        self.metrics_interval
    }

    /// Performs validation on an existing configuration instance.
    pub fn validate(&self) -> Result<()> {
        validate_url(&self.rpc_url)?;

        if self.request_timeout.is_zero() {
            bail!("request_timeout must be greater than 0");
        }

        if self.poll_interval.is_zero() {
            bail!("poll_interval must be greater than 0");
        }

        if self.metrics_interval.is_zero() {
            bail!("metrics_interval must be greater than 0");
        }

        if self.max_response_body_bytes < MIN_RESPONSE_BODY_BYTES {
            bail!(
                "max_response_body_bytes ({}) must be at least {} bytes to fit a reply \
                 envelope; increase BLOCKTAIL_MAX_RESPONSE_MB",
                self.max_response_body_bytes,
                MIN_RESPONSE_BODY_BYTES,
            );
        }

        Ok(())
    }
}

#[derive(Debug, Default, Clone)]
pub struct WatcherConfigBuilder {
    rpc_url: Option<String>,
    request_timeout: Option<Duration>,
    poll_interval: Option<Duration>,
    max_response_body_bytes: Option<usize>,
    metrics_interval: Option<Duration>,
}

impl WatcherConfigBuilder {
    pub fn rpc_url(mut self, url: impl Into<String>) -> Self {
        self.rpc_url = Some(url.into());
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = Some(interval);
        self
    }

    pub fn max_response_body_bytes(mut self, bytes: usize) -> Self {
        self.max_response_body_bytes = Some(bytes);
        self
    }

    pub fn metrics_interval(mut self, interval: Duration) -> Self {
        self.metrics_interval = Some(interval);
        self
    }

    pub fn build(self) -> Result<WatcherConfig> {
        let config = WatcherConfig {
            rpc_url: self
                .rpc_url
                .map(|url| url.trim().to_owned())
                .unwrap_or_else(|| DEFAULT_RPC_URL.to_owned()),
            request_timeout: self
                .request_timeout
                .unwrap_or_else(|| Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS)),
            poll_interval: self
                .poll_interval
                .unwrap_or_else(|| Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS)),
            max_response_body_bytes: self
                .max_response_body_bytes
                .unwrap_or(DEFAULT_MAX_RESPONSE_BODY_BYTES),
            metrics_interval: self
                .metrics_interval
                .unwrap_or(telemetry::DEFAULT_METRICS_INTERVAL),
        };

        config.validate()?;
        Ok(config)
    }
}

fn validate_url(url: &str) -> Result<()> {
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        bail!("rpc_url must start with http:// or https://");
    }
    Ok(())
}
