//! Configurable knobs for the RPC client along with validation so callers
//! can reason about timeouts and response size limits.

use anyhow::{bail, Result};
use std::time::Duration;

/// Default cap on a single response body. A full block with transaction
/// objects fits comfortably; anything larger is treated as a misbehaving
/// endpoint.
pub const DEFAULT_MAX_RESPONSE_BODY_BYTES: usize = 1024 * 1024;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 5;

/// Smallest response cap that still fits a minimal reply envelope.
pub(crate) const MIN_RESPONSE_BODY_BYTES: usize = 256;

#[derive(Debug, Clone)]
pub struct RpcClientOptions {
    pub request_timeout: Duration,
    pub max_response_body_bytes: usize,
}

impl Default for RpcClientOptions {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            max_response_body_bytes: DEFAULT_MAX_RESPONSE_BODY_BYTES,
        }
    }
}

impl RpcClientOptions {
    pub(crate) fn validate(&self) -> Result<()> {
        if self.request_timeout.is_zero() {
            bail!("request_timeout must be greater than 0");
        }
        if self.max_response_body_bytes < MIN_RESPONSE_BODY_BYTES {
            bail!(
                "max_response_body_bytes ({}) must be at least {} bytes to fit a reply envelope",
                self.max_response_body_bytes,
                MIN_RESPONSE_BODY_BYTES,
            );
        }
        Ok(())
    }
}
