//! HTTP transport for JSON-RPC calls. Houses the `RpcClient`, which ships a
//! serialized request envelope to the configured endpoint and hands back raw
//! response bytes, and the `TransportError` type covering everything that can
//! go wrong before a reply is decodable.

use crate::rpc::envelope::JsonRpcRequest;
use crate::rpc::options::RpcClientOptions;
use crate::runtime::config::WatcherConfig;
use anyhow::{Context, Result};
use reqwest::header::CONTENT_TYPE;
use reqwest::Url;
use std::fmt;
use std::time::Duration;
use tokio::time::timeout;

/// Request-level failure: the call never produced a decodable reply.
///
/// HTTP status codes are deliberately not represented here. A JSON-RPC
/// endpoint may answer any status with a decodable body, so status judgment
/// is left to the envelope decode that follows.
#[derive(Debug)]
pub enum TransportError {
    Timeout {
        method: &'static str,
        limit: Duration,
    },
    BodyTooLarge {
        method: &'static str,
        limit_bytes: usize,
    },
    Http {
        method: &'static str,
        source: reqwest::Error,
    },
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Timeout { method, limit } => {
                write!(f, "{method} call timed out after {limit:?}")
            }
            TransportError::BodyTooLarge { method, limit_bytes } => {
                write!(
                    f,
                    "{method} response body exceeded the {limit_bytes} byte cap"
                )
            }
            TransportError::Http { method, source } => {
                write!(f, "{method} request failed: {source}")
            }
        }
    }
}

impl std::error::Error for TransportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TransportError::Http { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Thin client over a long-lived `reqwest` connection pool. Cloning is cheap
/// and clones share the pool, so one client can serve every polling cycle.
#[derive(Debug, Clone)]
pub struct RpcClient {
    endpoint: Url,
    http: reqwest::Client,
    options: RpcClientOptions,
}

impl RpcClient {
    pub fn new(endpoint: Url) -> Result<Self> {
        Self::with_options(endpoint, RpcClientOptions::default())
    }

    pub fn with_options(endpoint: Url, options: RpcClientOptions) -> Result<Self> {
        options.validate()?;

        let http = reqwest::Client::builder()
            .timeout(options.request_timeout)
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            endpoint,
            http,
            options,
        })
    }

    pub fn from_config(config: &WatcherConfig) -> Result<Self> {
        let endpoint = Url::parse(config.rpc_url())
            .with_context(|| format!("invalid rpc url {}", config.rpc_url()))?;
        let options = RpcClientOptions {
            request_timeout: config.request_timeout(),
            max_response_body_bytes: config.max_response_body_bytes(),
        };
        Self::with_options(endpoint, options)
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Sends one request and returns the raw response body on any HTTP
    /// status. The timeout bounds the whole exchange, connection included;
    /// on expiry the in-flight call is dropped. No retries happen here;
    /// whether to try again is the caller's policy.
    pub async fn send(&self, request: &JsonRpcRequest) -> Result<Vec<u8>, TransportError> {
        let method = request.method;
        let limit = self.options.request_timeout;

        timeout(limit, self.exchange(request))
            .await
            .map_err(|_| TransportError::Timeout { method, limit })?
    }

    async fn exchange(&self, request: &JsonRpcRequest) -> Result<Vec<u8>, TransportError> {
        let method = request.method;
        let response = self
            .http
            .post(self.endpoint.clone())
            .header(CONTENT_TYPE, "application/json")
            .json(request)
            .send()
            .await
            .map_err(|source| self.classify(method, source))?;

        let cap = self.options.max_response_body_bytes;
        if let Some(declared) = response.content_length() {
            if declared > cap as u64 {
                return Err(TransportError::BodyTooLarge {
                    method,
                    limit_bytes: cap,
                });
            }
        }

        // Chunked replies carry no Content-Length, so the cap is also
        // enforced while reading; an oversized body is abandoned mid-stream
        // rather than buffered whole.
        let mut response = response;
        let mut body = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|source| self.classify(method, source))?
        {
            if body.len() + chunk.len() > cap {
                return Err(TransportError::BodyTooLarge {
                    method,
                    limit_bytes: cap,
                });
            }
            body.extend_from_slice(&chunk);
        }

        Ok(body)
    }

    fn classify(&self, method: &'static str, source: reqwest::Error) -> TransportError {
        if source.is_timeout() {
            TransportError::Timeout {
                method,
                limit: self.options.request_timeout,
            }
        } else {
            TransportError::Http { method, source }
        }
    }
}
