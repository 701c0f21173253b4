//! JSON-RPC 2.0 request/response envelope and the decode path that turns raw
//! response bytes into a typed outcome.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Protocol version string carried by every request and reply.
pub const JSONRPC_VERSION: &str = "2.0";

/// A single JSON-RPC call. Built fresh for each request with a literal id;
/// ids are request labels within one cycle, not process-unique counters.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: &'static str,
    pub method: &'static str,
    pub params: Vec<Value>,
    pub id: u64,
}

impl JsonRpcRequest {
    pub fn new(method: &'static str, params: Vec<Value>, id: u64) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            method,
            params,
            id,
        }
    }
}

/// The wire shape of a reply. A well-formed reply carries exactly one of
/// `result` and `error`; [`decode_reply`] enforces that and resolves the
/// ambiguous cases.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcResponse<T> {
    #[serde(default)]
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub result: Option<T>,
    #[serde(default)]
    pub error: Option<RpcErrorObject>,
}

/// The `error` member of a reply: the endpoint accepted the HTTP exchange but
/// rejected the call itself.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RpcErrorObject {
    pub code: i64,
    pub message: String,
}

impl fmt::Display for RpcErrorObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "code {}: {}", self.code, self.message)
    }
}

/// Application-level outcome of a successfully decoded reply.
#[derive(Debug)]
pub enum RpcReply<T> {
    Result(T),
    Error(RpcErrorObject),
}

/// Decode failure, distinct from transport failures and from replies that
/// carry an `error` object.
#[derive(Debug)]
pub enum DecodeError {
    MalformedJson {
        method: &'static str,
        source: serde_json::Error,
    },
    ShapeMismatch {
        method: &'static str,
        detail: String,
    },
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::MalformedJson { method, source } => {
                write!(f, "{method} response is not valid JSON: {source}")
            }
            DecodeError::ShapeMismatch { method, detail } => {
                write!(f, "{method} response did not match the expected shape: {detail}")
            }
        }
    }
}

impl std::error::Error for DecodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DecodeError::MalformedJson { source, .. } => Some(source),
            DecodeError::ShapeMismatch { .. } => None,
        }
    }
}

/// Decodes raw response bytes for `method` into a three-way outcome.
///
/// Syntax failures and shape failures stay distinguishable: bytes that are
/// not JSON at all yield [`DecodeError::MalformedJson`], while parseable JSON
/// that does not project into the expected reply yields
/// [`DecodeError::ShapeMismatch`]. An embedded `error` object is an
/// application-level outcome ([`RpcReply::Error`]) and takes precedence over
/// `result` when a misbehaving server sends both. Unknown fields are ignored
/// so the endpoint may grow its schema without breaking the decode.
pub fn decode_reply<T>(method: &'static str, bytes: &[u8]) -> Result<RpcReply<T>, DecodeError>
where
    T: DeserializeOwned,
{
    let raw: Value = serde_json::from_slice(bytes)
        .map_err(|source| DecodeError::MalformedJson { method, source })?;

    let envelope: JsonRpcResponse<Value> =
        serde_json::from_value(raw).map_err(|err| DecodeError::ShapeMismatch {
            method,
            detail: err.to_string(),
        })?;

    if let Some(error) = envelope.error {
        return Ok(RpcReply::Error(error));
    }

    match envelope.result {
        Some(value) if !value.is_null() => serde_json::from_value(value)
            .map(RpcReply::Result)
            .map_err(|err| DecodeError::ShapeMismatch {
                method,
                detail: err.to_string(),
            }),
        Some(_) => Err(DecodeError::ShapeMismatch {
            method,
            detail: "result was null".to_owned(),
        }),
        None => Err(DecodeError::ShapeMismatch {
            method,
            detail: "reply carried neither result nor error".to_owned(),
        }),
    }
}
