//! JSON-RPC plumbing: the request/response envelope, the HTTP transport,
//! typed payloads for the two `eth_*` calls, and client options.

pub mod client;
pub mod envelope;
pub mod options;
pub mod payload;

pub use client::{RpcClient, TransportError};
pub use envelope::{
    decode_reply, DecodeError, JsonRpcRequest, JsonRpcResponse, RpcErrorObject, RpcReply,
};
pub use options::RpcClientOptions;
pub use payload::{Block, Transaction, TransactionItem};
