//! Request builders and typed result payloads for the two `eth_*` calls the
//! watcher makes. All numeric-looking fields stay opaque hex strings; nothing
//! here interprets them arithmetically.

use crate::rpc::envelope::JsonRpcRequest;
use serde::Deserialize;
use serde_json::json;

pub const METHOD_BLOCK_NUMBER: &str = "eth_blockNumber";
pub const METHOD_GET_BLOCK_BY_NUMBER: &str = "eth_getBlockByNumber";

const BLOCK_NUMBER_REQUEST_ID: u64 = 1;
const GET_BLOCK_REQUEST_ID: u64 = 2;

/// Request for the latest block number. The result is a hex string that is
/// threaded through untouched into [`block_by_number_request`].
pub fn block_number_request() -> JsonRpcRequest {
    JsonRpcRequest::new(METHOD_BLOCK_NUMBER, Vec::new(), BLOCK_NUMBER_REQUEST_ID)
}

/// Request for a block by its hex number. `full_transactions` asks the node
/// for complete transaction objects instead of bare hashes.
pub fn block_by_number_request(number_hex: &str, full_transactions: bool) -> JsonRpcRequest {
    JsonRpcRequest::new(
        METHOD_GET_BLOCK_BY_NUMBER,
        vec![json!(number_hex), json!(full_transactions)],
        GET_BLOCK_REQUEST_ID,
    )
}

/// A block as returned by `eth_getBlockByNumber`.
///
/// Fields the endpoint omits decode to empty strings so a partially-shaped
/// block still yields a usable value; fields it adds are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Block {
    pub number: String,
    pub hash: String,
    pub parent_hash: String,
    pub nonce: String,
    pub sha3_uncles: String,
    pub logs_bloom: String,
    pub transactions_root: String,
    pub state_root: String,
    pub miner: String,
    pub difficulty: String,
    pub total_difficulty: String,
    pub extra_data: String,
    pub size: String,
    pub gas_limit: String,
    pub gas_used: String,
    pub timestamp: String,
    pub transactions: Vec<TransactionItem>,
    pub uncles: Vec<String>,
}

/// One entry of a block's transaction list. Nodes return full objects or
/// bare hashes depending on the boolean flag sent with the request; both
/// forms decode, and order is preserved either way.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TransactionItem {
    Hash(String),
    Full(Box<Transaction>),
}

impl TransactionItem {
    pub fn hash(&self) -> &str {
        match self {
            TransactionItem::Hash(hash) => hash,
            TransactionItem::Full(tx) => &tx.hash,
        }
    }
}

/// A full transaction record. `to` is absent for contract creation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Transaction {
    pub block_hash: String,
    pub block_number: String,
    pub from: String,
    pub gas: String,
    pub gas_price: String,
    pub hash: String,
    pub input: String,
    pub nonce: String,
    pub to: Option<String>,
    pub transaction_index: String,
    pub value: String,
    pub v: String,
    pub r: String,
    pub s: String,
}
