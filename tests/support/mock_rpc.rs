//! In-process stub of an EVM JSON-RPC endpoint. Serves `eth_blockNumber`
//! and `eth_getBlockByNumber` against scriptable state, records every call
//! it receives, and can be switched into failure modes (rpc errors,
//! malformed JSON, oversized chunked bodies, hanging) mid-test.

use std::convert::Infallible;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use anyhow::{Context, Result};
use hyper::body::Bytes;
use hyper::service::{make_service_fn, service_fn};
use hyper::{body, Body, Method, Request, Response, Server, StatusCode};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// How the endpoint answers the next requests.
#[derive(Clone, Debug)]
pub enum Behavior {
    /// Dispatch methods against the node state.
    Normal,
    /// Reject every call with a JSON-RPC error object.
    RpcError { code: i64, message: String },
    /// Answer with bytes that are not JSON.
    MalformedJson,
    /// Stream a chunked body of `total_bytes` (no Content-Length).
    OversizedChunked { total_bytes: usize },
    /// Never answer.
    Hang,
}

#[derive(Clone)]
pub struct MockNode {
    inner: Arc<RwLock<MockNodeState>>,
}

struct MockNodeState {
    latest_number: String,
    block: Value,
    behavior: Behavior,
    requests: Vec<Value>,
}

impl MockNode {
    pub fn new(latest_number: impl Into<String>, block: Value) -> Self {
        Self {
            inner: Arc::new(RwLock::new(MockNodeState {
                latest_number: latest_number.into(),
                block,
                behavior: Behavior::Normal,
                requests: Vec::new(),
            })),
        }
    }

    pub fn set_behavior(&self, behavior: Behavior) {
        self.inner.write().expect("mock node poisoned").behavior = behavior;
    }

    pub fn set_latest(&self, latest_number: impl Into<String>, block: Value) {
        let mut inner = self.inner.write().expect("mock node poisoned");
        inner.latest_number = latest_number.into();
        inner.block = block;
    }

    /// Every JSON-RPC call body received so far, in arrival order.
    pub fn requests(&self) -> Vec<Value> {
        self.inner
            .read()
            .expect("mock node poisoned")
            .requests
            .clone()
    }

    fn behavior(&self) -> Behavior {
        self.inner
            .read()
            .expect("mock node poisoned")
            .behavior
            .clone()
    }

    fn record_request(&self, call: &Value) {
        self.inner
            .write()
            .expect("mock node poisoned")
            .requests
            .push(call.clone());
    }

    fn latest_number(&self) -> String {
        self.inner
            .read()
            .expect("mock node poisoned")
            .latest_number
            .clone()
    }

    fn block_for(&self, number_hex: &str) -> Option<Value> {
        let inner = self.inner.read().expect("mock node poisoned");
        if inner.block.get("number").and_then(Value::as_str) == Some(number_hex) {
            Some(inner.block.clone())
        } else {
            None
        }
    }
}

/// Canonical full-block fixture: header fields, 64 transaction hashes, no
/// uncles.
pub fn block_fixture(number_hex: &str) -> Value {
    let transactions: Vec<String> = (0..64).map(|i| format!("0x{i:064x}")).collect();
    json!({
        "number": number_hex,
        "hash": "0xe1efb3e30a6cd2ff48b9f3c28a5b47a664d1a5a0b1b0c9d8e7f6a5b4c3d2e1f0",
        "parentHash": "0x1efb3e30a6cd2ff48b9f3c28a5b47a664d1a5a0b1b0c9d8e7f6a5b4c3d2e1f00",
        "nonce": "0x0000000000000000",
        "sha3Uncles": "0x1dcc4de8dec75d7aab85b567b6ccd41ad312451b948a7413f0a142fd40d49347",
        "logsBloom": "0x00",
        "transactionsRoot": "0x2a",
        "stateRoot": "0x2b",
        "miner": "0x0000000000000000000000000000000000000000",
        "difficulty": "0x7",
        "totalDifficulty": "0x1b50f9",
        "extraData": "0x",
        "size": "0x2c1",
        "gasLimit": "0x1c9c380",
        "gasUsed": "0x6b8f2",
        "timestamp": "0x64b8c7d3",
        "transactions": transactions,
        "uncles": [],
    })
}

pub struct MockRpcServer {
    url: String,
    shutdown: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl MockRpcServer {
    pub async fn start(node: MockNode) -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .context("failed to bind mock RPC listener")?;
        let addr = listener
            .local_addr()
            .context("failed to read mock listener address")?;
        let std_listener = listener
            .into_std()
            .context("failed to convert mock listener")?;
        std_listener
            .set_nonblocking(true)
            .context("failed to set mock listener non-blocking")?;

        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let make_service = make_service_fn(move |_| {
            let node = node.clone();
            async move { Ok::<_, Infallible>(service_fn(move |req| serve_request(node.clone(), req))) }
        });

        let server = Server::from_tcp(std_listener)
            .context("failed to build mock HTTP server")?
            .serve(make_service);
        let graceful = server.with_graceful_shutdown(async {
            let _ = shutdown_rx.await;
        });

        let handle = tokio::spawn(async move {
            if let Err(err) = graceful.await {
                eprintln!("mock RPC server stopped: {err}");
            }
        });

        Ok(Self {
            url: format!("http://{}", addr),
            shutdown: Some(shutdown_tx),
            handle: Some(handle),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

async fn serve_request(node: MockNode, req: Request<Body>) -> Result<Response<Body>, Infallible> {
    match node.behavior() {
        Behavior::Hang => {
            // The client is expected to give up long before this elapses;
            // dropping the connection cancels the wait.
            tokio::time::sleep(Duration::from_secs(60)).await;
            return Ok(Response::new(Body::empty()));
        }
        Behavior::MalformedJson => {
            return Ok(json_response(r#"{"jsonrpc": oops"#.to_owned()));
        }
        Behavior::OversizedChunked { total_bytes } => {
            return Ok(chunked_response(total_bytes));
        }
        Behavior::RpcError { .. } | Behavior::Normal => {}
    }

    if req.method() != Method::POST {
        let mut response = Response::new(Body::from("Unsupported method"));
        *response.status_mut() = StatusCode::METHOD_NOT_ALLOWED;
        return Ok(response);
    }

    let bytes = match body::to_bytes(req.into_body()).await {
        Ok(bytes) => bytes,
        Err(err) => {
            let mut response = Response::new(Body::from(format!("failed to read body: {err}")));
            *response.status_mut() = StatusCode::BAD_REQUEST;
            return Ok(response);
        }
    };

    let call: Value = match serde_json::from_slice(&bytes) {
        Ok(value) => value,
        Err(err) => {
            let mut response = Response::new(Body::from(format!("invalid JSON payload: {err}")));
            *response.status_mut() = StatusCode::BAD_REQUEST;
            return Ok(response);
        }
    };

    node.record_request(&call);
    let reply = match node.behavior() {
        Behavior::RpcError { code, message } => {
            error(call.get("id").cloned().unwrap_or(Value::Null), code, message)
        }
        _ => handle_call(&node, call),
    };

    Ok(json_response(reply.to_string()))
}

fn handle_call(node: &MockNode, call: Value) -> Value {
    let id = call.get("id").cloned().unwrap_or(Value::Null);
    let method = call
        .get("method")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let params = call
        .get("params")
        .cloned()
        .unwrap_or_else(|| Value::Array(Vec::new()));

    match method.as_str() {
        "eth_blockNumber" => success(id, Value::String(node.latest_number())),
        "eth_getBlockByNumber" => {
            let number = params
                .as_array()
                .and_then(|arr| arr.first())
                .and_then(Value::as_str);
            match number.and_then(|n| node.block_for(n)) {
                Some(block) => success(id, block),
                // Real nodes answer an unknown number with a null result.
                None => success(id, Value::Null),
            }
        }
        _ => error(
            id,
            -32601,
            format!("the method {method} does not exist/is not available"),
        ),
    }
}

fn json_response(body: String) -> Response<Body> {
    let mut response = Response::new(Body::from(body));
    response.headers_mut().insert(
        hyper::header::CONTENT_TYPE,
        hyper::header::HeaderValue::from_static("application/json"),
    );
    response
}

fn chunked_response(total_bytes: usize) -> Response<Body> {
    let (mut sender, body) = Body::channel();
    tokio::spawn(async move {
        let chunk = vec![b'a'; 64 * 1024];
        let mut sent = 0;
        while sent < total_bytes {
            let take = chunk.len().min(total_bytes - sent);
            if sender
                .send_data(Bytes::copy_from_slice(&chunk[..take]))
                .await
                .is_err()
            {
                // Receiver gave up; stop streaming.
                break;
            }
            sent += take;
        }
    });

    Response::new(body)
}

fn success(id: Value, result: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "result": result,
        "id": id,
    })
}

fn error(id: Value, code: i64, message: impl Into<String>) -> Value {
    json!({
        "jsonrpc": "2.0",
        "error": {
            "code": code,
            "message": message.into(),
        },
        "id": id,
    })
}
