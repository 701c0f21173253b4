pub mod poller;
pub mod rpc;
pub mod runtime;

pub use poller::{BlockPoller, CycleSummary, PollError, PollStage};
pub use rpc::client::{RpcClient, TransportError};
pub use rpc::envelope::{
    decode_reply, DecodeError, JsonRpcRequest, JsonRpcResponse, RpcErrorObject, RpcReply,
};
pub use rpc::options::RpcClientOptions;
pub use rpc::payload::{Block, Transaction, TransactionItem};
pub use runtime::config::{WatcherConfig, WatcherConfigBuilder};
pub use runtime::runner::Runner;
pub use runtime::telemetry::{init_tracing, Telemetry, TelemetrySnapshot};
