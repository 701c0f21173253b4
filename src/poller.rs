//! The polling driver: one bounded request/decode cycle per tick, forever.
//!
//! Each cycle asks the endpoint for its latest block number, then fetches
//! that block with full transaction bodies. Failures are classified by kind
//! and by the stage they occurred in, then logged and forgotten: one bad
//! cycle never stops the loop, and no backoff or retry happens beyond
//! waiting for the next tick.

use crate::rpc::client::{RpcClient, TransportError};
use crate::rpc::envelope::{decode_reply, DecodeError, RpcErrorObject, RpcReply};
use crate::rpc::payload::{self, Block};
use crate::runtime::config::WatcherConfig;
use crate::runtime::telemetry::Telemetry;
use anyhow::Result;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Which half of a polling cycle an error occurred in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollStage {
    BlockNumber,
    BlockByNumber,
}

impl fmt::Display for PollStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PollStage::BlockNumber => f.write_str("block-number"),
            PollStage::BlockByNumber => f.write_str("block-by-number"),
        }
    }
}

/// Why a cycle was skipped. The three kinds stay distinguishable all the way
/// into logs and telemetry: transport failures never reached a reply, decode
/// failures got undecodable bytes back, and rpc errors are the endpoint
/// explicitly rejecting the call.
#[derive(Debug)]
pub enum PollError {
    Transport {
        stage: PollStage,
        source: TransportError,
    },
    Decode {
        stage: PollStage,
        source: DecodeError,
    },
    Rpc {
        stage: PollStage,
        error: RpcErrorObject,
    },
}

impl PollError {
    pub fn stage(&self) -> PollStage {
        match self {
            PollError::Transport { stage, .. }
            | PollError::Decode { stage, .. }
            | PollError::Rpc { stage, .. } => *stage,
        }
    }
}

impl fmt::Display for PollError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PollError::Transport { stage, source } => {
                write!(f, "transport failure at {stage} stage: {source}")
            }
            PollError::Decode { stage, source } => {
                write!(f, "undecodable reply at {stage} stage: {source}")
            }
            PollError::Rpc { stage, error } => {
                write!(f, "endpoint rejected {stage} call: {error}")
            }
        }
    }
}

impl std::error::Error for PollError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PollError::Transport { source, .. } => Some(source),
            PollError::Decode { source, .. } => Some(source),
            PollError::Rpc { .. } => None,
        }
    }
}

/// What a successful cycle observed. The number comes from the first call
/// and the block from the second; the two are not atomic, so they may
/// disagree when a block lands in between. Both are reported as returned.
#[derive(Debug, Clone)]
pub struct CycleSummary {
    pub block_number: String,
    pub block_hash: String,
    pub transaction_count: usize,
    pub uncle_count: usize,
}

/// Drives the fetch/decode cycle against one endpoint.
pub struct BlockPoller {
    client: RpcClient,
    poll_interval: Duration,
    telemetry: Arc<Telemetry>,
}

impl BlockPoller {
    pub fn new(client: RpcClient, poll_interval: Duration, telemetry: Arc<Telemetry>) -> Self {
        Self {
            client,
            poll_interval,
            telemetry,
        }
    }

    pub fn from_config(config: &WatcherConfig, telemetry: Arc<Telemetry>) -> Result<Self> {
        let client = RpcClient::from_config(config)?;
        Ok(Self::new(client, config.poll_interval(), telemetry))
    }

    pub fn telemetry(&self) -> &Arc<Telemetry> {
        &self.telemetry
    }

    /// Runs exactly one cycle, without sleeping. Tests drive this directly
    /// for a bounded, deterministic number of cycles.
    pub async fn poll_once(&self) -> Result<CycleSummary, PollError> {
        let number = self.fetch_block_number().await?;
        let block = self.fetch_block(&number).await?;

        Ok(CycleSummary {
            block_number: number,
            block_hash: block.hash,
            transaction_count: block.transactions.len(),
            uncle_count: block.uncles.len(),
        })
    }

    async fn fetch_block_number(&self) -> Result<String, PollError> {
        let stage = PollStage::BlockNumber;
        let request = payload::block_number_request();
        let bytes = self
            .client
            .send(&request)
            .await
            .map_err(|source| PollError::Transport { stage, source })?;

        match decode_reply::<String>(request.method, &bytes) {
            Ok(RpcReply::Result(number)) => Ok(number),
            Ok(RpcReply::Error(error)) => Err(PollError::Rpc { stage, error }),
            Err(source) => Err(PollError::Decode { stage, source }),
        }
    }

    async fn fetch_block(&self, number_hex: &str) -> Result<Block, PollError> {
        let stage = PollStage::BlockByNumber;
        let request = payload::block_by_number_request(number_hex, true);
        let bytes = self
            .client
            .send(&request)
            .await
            .map_err(|source| PollError::Transport { stage, source })?;

        match decode_reply::<Block>(request.method, &bytes) {
            Ok(RpcReply::Result(block)) => Ok(block),
            Ok(RpcReply::Error(error)) => Err(PollError::Rpc { stage, error }),
            Err(source) => Err(PollError::Decode { stage, source }),
        }
    }

    /// Polls until the token is cancelled. Every cycle outcome is logged;
    /// errors are recorded and swallowed so the loop always reaches the next
    /// tick. A slow cycle skips missed ticks instead of bursting to catch
    /// up.
    pub async fn run(&self, shutdown: CancellationToken) {
        let mut ticker = interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    break;
                }
                _ = ticker.tick() => {
                    match self.poll_once().await {
                        Ok(summary) => {
                            self.telemetry.record_block_observed();
                            tracing::info!(
                                number = %summary.block_number,
                                hash = %summary.block_hash,
                                transactions = summary.transaction_count,
                                uncles = summary.uncle_count,
                                "observed latest block"
                            );
                        }
                        Err(err) => {
                            self.record(&err);
                            tracing::warn!(
                                stage = %err.stage(),
                                error = %err,
                                "polling cycle failed; retrying next tick"
                            );
                        }
                    }
                }
            }
        }

        tracing::info!("block poller stopped");
    }

    fn record(&self, err: &PollError) {
        match err {
            PollError::Transport {
                source: TransportError::Timeout { .. },
                ..
            } => self.telemetry.record_timeout(),
            PollError::Transport { .. } => self.telemetry.record_transport_error(),
            PollError::Decode { .. } => self.telemetry.record_decode_error(),
            PollError::Rpc { .. } => self.telemetry.record_rpc_error(),
        }
    }
}
