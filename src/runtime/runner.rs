use crate::poller::BlockPoller;
use crate::runtime::config::WatcherConfig;
use crate::runtime::telemetry::{spawn_metrics_reporter, Telemetry};
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Coordinates the watcher lifecycle and handles OS signals for graceful
/// shutdowns.
pub struct Runner {
    poller: Arc<BlockPoller>,
    telemetry: Arc<Telemetry>,
    metrics_interval: Duration,
    shutdown: CancellationToken,
    poll_handle: Option<JoinHandle<()>>,
    metrics_handle: Option<JoinHandle<()>>,
}

impl Runner {
    /// Builds the client, poller, and telemetry from `config` and wires a
    /// root [`CancellationToken`] that propagates through both background
    /// tasks.
    pub fn new(config: &WatcherConfig) -> Result<Self> {
        let telemetry = Arc::new(Telemetry::default());
        let poller = Arc::new(BlockPoller::from_config(config, telemetry.clone())?);

        Ok(Self {
            poller,
            telemetry,
            metrics_interval: config.metrics_interval(),
            shutdown: CancellationToken::new(),
            poll_handle: None,
            metrics_handle: None,
        })
    }

    /// Returns a clone of the root shutdown token so external callers can
    /// integrate with their own signal handlers or cancellation strategies.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub fn telemetry(&self) -> Arc<Telemetry> {
        self.telemetry.clone()
    }

    /// Starts the polling loop and the metrics reporter.
    pub fn start(&mut self) {
        if self.poll_handle.is_some() {
            return;
        }

        let poller = self.poller.clone();
        let token = self.shutdown.clone();
        self.poll_handle = Some(tokio::spawn(async move {
            poller.run(token).await;
        }));
        self.metrics_handle = Some(spawn_metrics_reporter(
            self.telemetry.clone(),
            self.shutdown.clone(),
            self.metrics_interval,
        ));
    }

    /// Stops both tasks by cancelling the root token and waiting for them to
    /// drain. The runner can be started again afterwards.
    pub async fn stop(&mut self) -> Result<()> {
        if self.poll_handle.is_none() {
            return Ok(());
        }

        self.shutdown.cancel();
        if let Some(handle) = self.poll_handle.take() {
            handle.await?;
        }
        if let Some(handle) = self.metrics_handle.take() {
            handle.await?;
        }
        self.shutdown = CancellationToken::new();
        Ok(())
    }

    /// Runs until a Ctrl-C (SIGINT) is received or the shutdown token is
    /// cancelled elsewhere.
    pub async fn run_until_ctrl_c(&mut self) -> Result<()> {
        self.start();
        tracing::info!("watcher started; waiting for Ctrl-C (SIGINT) to initiate shutdown");

        tokio::select! {
            _ = signal::ctrl_c() => {
                tracing::info!("Ctrl-C received; shutting down watcher");
            }
            _ = self.shutdown.cancelled() => {
                tracing::info!("watcher shutdown token cancelled");
            }
        }

        self.stop().await
    }
}
