use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, Result};
use blocktail::{init_tracing, Runner, WatcherConfig};

const ENV_RPC_URL: &str = "BLOCKTAIL_RPC_URL";
const ENV_TIMEOUT_SECS: &str = "BLOCKTAIL_TIMEOUT_SECS";
const ENV_POLL_INTERVAL_SECS: &str = "BLOCKTAIL_POLL_INTERVAL_SECS";
const ENV_MAX_RESPONSE_MB: &str = "BLOCKTAIL_MAX_RESPONSE_MB";
const ENV_METRICS_SECS: &str = "BLOCKTAIL_METRICS_SECS";

const BYTES_PER_MEGABYTE: usize = 1024 * 1024;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config = config_from_env()?;
    tracing::info!(
        endpoint = config.rpc_url(),
        timeout = ?config.request_timeout(),
        interval = ?config.poll_interval(),
        "starting block watcher"
    );

    let mut runner = Runner::new(&config)?;
    runner.run_until_ctrl_c().await
}

/// Builds the watcher configuration from `BLOCKTAIL_*` environment
/// variables, falling back to baked-in defaults for anything unset.
fn config_from_env() -> Result<WatcherConfig> {
    let mut builder = WatcherConfig::builder();

    if let Some(url) = env_string(ENV_RPC_URL) {
        builder = builder.rpc_url(url);
    }
    if let Some(secs) = env_parse::<u64>(ENV_TIMEOUT_SECS)? {
        builder = builder.request_timeout(Duration::from_secs(secs));
    }
    if let Some(secs) = env_parse::<u64>(ENV_POLL_INTERVAL_SECS)? {
        builder = builder.poll_interval(Duration::from_secs(secs));
    }
    if let Some(megabytes) = env_parse::<usize>(ENV_MAX_RESPONSE_MB)? {
        builder = builder.max_response_body_bytes(megabytes.saturating_mul(BYTES_PER_MEGABYTE));
    }
    if let Some(secs) = env_parse::<u64>(ENV_METRICS_SECS)? {
        builder = builder.metrics_interval(Duration::from_secs(secs));
    }

    builder.build()
}

fn env_string(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

fn env_parse<T>(name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env_string(name) {
        None => Ok(None),
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|err| anyhow!("invalid {name}={raw}: {err}")),
    }
}
