use anyhow::anyhow;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "info";

/// Installs a global `tracing` subscriber. `filter` takes an `EnvFilter`
/// directive (`"debug"`, `"hubstorage=trace"`, ...); `RUST_LOG` wins when
/// set. Intended for test binaries; a library consumer brings their own
/// subscriber.
pub fn init(filter: Option<&str>) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(filter.unwrap_or(DEFAULT_LOG_FILTER)))
        .map_err(|err| anyhow!("invalid log filter: {err}"))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .map_err(|err| anyhow!("initialize logging subscriber: {err}"))?;
    Ok(())
}
