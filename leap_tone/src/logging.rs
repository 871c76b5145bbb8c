//! `tracing` setup: one fmt layer on stderr, filtered by `RUST_LOG` or the
//! configured level.

use anyhow::{Context, Result};
use tracing_subscriber::{
    filter::{EnvFilter, LevelFilter},
    fmt,
    layer::SubscriberExt,
    util::SubscriberInitExt,
    Layer,
};

use crate::config::LogConfig;

/// Parse a level name; unknown names fall back to `info`.
pub fn parse_level(level: &str) -> LevelFilter {
    level.parse().unwrap_or(LevelFilter::INFO)
}

/// Install the global subscriber.  Call once, before the window opens.
pub fn init(config: &LogConfig) -> Result<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(parse_level(&config.level).into())
        .from_env_lossy();

    let console = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(filter);

    tracing_subscriber::registry()
        .with(console)
        .try_init()
        .context("failed to install log subscriber")?;

    tracing::info!(level = %config.level, "logging initialized");
    Ok(())
}
