//! Logging setup using `tracing-subscriber`.
//!
//! The engine logs through the `log` facade; the subscriber's `tracing-log`
//! bridge picks those records up, so one filter governs both.
//!
//! # Log Levels
//!
//! - default: `warn` (degraded cells only)
//! - `-v`: `info` (per-layer match counts)
//! - `-vv`: `debug` (every commit, progress milestones)
//! - `-vvv`: `trace`
//!
//! `RUST_LOG` overrides the verbosity flags.

use std::io::IsTerminal;

use tracing::level_filters::LevelFilter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub fn level_for(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

/// Install the global subscriber. Logs go to stderr so stdout stays clean for
/// `--json`. A second call is a no-op.
pub fn init_logging(verbosity: u8) {
    let filter = EnvFilter::builder()
        .with_default_directive(level_for(verbosity).into())
        .from_env_lossy();

    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(false)
        .without_time();

    let _ = tracing_subscriber::registry().with(filter).with(layer).try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_raises_level() {
        assert_eq!(level_for(0), LevelFilter::WARN);
        assert_eq!(level_for(1), LevelFilter::INFO);
        assert_eq!(level_for(2), LevelFilter::DEBUG);
        assert_eq!(level_for(9), LevelFilter::TRACE);
    }
}
