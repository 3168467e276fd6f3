// Logging - tracing subscriber for the CLI
//
// RUST_LOG wins over the configured level when set.

use crate::error::{Error, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter directive for the configured level; `verbose` bumps this crate to debug
pub fn filter_directive(level: &str, verbose: bool) -> String {
    let level = level.to_lowercase();
    if verbose {
        format!("fbs_rankings=debug,{}", level)
    } else {
        format!("fbs_rankings={},warn", level)
    }
}

pub fn init(level: &str, verbose: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(level, verbose)));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .with_writer(std::io::stderr)
                .compact(),
        )
        .try_init()
        .map_err(|err| Error::config(format!("cannot install logger: {}", err)))
}
