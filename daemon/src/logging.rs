//! Log sink setup

use crate::config::LoggingConfig;
use anyhow::Result;
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// File created inside `logging.path`
pub const LOG_FILE_NAME: &str = "smsgate.log";

/// Install the global subscriber. `RUST_LOG` wins over `verbose`.
pub fn init(verbose: bool, config: &LoggingConfig) -> Result<()> {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let builder = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true);

    match &config.path {
        Some(dir) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(dir.join(LOG_FILE_NAME))?;
            let subscriber = builder.with_ansi(false).with_writer(Mutex::new(file)).finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        None => tracing::subscriber::set_global_default(builder.finish())?,
    }

    Ok(())
}
