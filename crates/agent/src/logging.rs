// SPDX-License-Identifier: MIT

//! Logging initialization shared by the agent and supervisor binaries.

use thiserror::Error;
use tracing::metadata::LevelFilter;
use tracing::Level;
use tracing_subscriber::fmt::format::PrettyFields;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("unable to install global tracing subscriber: {0}")]
    TryInit(String),
}

/// Install the global `tracing` subscriber. Honors `RUST_LOG`, defaulting to
/// `info`. If `log_dir` is set, logs are additionally written to a daily
/// rolling file named after `agent_name` in that directory (so `oa logs
/// <name>` has a predictable path to tail); stderr output is unaffected
/// either way.
pub fn init(
    log_dir: Option<&std::path::Path>,
    agent_name: &str,
) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>, LoggingError> {
    let env_filter = EnvFilter::builder().with_default_directive(LevelFilter::INFO.into()).from_env_lossy();

    match log_dir {
        None => {
            tracing_subscriber::fmt()
                .with_max_level(Level::TRACE)
                .with_env_filter(env_filter)
                .fmt_fields(PrettyFields::new())
                .try_init()
                .map_err(|e| LoggingError::TryInit(e.to_string()))?;
            Ok(None)
        }
        Some(dir) => {
            let file_appender = tracing_appender::rolling::daily(dir, format!("{agent_name}.log"));
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            tracing_subscriber::fmt()
                .with_max_level(Level::TRACE)
                .with_env_filter(env_filter)
                .fmt_fields(PrettyFields::new())
                .with_writer(non_blocking)
                .try_init()
                .map_err(|e| LoggingError::TryInit(e.to_string()))?;
            Ok(Some(guard))
        }
    }
}
