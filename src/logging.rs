//! Tracing subscriber setup for the launchnet binary

use crate::error::NetworkError;
use tracing::Level;

/// Parses a level name such as `info` or `DEBUG`.
pub fn parse_level(level: &str) -> Result<Level, NetworkError> {
    level
        .trim()
        .parse::<Level>()
        .map_err(|_| NetworkError::Config(format!("unknown log level '{}'", level)))
}

/// Installs the global fmt subscriber. Logs go to stderr so command output on
/// stdout stays machine readable. Calling it twice is a no-op.
pub fn init(level: &str) -> Result<(), NetworkError> {
    let level = parse_level(level)?;
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
    Ok(())
}
