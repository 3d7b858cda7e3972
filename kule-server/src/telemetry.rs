//! Log output.

use tracing_subscriber::EnvFilter;

use crate::{config::LogConfig, error::ServerError};

/// Installs the global subscriber.
///
/// `RUST_LOG` takes precedence over `config.level`. An unparsable level falls back to
/// `info`.
pub fn init_tracing(config: &LogConfig) -> Result<(), ServerError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let result = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    result.map_err(|e| ServerError::Telemetry(e.to_string()))
}
