//! Structured logging using the tracing crate

use std::error::Error;

/// Initialize the tracing subscriber for structured logging.
///
/// The subscriber is configured with:
/// - Filtering from `RUST_LOG` (defaulting to `info`)
/// - Optional JSON formatting for log aggregation systems
/// - Output to stdout for container deployments
///
/// Returns an error if a global subscriber has already been installed.
pub fn init_subscriber(json: bool) -> Result<(), Box<dyn Error + Send + Sync>> {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .try_init()?;
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).try_init()?;
    }

    Ok(())
}
