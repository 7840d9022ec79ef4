pub mod cache;
pub mod classify;
pub mod client;
pub mod config;
pub mod error;
pub mod federation;
pub mod logging;
pub mod metrics;

pub use client::{ArtifactoryClient, Deadline, FetchResult};
pub use error::{ErrorClass, FetchError};

use config::LoggingConfig;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize tracing/logging
///
/// `RUST_LOG` takes precedence over `logging.level`. Fails if a global
/// subscriber is already installed.
pub fn init_tracing(logging: &LoggingConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))?;

    let registry = tracing_subscriber::registry().with(filter);

    match logging.format.as_str() {
        "json" => registry
            .with(fmt::layer().json().with_target(true))
            .try_init()?,
        _ => registry.with(fmt::layer().with_target(true)).try_init()?,
    }

    Ok(())
}
