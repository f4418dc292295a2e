pub mod config;
pub mod error;

pub use config::{ApiConfig, CommitMode, Config, DashboardConfig, UserConfig, ValidationResult};
pub use error::{AppError, ConfigError, ReqwestErrorExt, TransportError};

use anyhow::Result;

/// Initialize logging. `RUST_LOG` wins over `default_level` when set.
pub fn init(default_level: &str) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!("Skyboard core initialized");
    Ok(())
}
