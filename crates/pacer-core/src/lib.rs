// SPDX-License-Identifier: CEPL-1.0
#![deny(unsafe_op_in_unsafe_fn)]
//! Process-wide plumbing: logging setup and the `pacer.toml` config file.

pub mod config;

pub use config::{load_config, AppConfig, ConfigError, DEFAULT_CONFIG_PATH};

/// Installs the global `tracing` subscriber. `RUST_LOG` wins over the
/// default `info` level. A second call is a no-op.
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_tracing_twice_is_harmless() {
        init_tracing();
        init_tracing();
        tracing::info!("still logging");
    }
}
