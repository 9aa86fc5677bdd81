//! Logger setup for the demo binary.

use env_logger::{Builder, Env};
use log::LevelFilter;

/// GPU stack crates that are chatty at `info`.
const GPU_CRATES: [&str; 3] = ["wgpu_core", "wgpu_hal", "naga"];

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Level used when `RUST_LOG` is unset.
    pub default_level: LevelFilter,
    /// Caps the GPU stack at `warn` unless `RUST_LOG` is set.
    pub quiet_gpu: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default_level: LevelFilter::Info,
            quiet_gpu: true,
        }
    }
}

/// Installs the global logger. Returns `false` if a logger was already set.
pub fn init_logging(config: &LoggingConfig) -> bool {
    let env = Env::default().default_filter_or(config.default_level.to_string());
    let mut builder = Builder::from_env(env);

    if config.quiet_gpu && std::env::var_os("RUST_LOG").is_none() {
        for name in GPU_CRATES {
            builder.filter_module(name, LevelFilter::Warn);
        }
    }
    builder.format_timestamp_millis();

    let installed = builder.try_init().is_ok();
    if installed {
        log::debug!("logging initialized at {}", config.default_level);
    }
    installed
}
