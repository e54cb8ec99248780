//! Configuration layering shared by the gateway and loop detector.
//!
//! Priority: env vars → `config/local` → `config/{RUN_MODE}` → `config/default` → defaults.

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File};

/// Run mode used to pick the environment-specific config file.
#[must_use]
pub fn run_mode() -> String {
    std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string())
}

/// Stack the standard file and environment sources on top of `builder`.
///
/// Files are optional; empty environment variables are treated as unset.
///
/// # Errors
///
/// Returns a `ConfigError` if a present source cannot be parsed.
pub fn layered(builder: ConfigBuilder<DefaultState>) -> Result<Config, ConfigError> {
    let run_mode = run_mode();
    builder
        .add_source(File::with_name("config/default").required(false))
        .add_source(File::with_name(&format!("config/{run_mode}")).required(false))
        .add_source(File::with_name("config/local").required(false))
        .add_source(Environment::default().ignore_empty(true))
        .build()
}
