//! Layered configuration for the ballot runtime.
//!
//! Settings come from built-in defaults, `ballot.toml` (or YAML with the
//! `yaml-config` feature) and `BALLOT_*` environment variables.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, ENV_PREFIX, Profile, load_config, load_config_from_file};
pub use schema::{
    BallotConfig, CommandConfig, LogFormat, LogLevel, LogOutput, LogRotation, LoggingConfig,
    SpanEventConfig,
};
pub use validation::validate_config;
