//! Ballot Runtime - the process-level layer of the Ballot polling bot.
//!
//! This crate provides:
//! - Layered configuration (`ballot.toml`, `BALLOT_*` env vars, profiles)
//! - Logging setup (`LoggingBuilder`, `init_from_config`)
//! - [`BallotRuntime`]: storage connection with bounded retry, command
//!   handling under a per-command timeout, notifier attachment and a
//!   once-only shutdown
//!
//! ```ignore
//! use ballot_runtime::BallotRuntime;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let runtime = BallotRuntime::new();
//!     runtime.run_until_signal().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod runtime;

// Re-exports
pub use config::{BallotConfig, ConfigError, ConfigLoader, ConfigResult, Profile};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::{LoggingBuilder, SpanEvents};
pub use runtime::{BallotRuntime, RuntimeBuilder};

// Re-export tracing for use by other crates
pub use tracing;
pub use tracing_subscriber;

/// Logging macros for connectors built on the runtime.
pub mod prelude {
    pub use tracing::{Level, debug, error, info, instrument, span, trace, warn};
}
