//! # Ballot
//!
//! Multiple-choice polls for chat workspaces: create a poll, cast one vote
//! per user, inspect tallies, close or remove a poll.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────┐   ┌─────────┐   ┌──────────┐   ┌─────────────┐   ┌───────────┐
//! │ Connector │──▶│ Runtime │──▶│  Router  │──▶│ PollService │──▶│ PollStore │──▶ TupleSpace
//! └───────────┘   └─────────┘   └──────────┘   └──────┬──────┘   └───────────┘
//!       ▲                                             │
//!       └───────────────── Notifier ◀─────────────────┘
//! ```
//!
//! - **Runtime**: configuration, logging, storage connection and shutdown
//! - **Router**: splits slash-command text and renders replies
//! - **PollService**: authorization, vote validity and state transitions
//! - **PollStore**: the only place untyped tuples become [`Poll`](core::Poll)s
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use ballot::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let runtime = BallotRuntime::new();
//!     runtime.start().await?;
//!
//!     let cmd = Command::from_text("/poll-create", r#""Lunch?" Pizza Sushi"#, "alice", "general");
//!     println!("{}", runtime.handle_command(&cmd).await?);
//!
//!     runtime.shutdown().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `toml-config`: read `ballot.toml` (default)
//! - `yaml-config`: read `ballot.yaml`
//! - `json-log`: JSON log lines

pub use ballot_core as core;
pub use ballot_framework as framework;
pub use ballot_runtime as runtime;
pub use ballot_storage as storage;

/// Prelude module for convenient imports.
pub mod prelude {
    // Runtime - main entry point
    pub use ballot_runtime::{BallotConfig, BallotRuntime, RuntimeError};

    // Commands
    pub use ballot_framework::{COMMANDS, Command, CommandSpec, Router};

    // Domain
    pub use ballot_core::{BoxedNotifier, Notifier, NotifyError, NotifyResult, OpContext, Poll};
    pub use ballot_framework::{PollError, PollService, Tally};
}
