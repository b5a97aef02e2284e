//! # Ballot Framework
//!
//! The poll domain and the command surface on top of it.
//!
//! This layer provides:
//! - [`PollService`]: authorization, vote validity and state transitions,
//!   tallies and result rendering, opportunistic announcements
//! - [`Router`]: argument splitting, the static command table and the
//!   handlers that turn service results into reply text
//!
//! Storage is reached only through [`ballot_storage::PollStore`]; the chat
//! platform only through [`ballot_core::Notifier`].

pub mod command;
pub mod service;

pub use command::{
    COMMANDS, Command, CommandError, CommandResult, CommandSpec, PollCommand, Router, split_args,
};
pub use service::{PollError, PollResult, PollService, Tally, render_results};

/// Prelude for common imports.
pub mod prelude {
    pub use super::command::{Command, CommandError, Router};
    pub use super::service::{PollError, PollService, Tally};
}
