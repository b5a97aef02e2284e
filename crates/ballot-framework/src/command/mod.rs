//! Slash-command routing.
//!
//! Inbound commands arrive from the chat connector as a name, an argument
//! list and the calling user and channel. The [`Router`] maps the name to a
//! [`PollCommand`] through the static [`COMMANDS`] table, runs the matching
//! handler against the [`PollService`](crate::PollService) and returns the
//! reply text.
//!
//! ```rust,ignore
//! use ballot_framework::{Command, Router};
//!
//! let cmd = Command::from_text("/poll-create", r#""Lunch?" "Pizza" "Sushi""#, "alice", "town-square");
//! let reply = router.handle(&ctx, &cmd).await;
//! ```
//!
//! Handlers check their own argument count and answer with a usage line
//! (a successful reply) when it is too short. Any other failure becomes a
//! [`CommandError`], which [`Router::handle`] renders as `Error: <message>`.

mod handlers;
mod router;
pub mod split;

use thiserror::Error;

use crate::service::PollError;

pub use router::Router;
pub use split::split_args;

// ─── Inbound command ──────────────────────────────────────────────────────────

/// A named user-invoked action with positional arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// Command name without the leading `/`.
    pub name: String,
    /// Positional arguments.
    pub args: Vec<String>,
    /// Calling user.
    pub user_id: String,
    /// Channel the command was issued in.
    pub channel_id: String,
}

impl Command {
    /// Creates a command from already split arguments.
    pub fn new(
        name: impl AsRef<str>,
        args: Vec<String>,
        user_id: impl Into<String>,
        channel_id: impl Into<String>,
    ) -> Self {
        Self {
            name: normalize_name(name.as_ref()),
            args,
            user_id: user_id.into(),
            channel_id: channel_id.into(),
        }
    }

    /// Creates a command from the raw argument text of a slash command.
    pub fn from_text(
        name: impl AsRef<str>,
        text: &str,
        user_id: impl Into<String>,
        channel_id: impl Into<String>,
    ) -> Self {
        Self::new(name, split_args(text), user_id, channel_id)
    }

    /// Parses a whole line such as `/poll-vote abc "Red"`.
    ///
    /// Returns `None` for a blank line.
    pub fn parse_line(
        line: &str,
        user_id: impl Into<String>,
        channel_id: impl Into<String>,
    ) -> Option<Self> {
        let mut parts = split_args(line);
        if parts.is_empty() {
            return None;
        }
        let name = parts.remove(0);
        Some(Self::new(name, parts, user_id, channel_id))
    }
}

/// Drops surrounding whitespace and exactly one leading `/`.
fn normalize_name(name: &str) -> String {
    let name = name.trim();
    name.strip_prefix('/').unwrap_or(name).to_string()
}

// ─── Command table ────────────────────────────────────────────────────────────

/// Registration metadata for one slash command.
///
/// Connectors use it to register commands with the chat platform and to
/// drive autocomplete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandSpec {
    /// Trigger word without the leading `/`.
    pub trigger: &'static str,
    /// One-line description shown in autocomplete.
    pub description: &'static str,
    /// Argument hint shown in autocomplete.
    pub hint: &'static str,
}

/// Every command the router understands, in [`PollCommand`] order.
pub static COMMANDS: [CommandSpec; 6] = [
    CommandSpec {
        trigger: "poll-create",
        description: "Create a new poll: /poll-create \"Title\" \"Option 1\" \"Option 2\" ...",
        hint: "\"Title\" \"Option 1\" \"Option 2\" ...",
    },
    CommandSpec {
        trigger: "poll-vote",
        description: "Vote in a poll: /poll-vote poll-id option",
        hint: "poll-id option",
    },
    CommandSpec {
        trigger: "poll-results",
        description: "Show poll results: /poll-results poll-id",
        hint: "poll-id",
    },
    CommandSpec {
        trigger: "poll-end",
        description: "End a poll: /poll-end poll-id",
        hint: "poll-id",
    },
    CommandSpec {
        trigger: "poll-delete",
        description: "Delete a poll: /poll-delete poll-id",
        hint: "poll-id",
    },
    CommandSpec {
        trigger: "poll-list",
        description: "List all polls, or only your active ones with `mine`",
        hint: "[mine]",
    },
];

/// The commands the router dispatches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PollCommand {
    Create,
    Vote,
    Results,
    End,
    Delete,
    List,
}

impl PollCommand {
    /// All commands, in table order.
    pub const ALL: [PollCommand; 6] = [
        PollCommand::Create,
        PollCommand::Vote,
        PollCommand::Results,
        PollCommand::End,
        PollCommand::Delete,
        PollCommand::List,
    ];

    /// Looks up a command by its bare trigger word, as stored in [`Command::name`].
    pub fn from_trigger(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.spec().trigger == name)
    }

    /// Registration metadata for this command.
    pub fn spec(self) -> &'static CommandSpec {
        &COMMANDS[self as usize]
    }

    /// Trigger word.
    pub fn trigger(self) -> &'static str {
        self.spec().trigger
    }
}

// ─── Errors ───────────────────────────────────────────────────────────────────

/// Errors produced while dispatching a command.
#[derive(Debug, Clone, Error)]
pub enum CommandError {
    /// No handler is registered under this name.
    #[error("unknown command: {0}")]
    UnknownCommand(String),

    /// The service rejected or failed the request.
    #[error("failed to {action}: {source}")]
    Failed {
        /// What the handler was trying to do, e.g. `"vote"`.
        action: &'static str,
        /// The underlying service error.
        #[source]
        source: PollError,
    },
}

impl CommandError {
    pub(crate) fn failed(action: &'static str) -> impl FnOnce(PollError) -> Self {
        move |source| Self::Failed { action, source }
    }

    /// The service error behind a [`CommandError::Failed`].
    pub fn poll_error(&self) -> Option<&PollError> {
        match self {
            Self::Failed { source, .. } => Some(source),
            Self::UnknownCommand(_) => None,
        }
    }
}

/// Result type for command dispatch.
pub type CommandResult<T> = Result<T, CommandError>;
