//! The poll entity.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A titled set of options with per-user votes and an active/closed flag.
///
/// Only the poll service decides when these fields change; the storage layer
/// just moves them in and out of the backing store.
///
/// # Invariants
///
/// - `options` has at least two entries and never changes after creation.
/// - every value in `votes` was one of `options` when it was written.
/// - `is_active` goes from `true` to `false` at most once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Poll {
    /// Opaque identifier, also the storage primary key.
    pub id: String,
    /// Display title.
    pub title: String,
    /// Ordered, unique option labels.
    pub options: Vec<String>,
    /// User that created the poll; the only one allowed to end or delete it.
    pub created_by: String,
    /// Creation time, seconds since the Unix epoch.
    pub created_at: u64,
    /// `false` once the poll has been ended.
    pub is_active: bool,
    /// Latest vote per user: user id → option label.
    pub votes: BTreeMap<String, String>,
}

impl Poll {
    /// Creates a fresh, active poll with no votes.
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        options: Vec<String>,
        created_by: impl Into<String>,
        created_at: u64,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            options,
            created_by: created_by.into(),
            created_at,
            is_active: true,
            votes: BTreeMap::new(),
        }
    }

    /// Returns `true` if `option` is one of this poll's labels.
    pub fn has_option(&self, option: &str) -> bool {
        self.options.iter().any(|o| o == option)
    }

    /// Returns `true` if `user_id` created this poll.
    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.created_by == user_id
    }

    /// The option `user_id` currently votes for, if any.
    pub fn vote_of(&self, user_id: &str) -> Option<&str> {
        self.votes.get(user_id).map(String::as_str)
    }

    /// Number of users that have voted.
    pub fn total_votes(&self) -> usize {
        self.votes.len()
    }

    /// Human-readable status label.
    pub fn status_label(&self) -> &'static str {
        if self.is_active { "Active" } else { "Closed" }
    }
}
