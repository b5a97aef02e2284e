//! The poll service.
//!
//! [`PollService`] owns every decision about how a poll changes: who may end
//! or delete it, which votes are valid, when it stops accepting votes. It
//! reads and writes through a [`PollStore`] and never touches raw tuples.
//!
//! # Concurrency
//!
//! The service holds no locks around poll updates. `vote`, `end_poll` and
//! `delete_poll` load the full record, change it in memory and write it back
//! with a single replace. Two concurrent votes on the same poll can therefore
//! lose one of them: the later replace wins in full. Callers that need exact
//! counts under contention must serialize votes per poll themselves.

mod error;
pub mod format;
mod tally;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use ballot_core::{BoxedNotifier, OpContext, Poll};
use ballot_storage::PollStore;
use parking_lot::RwLock;
use tracing::{debug, info, warn};

pub use error::{PollError, PollResult};
pub use format::render_results;
pub use tally::Tally;

/// Domain operations on polls.
///
/// Every operation takes an [`OpContext`] and returns
/// [`PollError::Cancelled`] when the context is interrupted before the
/// storage call completes.
pub struct PollService {
    store: Arc<dyn PollStore>,
    notifier: RwLock<Option<BoxedNotifier>>,
}

impl PollService {
    /// Creates a service without a notifier.
    pub fn new(store: Arc<dyn PollStore>) -> Self {
        Self {
            store,
            notifier: RwLock::new(None),
        }
    }

    /// Creates a service with a notifier already attached.
    pub fn with_notifier(store: Arc<dyn PollStore>, notifier: BoxedNotifier) -> Self {
        Self {
            store,
            notifier: RwLock::new(Some(notifier)),
        }
    }

    // ─── Notifier ─────────────────────────────────────────────────────────────

    /// Attaches (or replaces) the notifier.
    ///
    /// Meant to be called once during startup, after the connector that
    /// depends on this service has been built and before commands are served.
    pub fn attach_notifier(&self, notifier: BoxedNotifier) {
        let replaced = self.notifier.write().replace(notifier).is_some();
        info!(replaced, "Notifier attached to poll service");
    }

    /// Returns `true` if a notifier is attached.
    pub fn has_notifier(&self) -> bool {
        self.notifier.read().is_some()
    }

    /// Posts `text` to `channel_id` through the attached notifier.
    ///
    /// Never fails: a missing notifier or a delivery error is logged and
    /// reported as `false`.
    pub async fn announce(&self, channel_id: &str, text: &str) -> bool {
        let notifier = self.notifier.read().clone();
        let Some(notifier) = notifier else {
            warn!(channel_id = %channel_id, "Notifier not configured, message not sent");
            return false;
        };

        match notifier.post(channel_id, text).await {
            Ok(()) => {
                debug!(channel_id = %channel_id, len = text.len(), "Announcement posted");
                true
            }
            Err(e) => {
                warn!(channel_id = %channel_id, error = %e, "Failed to post announcement");
                false
            }
        }
    }

    // ─── Operations ───────────────────────────────────────────────────────────

    /// Creates and stores a new active poll with no votes.
    ///
    /// Fails with [`PollError::InvalidArgument`] for an empty title, fewer
    /// than two options or repeated options; nothing is written in that case.
    pub async fn create_poll(
        &self,
        ctx: &OpContext,
        title: &str,
        options: Vec<String>,
        creator_id: &str,
    ) -> PollResult<Poll> {
        info!(title = %title, options_count = options.len(), creator = %creator_id, "Creating poll");

        if title.is_empty() {
            return Err(PollError::invalid_argument("empty poll title"));
        }
        if options.len() < 2 {
            return Err(PollError::invalid_argument(
                "poll must have at least two options",
            ));
        }
        let mut seen = HashSet::with_capacity(options.len());
        if !options.iter().all(|o| seen.insert(o.as_str())) {
            return Err(PollError::invalid_argument("poll options must be unique"));
        }

        let poll = Poll::new(
            uuid::Uuid::new_v4().to_string(),
            title,
            options,
            creator_id,
            unix_now(),
        );

        self.store.create(ctx, &poll).await.inspect_err(|e| {
            warn!(poll_id = %poll.id, error = %e, "Failed to create poll");
        })?;

        info!(poll_id = %poll.id, "Poll created successfully");
        Ok(poll)
    }

    /// Loads a poll.
    pub async fn get_poll(&self, ctx: &OpContext, poll_id: &str) -> PollResult<Poll> {
        debug!(poll_id = %poll_id, "Getting poll");
        Ok(self.store.get(ctx, poll_id).await?)
    }

    /// Records `user_id`'s vote for `option`, replacing any earlier vote.
    ///
    /// Fails with [`PollError::PollInactive`] on an ended poll and with
    /// [`PollError::InvalidOption`] if `option` is not one of the labels; the
    /// poll is left unchanged in both cases.
    ///
    /// This is a read-modify-write of the whole record without a version
    /// check: a concurrent vote on the same poll that lands between this
    /// call's read and write is overwritten.
    pub async fn vote(
        &self,
        ctx: &OpContext,
        poll_id: &str,
        option: &str,
        user_id: &str,
    ) -> PollResult<()> {
        info!(poll_id = %poll_id, option = %option, user_id = %user_id, "Handling vote");

        let mut poll = self.store.get(ctx, poll_id).await?;

        if !poll.is_active {
            info!(poll_id = %poll_id, user_id = %user_id, "Attempted to vote in inactive poll");
            return Err(PollError::PollInactive);
        }
        if !poll.has_option(option) {
            info!(poll_id = %poll_id, option = %option, user_id = %user_id, "Invalid option selected");
            return Err(PollError::InvalidOption);
        }

        if let Some(previous) = poll.votes.insert(user_id.to_string(), option.to_string()) {
            info!(
                poll_id = %poll_id,
                user_id = %user_id,
                old_option = %previous,
                new_option = %option,
                "User updating vote"
            );
        }

        self.store.replace(ctx, &poll).await.inspect_err(|e| {
            warn!(poll_id = %poll_id, user_id = %user_id, error = %e, "Failed to update poll with vote");
        })?;

        info!(poll_id = %poll_id, user_id = %user_id, option = %option, "Vote processed successfully");
        Ok(())
    }

    /// Current vote counts, including options nobody picked.
    pub async fn results(&self, ctx: &OpContext, poll_id: &str) -> PollResult<Tally> {
        let poll = self.store.get(ctx, poll_id).await?;
        let tally = Tally::from_poll(&poll);
        debug!(poll_id = %poll_id, total = tally.total(), "Results calculated");
        Ok(tally)
    }

    /// Ends a poll. Only its creator may do this; ending an ended poll is a no-op.
    pub async fn end_poll(&self, ctx: &OpContext, poll_id: &str, user_id: &str) -> PollResult<()> {
        info!(poll_id = %poll_id, user_id = %user_id, "Ending poll");

        let mut poll = self.store.get(ctx, poll_id).await?;

        if !poll.is_owned_by(user_id) {
            info!(
                poll_id = %poll_id,
                creator = %poll.created_by,
                requester = %user_id,
                "Unauthorized attempt to end poll"
            );
            return Err(PollError::NotAuthorized);
        }

        if !poll.is_active {
            info!(poll_id = %poll_id, "Poll already inactive");
            return Ok(());
        }

        poll.is_active = false;
        self.store.replace(ctx, &poll).await.inspect_err(|e| {
            warn!(poll_id = %poll_id, error = %e, "Failed to update poll status");
        })?;

        info!(poll_id = %poll_id, "Poll ended successfully");
        Ok(())
    }

    /// Deletes a poll. Only its creator may do this.
    pub async fn delete_poll(&self, ctx: &OpContext, poll_id: &str, user_id: &str) -> PollResult<()> {
        info!(poll_id = %poll_id, user_id = %user_id, "Deleting poll");

        let poll = self.store.get(ctx, poll_id).await?;

        if !poll.is_owned_by(user_id) {
            info!(
                poll_id = %poll_id,
                creator = %poll.created_by,
                requester = %user_id,
                "Unauthorized attempt to delete poll"
            );
            return Err(PollError::NotAuthorized);
        }

        self.store.delete(ctx, poll_id).await.inspect_err(|e| {
            warn!(poll_id = %poll_id, error = %e, "Failed to delete poll");
        })?;

        info!(poll_id = %poll_id, "Poll deleted successfully");
        Ok(())
    }

    /// Every readable poll.
    pub async fn list_polls(&self, ctx: &OpContext) -> PollResult<Vec<Poll>> {
        let polls = self.store.list(ctx).await?;
        debug!(count = polls.len(), "Polls retrieved");
        Ok(polls)
    }

    /// Active polls created by `user_id`.
    pub async fn list_active_polls_by_user(
        &self,
        ctx: &OpContext,
        user_id: &str,
    ) -> PollResult<Vec<Poll>> {
        let polls: Vec<Poll> = self
            .store
            .list_by_creator(ctx, user_id)
            .await?
            .into_iter()
            .filter(|p| p.is_active && p.is_owned_by(user_id))
            .collect();
        debug!(user_id = %user_id, count = polls.len(), "Active user polls retrieved");
        Ok(polls)
    }

    /// Number of users that have voted in a poll.
    pub async fn vote_count(&self, ctx: &OpContext, poll_id: &str) -> PollResult<usize> {
        let poll = self.store.get(ctx, poll_id).await?;
        Ok(poll.total_votes())
    }

    /// Markdown summary of a poll's results.
    pub async fn format_results(&self, ctx: &OpContext, poll_id: &str) -> PollResult<String> {
        let poll = self.store.get(ctx, poll_id).await?;
        Ok(render_results(&poll, &Tally::from_poll(&poll)))
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use ballot_core::{Interrupted, Notifier, NotifyError, NotifyResult};
    use ballot_storage::{MemorySpace, StorageError, TuplePollStore, poll_schema};
    use parking_lot::Mutex;
    use tokio_test::{assert_err, assert_ok};

    fn service() -> PollService {
        let space = Arc::new(MemorySpace::new(poll_schema("polls")));
        PollService::new(Arc::new(TuplePollStore::new(space)))
    }

    fn options(labels: &[&str]) -> Vec<String> {
        labels.iter().map(|s| s.to_string()).collect()
    }

    #[derive(Default)]
    struct Recorder {
        posts: Mutex<Vec<(String, String)>>,
        fail: bool,
    }

    #[async_trait]
    impl Notifier for Recorder {
        async fn post(&self, channel_id: &str, text: &str) -> NotifyResult<()> {
            if self.fail {
                return Err(NotifyError::unavailable("offline"));
            }
            self.posts.lock().push((channel_id.into(), text.into()));
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_create_poll_defaults() {
        let svc = service();
        let ctx = OpContext::background();
        let poll = assert_ok!(
            svc.create_poll(&ctx, "Lunch?", options(&["Pizza", "Sushi"]), "alice")
                .await
        );

        assert!(poll.is_active);
        assert!(poll.votes.is_empty());
        assert_eq!(poll.options, options(&["Pizza", "Sushi"]));
        assert!(poll.created_at > 0);
        assert_eq!(assert_ok!(svc.get_poll(&ctx, &poll.id).await), poll);
    }

    #[tokio::test]
    async fn test_create_poll_rejects_bad_input_without_writing() {
        let svc = service();
        let ctx = OpContext::background();

        for (title, opts) in [
            ("", options(&["A", "B"])),
            ("T", options(&["A"])),
            ("T", options(&[])),
            ("T", options(&["A", "A"])),
        ] {
            let err = assert_err!(svc.create_poll(&ctx, title, opts, "alice").await);
            assert!(matches!(err, PollError::InvalidArgument(_)), "{err:?}");
        }
        assert!(assert_ok!(svc.list_polls(&ctx).await).is_empty());
    }

    #[tokio::test]
    async fn test_ids_are_unique() {
        let svc = service();
        let ctx = OpContext::background();
        let a = assert_ok!(svc.create_poll(&ctx, "T", options(&["A", "B"]), "u").await);
        let b = assert_ok!(svc.create_poll(&ctx, "T", options(&["A", "B"]), "u").await);
        assert_ne!(a.id, b.id);
    }

    #[tokio::test]
    async fn test_invalid_option_leaves_poll_unchanged() {
        let svc = service();
        let ctx = OpContext::background();
        let poll = assert_ok!(svc.create_poll(&ctx, "T", options(&["A", "B"]), "u").await);

        let err = assert_err!(svc.vote(&ctx, &poll.id, "C", "bob").await);
        assert!(matches!(err, PollError::InvalidOption));
        assert_eq!(assert_ok!(svc.get_poll(&ctx, &poll.id).await), poll);
    }

    #[tokio::test]
    async fn test_revote_keeps_latest() {
        let svc = service();
        let ctx = OpContext::background();
        let poll = assert_ok!(svc.create_poll(&ctx, "T", options(&["A", "B"]), "u").await);

        assert_ok!(svc.vote(&ctx, &poll.id, "A", "bob").await);
        assert_ok!(svc.vote(&ctx, &poll.id, "B", "bob").await);

        let stored = assert_ok!(svc.get_poll(&ctx, &poll.id).await);
        assert_eq!(stored.votes.len(), 1);
        assert_eq!(stored.vote_of("bob"), Some("B"));
        assert_eq!(assert_ok!(svc.vote_count(&ctx, &poll.id).await), 1);
    }

    #[tokio::test]
    async fn test_vote_on_missing_poll() {
        let svc = service();
        let err = assert_err!(svc.vote(&OpContext::background(), "nope", "A", "bob").await);
        assert!(matches!(err, PollError::PollNotFound));
    }

    #[tokio::test]
    async fn test_end_poll_rules() {
        let svc = service();
        let ctx = OpContext::background();
        let poll = assert_ok!(svc.create_poll(&ctx, "T", options(&["A", "B"]), "alice").await);
        assert_ok!(svc.vote(&ctx, &poll.id, "A", "bob").await);

        let err = assert_err!(svc.end_poll(&ctx, &poll.id, "bob").await);
        assert!(matches!(err, PollError::NotAuthorized));
        assert!(assert_ok!(svc.get_poll(&ctx, &poll.id).await).is_active);

        assert_ok!(svc.end_poll(&ctx, &poll.id, "alice").await);
        let ended = assert_ok!(svc.get_poll(&ctx, &poll.id).await);
        assert!(!ended.is_active);

        assert_ok!(svc.end_poll(&ctx, &poll.id, "alice").await);
        assert_eq!(assert_ok!(svc.get_poll(&ctx, &poll.id).await), ended);

        let err = assert_err!(svc.vote(&ctx, &poll.id, "B", "carol").await);
        assert!(matches!(err, PollError::PollInactive));
    }

    #[tokio::test]
    async fn test_delete_poll_rules() {
        let svc = service();
        let ctx = OpContext::background();
        let poll = assert_ok!(svc.create_poll(&ctx, "T", options(&["A", "B"]), "alice").await);

        let err = assert_err!(svc.delete_poll(&ctx, &poll.id, "bob").await);
        assert!(matches!(err, PollError::NotAuthorized));
        assert_ok!(svc.get_poll(&ctx, &poll.id).await);

        assert_ok!(svc.delete_poll(&ctx, &poll.id, "alice").await);
        let err = assert_err!(svc.get_poll(&ctx, &poll.id).await);
        assert!(matches!(err, PollError::PollNotFound));

        let err = assert_err!(svc.delete_poll(&ctx, &poll.id, "alice").await);
        assert!(matches!(err, PollError::PollNotFound));
    }

    #[tokio::test]
    async fn test_active_polls_by_user() {
        let svc = service();
        let ctx = OpContext::background();
        let a1 = assert_ok!(svc.create_poll(&ctx, "A1", options(&["x", "y"]), "alice").await);
        let a2 = assert_ok!(svc.create_poll(&ctx, "A2", options(&["x", "y"]), "alice").await);
        assert_ok!(svc.create_poll(&ctx, "B1", options(&["x", "y"]), "bob").await);
        assert_ok!(svc.end_poll(&ctx, &a2.id, "alice").await);

        let mine = assert_ok!(svc.list_active_polls_by_user(&ctx, "alice").await);
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].id, a1.id);
        assert_eq!(assert_ok!(svc.list_polls(&ctx).await).len(), 3);
    }

    #[tokio::test]
    async fn test_cancelled_context() {
        let svc = service();
        let ctx = OpContext::background();
        ctx.cancel();

        let err = assert_err!(svc.create_poll(&ctx, "T", options(&["A", "B"]), "u").await);
        assert!(matches!(err, PollError::Cancelled(Interrupted::Cancelled)));
    }

    #[tokio::test]
    async fn test_closed_store_is_storage_failure() {
        let space = Arc::new(MemorySpace::new(poll_schema("polls")));
        let store = Arc::new(TuplePollStore::new(space));
        let svc = PollService::new(store.clone());
        assert_ok!(store.close().await);

        let err = assert_err!(svc.list_polls(&OpContext::background()).await);
        assert!(matches!(
            err,
            PollError::StorageFailure(StorageError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_announce_without_notifier_is_silent() {
        let svc = service();
        assert!(!svc.has_notifier());
        assert!(!svc.announce("town-square", "hello").await);
    }

    #[tokio::test]
    async fn test_announce_posts_and_swallows_failures() {
        let svc = service();
        let recorder = Arc::new(Recorder::default());
        svc.attach_notifier(recorder.clone());
        assert!(svc.announce("town-square", "hello").await);
        assert_eq!(
            recorder.posts.lock().as_slice(),
            &[("town-square".to_string(), "hello".to_string())]
        );

        svc.attach_notifier(Arc::new(Recorder {
            fail: true,
            ..Default::default()
        }));
        assert!(!svc.announce("town-square", "again").await);
        assert_eq!(recorder.posts.lock().len(), 1);
    }
}
