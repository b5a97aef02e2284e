//! End-to-end poll lifecycle through the service and the router.

use std::sync::Arc;

use async_trait::async_trait;
use ballot_core::{Notifier, NotifyResult, OpContext};
use ballot_framework::{Command, PollError, PollService, Router};
use ballot_storage::{MemorySpace, PollStore, TuplePollStore, poll_schema};
use futures::future::join_all;
use parking_lot::Mutex;
use tokio_test::{assert_err, assert_ok};

fn setup() -> (Arc<TuplePollStore>, Arc<PollService>) {
    let space = Arc::new(MemorySpace::new(poll_schema("polls")));
    let store = Arc::new(TuplePollStore::new(space));
    let service = Arc::new(PollService::new(store.clone()));
    (store, service)
}

#[derive(Default)]
struct ChannelLog {
    posts: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl Notifier for ChannelLog {
    async fn post(&self, channel_id: &str, text: &str) -> NotifyResult<()> {
        self.posts.lock().push((channel_id.to_string(), text.to_string()));
        Ok(())
    }
}

#[tokio::test]
async fn test_favorite_color_lifecycle() {
    let (_, svc) = setup();
    let ctx = OpContext::background();

    let poll = assert_ok!(
        svc.create_poll(
            &ctx,
            "Favorite color?",
            vec!["Red".into(), "Green".into(), "Blue".into()],
            "alice",
        )
        .await
    );
    assert_eq!(poll.options.len(), 3);
    assert!(poll.is_active);

    assert_ok!(svc.vote(&ctx, &poll.id, "Red", "bob").await);
    assert_ok!(svc.vote(&ctx, &poll.id, "Green", "carol").await);
    assert_ok!(svc.vote(&ctx, &poll.id, "Red", "bob").await);

    let tally = assert_ok!(svc.results(&ctx, &poll.id).await);
    let pairs: Vec<_> = tally.iter().collect();
    assert_eq!(pairs, vec![("Red", 1), ("Green", 1), ("Blue", 0)]);
    assert_eq!(tally.total(), 2);

    assert_ok!(svc.end_poll(&ctx, &poll.id, "alice").await);
    let err = assert_err!(svc.vote(&ctx, &poll.id, "Blue", "dave").await);
    assert!(matches!(err, PollError::PollInactive));

    let err = assert_err!(svc.delete_poll(&ctx, &poll.id, "bob").await);
    assert!(matches!(err, PollError::NotAuthorized));
    assert_ok!(svc.get_poll(&ctx, &poll.id).await);

    assert_ok!(svc.delete_poll(&ctx, &poll.id, "alice").await);
    let err = assert_err!(svc.get_poll(&ctx, &poll.id).await);
    assert!(matches!(err, PollError::PollNotFound));
}

#[tokio::test]
async fn test_end_by_creator_keeps_record_fields() {
    let (_, svc) = setup();
    let ctx = OpContext::background();
    let poll = assert_ok!(
        svc.create_poll(&ctx, "T", vec!["A".into(), "B".into()], "alice")
            .await
    );
    assert_ok!(svc.vote(&ctx, &poll.id, "B", "bob").await);

    assert_ok!(svc.end_poll(&ctx, &poll.id, "alice").await);
    let ended = assert_ok!(svc.get_poll(&ctx, &poll.id).await);
    assert_ok!(svc.end_poll(&ctx, &poll.id, "alice").await);
    let again = assert_ok!(svc.get_poll(&ctx, &poll.id).await);

    assert_eq!(again.created_at, poll.created_at);
    assert_eq!(again.votes, ended.votes);
    assert!(!again.is_active);
}

#[tokio::test]
async fn test_results_sum_to_voters() {
    let (_, svc) = setup();
    let ctx = OpContext::background();
    let poll = assert_ok!(
        svc.create_poll(&ctx, "T", vec!["A".into(), "B".into(), "C".into()], "alice")
            .await
    );
    for (user, option) in [("u1", "A"), ("u2", "A"), ("u3", "C"), ("u1", "C")] {
        assert_ok!(svc.vote(&ctx, &poll.id, option, user).await);
    }

    let tally = assert_ok!(svc.results(&ctx, &poll.id).await);
    assert_eq!(tally.total(), assert_ok!(svc.vote_count(&ctx, &poll.id).await));
    assert_eq!(tally.get("B"), Some(0));
    assert_eq!(tally.get("C"), Some(2));
}

#[tokio::test]
async fn test_concurrent_votes_never_exceed_voters() {
    let (store, svc) = setup();
    let ctx = OpContext::background();
    let poll = assert_ok!(
        svc.create_poll(&ctx, "T", vec!["A".into(), "B".into()], "alice")
            .await
    );

    let voters: Vec<String> = (0..16).map(|i| format!("user-{i}")).collect();
    let outcomes = join_all(voters.iter().map(|user| {
        let svc = Arc::clone(&svc);
        let ctx = ctx.clone();
        let id = poll.id.clone();
        let user = user.clone();
        async move { svc.vote(&ctx, &id, "A", &user).await }
    }))
    .await;
    assert!(outcomes.iter().all(Result::is_ok));

    // Last replace wins in full, so some votes may be lost, never invented.
    let stored = assert_ok!(store.get(&ctx, &poll.id).await);
    assert!(!stored.votes.is_empty());
    assert!(stored.votes.len() <= voters.len());
    assert!(stored.votes.values().all(|v| v == "A"));
}

#[tokio::test]
async fn test_router_round_trip_posts_replies() {
    let (_, svc) = setup();
    let log = Arc::new(ChannelLog::default());
    svc.attach_notifier(log.clone());
    let router = Router::new(svc.clone());
    let ctx = OpContext::background();

    let created = router
        .handle_and_post(
            &ctx,
            &Command::from_text("/poll-create", r#""Favorite color?" Red Green Blue"#, "alice", "c1"),
        )
        .await;
    assert!(created.starts_with("### Poll Created: Favorite color?"));
    let id = assert_ok!(svc.list_polls(&ctx).await)[0].id.clone();

    let voted = router
        .handle_and_post(
            &ctx,
            &Command::new("poll-vote", vec![id.clone(), "Red".into()], "bob", "c1"),
        )
        .await;
    assert_eq!(
        voted,
        format!("Your vote for **Red** in poll **{id}** has been recorded.")
    );

    let ended = router
        .handle_and_post(&ctx, &Command::new("poll-end", vec![id.clone()], "alice", "c1"))
        .await;
    assert!(ended.starts_with("Poll has been ended.\n\n### Poll: Favorite color?\n\n**Status: Closed**"));
    assert!(ended.contains("- **Red**: 1 votes (100.0%)"));

    let denied = router
        .handle_and_post(&ctx, &Command::new("poll-delete", vec![id.clone()], "bob", "c1"))
        .await;
    assert_eq!(denied, "Error: failed to delete poll: not authorized to perform this action");

    let deleted = router
        .handle_and_post(&ctx, &Command::new("poll-delete", vec![id.clone()], "alice", "c1"))
        .await;
    assert_eq!(deleted, format!("Poll **{id}: Favorite color?** has been deleted."));

    let posts = log.posts.lock();
    assert_eq!(posts.len(), 5);
    assert!(posts.iter().all(|(channel, _)| channel == "c1"));
}
