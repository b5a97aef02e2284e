//! Operation context: cancellation and deadlines.
//!
//! Every storage and service call takes an [`OpContext`]. The context is a
//! cheap, cloneable handle around a [`CancellationToken`] and an optional
//! deadline. Wrapping the work in [`OpContext::run`] makes it abort promptly
//! once the token is cancelled or the deadline passes, instead of finishing a
//! stale operation.
//!
//! ```rust,ignore
//! use std::time::Duration;
//! use ballot_core::OpContext;
//!
//! let ctx = OpContext::background().with_timeout(Duration::from_secs(5));
//! let poll = service.get_poll(&ctx, "poll-id").await?;
//! ```

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::Interrupted;

/// Cancellable execution context for a single logical operation.
///
/// Cloning shares the same token and deadline. Use [`child`](Self::child) to
/// derive a context that can be cancelled independently of its parent while
/// still observing the parent's cancellation.
#[derive(Debug, Clone, Default)]
pub struct OpContext {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl OpContext {
    /// A context that is never cancelled and has no deadline.
    pub fn background() -> Self {
        Self::default()
    }

    /// Builds a context from an existing token (e.g. a shutdown token).
    pub fn from_token(token: CancellationToken) -> Self {
        Self {
            token,
            deadline: None,
        }
    }

    /// Returns a copy that expires `timeout` from now.
    ///
    /// An earlier deadline already set on `self` is kept.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Returns a copy that expires at `deadline` (or earlier, if already set).
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let deadline = match self.deadline {
            Some(current) if current <= deadline => current,
            _ => deadline,
        };
        Self {
            token: self.token.clone(),
            deadline: Some(deadline),
        }
    }

    /// Derives a child context. Cancelling the child leaves the parent alone.
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
            deadline: self.deadline,
        }
    }

    /// Cancels this context and every child derived from it.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Returns `true` once [`cancel`](Self::cancel) was called here or on a parent.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// The deadline, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Fails fast if the context is already cancelled or expired.
    pub fn check(&self) -> Result<(), Interrupted> {
        if self.token.is_cancelled() {
            return Err(Interrupted::Cancelled);
        }
        if let Some(deadline) = self.deadline
            && Instant::now() >= deadline
        {
            return Err(Interrupted::DeadlineExceeded);
        }
        Ok(())
    }

    /// Drives `fut` to completion unless the context is interrupted first.
    ///
    /// The future is not polled at all when the context is already done.
    pub async fn run<F>(&self, fut: F) -> Result<F::Output, Interrupted>
    where
        F: Future,
    {
        self.check()?;

        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(Interrupted::Cancelled),
            _ = sleep_until(self.deadline) => Err(Interrupted::DeadlineExceeded),
            out = fut => Ok(out),
        }
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
