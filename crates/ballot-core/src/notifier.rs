//! Outbound notification capability.
//!
//! The chat-platform connector is an external collaborator. The only thing
//! the poll domain needs from it is the ability to push a text message into a
//! channel, which is what [`Notifier`] describes. Connectors implement it;
//! the service holds it as a [`BoxedNotifier`].

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::NotifyResult;

/// Pushes Markdown-flavoured text into a chat channel.
///
/// Implementations should return promptly; callers treat failures as
/// non-fatal and only log them.
#[async_trait]
pub trait Notifier: Send + Sync + 'static {
    /// Posts `text` to the channel identified by `channel_id`.
    async fn post(&self, channel_id: &str, text: &str) -> NotifyResult<()>;
}

/// Shared, type-erased notifier handle.
pub type BoxedNotifier = Arc<dyn Notifier>;

