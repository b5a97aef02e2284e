//! # Ballot Core
//!
//! The foundation layer of the Ballot polling bot.
//!
//! This crate holds the types every other layer agrees on:
//!
//! - **Entity**: the [`Poll`] record, the only thing that is ever persisted
//! - **Operation context**: [`OpContext`], the cancellation / deadline handle
//!   threaded through every storage and service call
//! - **Notifier capability**: [`Notifier`], the narrow outbound interface to
//!   the chat platform
//!
//! ## Layering
//!
//! ```text
//! ┌──────────────┐     ┌──────────────┐     ┌──────────────┐
//! │ Command      │────▶│ PollService  │────▶│ PollStore    │────▶ TupleSpace
//! │ Router       │     │ (framework)  │     │ (storage)    │
//! └──────────────┘     └──────┬───────┘     └──────────────┘
//!                             │
//!                             ▼
//!                        dyn Notifier
//! ```
//!
//! Nothing in this crate performs I/O.

pub mod context;
pub mod error;
pub mod notifier;
pub mod poll;

pub use context::OpContext;
pub use error::{Interrupted, NotifyError, NotifyResult};
pub use notifier::{BoxedNotifier, Notifier};
pub use poll::Poll;

/// Prelude for common imports.
pub mod prelude {
    pub use super::context::OpContext;
    pub use super::error::{Interrupted, NotifyError};
    pub use super::notifier::{BoxedNotifier, Notifier};
    pub use super::poll::Poll;
}
