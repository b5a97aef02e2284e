use std::sync::Arc;

use ballot_core::OpContext;
use tracing::{Instrument, Level, debug, info, span, warn};

use super::handlers;
use super::{COMMANDS, Command, CommandError, CommandResult, CommandSpec, PollCommand};
use crate::service::PollService;

/// Dispatches inbound commands to their handlers.
///
/// Cheap to clone; clones share the same service.
#[derive(Clone)]
pub struct Router {
    service: Arc<PollService>,
}

impl Router {
    /// Creates a router over `service`.
    pub fn new(service: Arc<PollService>) -> Self {
        Self { service }
    }

    /// The service commands are dispatched to.
    pub fn service(&self) -> &Arc<PollService> {
        &self.service
    }

    /// Registration metadata for every supported command.
    pub fn commands(&self) -> &'static [CommandSpec] {
        &COMMANDS
    }

    /// Runs the handler for `cmd` and returns its reply.
    ///
    /// Usage help for missing arguments is a successful reply. Fails with
    /// [`CommandError::UnknownCommand`] for names outside the command table.
    pub async fn dispatch(&self, ctx: &OpContext, cmd: &Command) -> CommandResult<String> {
        let Some(kind) = PollCommand::from_trigger(&cmd.name) else {
            return Err(CommandError::UnknownCommand(cmd.name.clone()));
        };

        let span = span!(
            Level::DEBUG,
            "dispatch",
            command = %cmd.name,
            user_id = %cmd.user_id,
            channel_id = %cmd.channel_id
        );

        async {
            debug!(args = ?cmd.args, "Processing command");
            let svc = self.service.as_ref();
            match kind {
                PollCommand::Create => handlers::create(svc, ctx, cmd).await,
                PollCommand::Vote => handlers::vote(svc, ctx, cmd).await,
                PollCommand::Results => handlers::results(svc, ctx, cmd).await,
                PollCommand::End => handlers::end(svc, ctx, cmd).await,
                PollCommand::Delete => handlers::delete(svc, ctx, cmd).await,
                PollCommand::List => handlers::list(svc, ctx, cmd).await,
            }
        }
        .instrument(span)
        .await
    }

    /// Like [`dispatch`](Self::dispatch), but renders any error as
    /// `Error: <message>` so a bad command always gets a reply.
    pub async fn handle(&self, ctx: &OpContext, cmd: &Command) -> String {
        match self.dispatch(ctx, cmd).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(command = %cmd.name, user_id = %cmd.user_id, error = %e, "Failed to handle command");
                format!("Error: {e}")
            }
        }
    }

    /// Handles `cmd` and posts the reply to its channel through the service's
    /// notifier. Empty replies are not posted. Returns the reply.
    pub async fn handle_and_post(&self, ctx: &OpContext, cmd: &Command) -> String {
        let reply = self.handle(ctx, cmd).await;
        if !reply.is_empty() {
            self.service.announce(&cmd.channel_id, &reply).await;
        }
        info!(command = %cmd.name, channel_id = %cmd.channel_id, "Command handled");
        reply
    }
}
