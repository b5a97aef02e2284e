use std::fmt::Write;

use ballot_core::{OpContext, Poll};

use super::{Command, CommandError, CommandResult};
use crate::service::PollService;

pub(super) async fn create(svc: &PollService, ctx: &OpContext, cmd: &Command) -> CommandResult<String> {
    if cmd.args.len() < 3 {
        return Ok("Usage: `/poll-create \"Title\" \"Option 1\" \"Option 2\" ...`\n\
                   Title and at least 2 options enclosed with \"\" are required."
            .to_string());
    }

    let title = &cmd.args[0];
    let options = cmd.args[1..].to_vec();

    let poll = svc
        .create_poll(ctx, title, options, &cmd.user_id)
        .await
        .map_err(CommandError::failed("create poll"))?;

    let mut reply = format!(
        "### Poll Created: {}\n\n**ID:** {}\n\n**Options:**\n",
        poll.title, poll.id
    );
    for (i, option) in poll.options.iter().enumerate() {
        let _ = writeln!(reply, "{}. {option}", i + 1);
    }
    let _ = write!(
        reply,
        "\nTo vote: `/poll-vote {id} \"Option\"`\nTo see results: `/poll-results {id}`",
        id = poll.id
    );
    Ok(reply)
}

pub(super) async fn vote(svc: &PollService, ctx: &OpContext, cmd: &Command) -> CommandResult<String> {
    let [poll_id, option, ..] = cmd.args.as_slice() else {
        return Ok("Usage: `/poll-vote [poll-id] [option]`".to_string());
    };

    svc.vote(ctx, poll_id, option, &cmd.user_id)
        .await
        .map_err(CommandError::failed("vote"))?;

    Ok(format!(
        "Your vote for **{option}** in poll **{poll_id}** has been recorded."
    ))
}

pub(super) async fn results(svc: &PollService, ctx: &OpContext, cmd: &Command) -> CommandResult<String> {
    let Some(poll_id) = cmd.args.first() else {
        return Ok("Usage: `/poll-results [poll-id]`".to_string());
    };

    svc.format_results(ctx, poll_id)
        .await
        .map_err(CommandError::failed("get poll results"))
}

pub(super) async fn end(svc: &PollService, ctx: &OpContext, cmd: &Command) -> CommandResult<String> {
    let Some(poll_id) = cmd.args.first() else {
        return Ok("Usage: `/poll-end [poll-id]`".to_string());
    };

    svc.end_poll(ctx, poll_id, &cmd.user_id)
        .await
        .map_err(CommandError::failed("end poll"))?;

    match svc.format_results(ctx, poll_id).await {
        Ok(results) => Ok(format!("Poll has been ended.\n\n{results}")),
        Err(_) => Ok("Poll has been ended, but results could not be displayed.".to_string()),
    }
}

pub(super) async fn delete(svc: &PollService, ctx: &OpContext, cmd: &Command) -> CommandResult<String> {
    let Some(poll_id) = cmd.args.first() else {
        return Ok("Usage: `/poll-delete [poll-id]`".to_string());
    };

    let poll = svc
        .get_poll(ctx, poll_id)
        .await
        .map_err(CommandError::failed("get poll"))?;

    svc.delete_poll(ctx, poll_id, &cmd.user_id)
        .await
        .map_err(CommandError::failed("delete poll"))?;

    Ok(format!("Poll **{poll_id}: {}** has been deleted.", poll.title))
}

pub(super) async fn list(svc: &PollService, ctx: &OpContext, cmd: &Command) -> CommandResult<String> {
    if cmd.args.first().is_some_and(|a| a == "mine") {
        let polls = svc
            .list_active_polls_by_user(ctx, &cmd.user_id)
            .await
            .map_err(CommandError::failed("list polls"))?;
        return Ok(render_list("### Your Active Polls\n\n", "You have no active polls.", &polls));
    }

    let polls = svc
        .list_polls(ctx)
        .await
        .map_err(CommandError::failed("list polls"))?;
    Ok(render_list("### Available Polls\n\n", "No polls found.", &polls))
}

fn render_list(header: &str, empty: &str, polls: &[Poll]) -> String {
    if polls.is_empty() {
        return empty.to_string();
    }

    let mut out = header.to_string();
    for (i, poll) in polls.iter().enumerate() {
        let _ = writeln!(out, "{}. **{}** (ID: `{}`)", i + 1, poll.title, poll.id);
        let _ = write!(
            out,
            "   Status: {} | Votes: {}\n\n",
            poll.status_label(),
            poll.total_votes()
        );
    }
    out
}
