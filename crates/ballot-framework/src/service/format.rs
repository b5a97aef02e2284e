//! Markdown rendering of poll results.

use std::fmt::Write;

use ballot_core::Poll;

use super::Tally;

/// Renders the results block shown by `poll-results` and `poll-end`.
///
/// Percentages are relative to the number of voters; with no votes every
/// option shows `0.0%`.
pub fn render_results(poll: &Poll, tally: &Tally) -> String {
    let mut out = format!("### Poll: {}\n\n", poll.title);

    if !poll.is_active {
        out.push_str("**Status: Closed**\n\n");
    }

    let total = poll.total_votes();
    let _ = write!(out, "**Total votes: {total}**\n\n");

    out.push_str("#### Results:\n");
    for (option, votes) in tally.iter() {
        let _ = writeln!(
            out,
            "- **{option}**: {votes} votes ({:.1}%)",
            percentage(votes, total)
        );
    }

    out
}

fn percentage(votes: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        votes as f64 / total as f64 * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn poll() -> Poll {
        Poll::new(
            "p",
            "Favorite color?",
            vec!["Red".into(), "Green".into(), "Blue".into()],
            "alice",
            0,
        )
    }

    #[test]
    fn test_no_votes_renders_zero_percent() {
        let p = poll();
        let text = render_results(&p, &Tally::from_poll(&p));
        assert_eq!(
            text,
            "### Poll: Favorite color?\n\n\
             **Total votes: 0**\n\n\
             #### Results:\n\
             - **Red**: 0 votes (0.0%)\n\
             - **Green**: 0 votes (0.0%)\n\
             - **Blue**: 0 votes (0.0%)\n"
        );
    }

    #[test]
    fn test_closed_poll_with_votes() {
        let mut p = poll();
        p.votes.insert("bob".into(), "Red".into());
        p.votes.insert("carol".into(), "Green".into());
        p.votes.insert("dave".into(), "Red".into());
        p.is_active = false;

        let text = render_results(&p, &Tally::from_poll(&p));
        assert!(text.contains("**Status: Closed**\n\n"));
        assert!(text.contains("**Total votes: 3**"));
        assert!(text.contains("- **Red**: 2 votes (66.7%)\n"));
        assert!(text.contains("- **Green**: 1 votes (33.3%)\n"));
        assert!(text.contains("- **Blue**: 0 votes (0.0%)\n"));
    }
}
