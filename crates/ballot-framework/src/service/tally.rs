use ballot_core::Poll;
use serde::Serialize;

/// Vote counts per option, in the poll's option order.
///
/// Computed on demand from a poll's votes and never stored. Every option
/// appears, including those nobody voted for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tally {
    counts: Vec<(String, usize)>,
}

impl Tally {
    /// Counts the current votes of `poll`.
    ///
    /// A stored vote for a label that is not among the options is not
    /// attributed to any option.
    pub fn from_poll(poll: &Poll) -> Self {
        let counts = poll
            .options
            .iter()
            .map(|option| {
                let n = poll.votes.values().filter(|v| *v == option).count();
                (option.clone(), n)
            })
            .collect();
        Self { counts }
    }

    /// Count for `option`, or `None` if it is not an option of the poll.
    pub fn get(&self, option: &str) -> Option<usize> {
        self.counts
            .iter()
            .find(|(label, _)| label == option)
            .map(|(_, n)| *n)
    }

    /// Sum of all option counts.
    pub fn total(&self) -> usize {
        self.counts.iter().map(|(_, n)| n).sum()
    }

    /// `(option, count)` pairs in option order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.counts.iter().map(|(label, n)| (label.as_str(), *n))
    }

    /// Number of options.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    /// `true` if the poll had no options.
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}
