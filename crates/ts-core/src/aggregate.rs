//! Per-contributor totals over reconstructed sessions.

use std::collections::{BTreeMap, BTreeSet};

use chrono::Duration;

use crate::event::EventRecord;
use crate::select::Selection;
use crate::session::{SessionConfig, SessionError, WorkSession, reconstruct};

/// Time spent by one contributor on one repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContributorSummary {
    pub repo: String,
    pub author: String,
    /// Distinct calendar days with at least one session.
    pub days_worked: usize,
    /// Sum of session durations.
    pub time_spent: Duration,
}

impl ContributorSummary {
    pub fn from_sessions(
        repo: impl Into<String>,
        author: impl Into<String>,
        sessions: &[WorkSession],
    ) -> Self {
        let days: BTreeSet<_> = sessions.iter().map(WorkSession::date).collect();
        let time_spent = sessions
            .iter()
            .fold(Duration::zero(), |total, session| total + session.duration());

        Self {
            repo: repo.into(),
            author: author.into(),
            days_worked: days.len(),
            time_spent,
        }
    }
}

/// Distinct non-empty author names, in ascending order.
pub fn contributors(universe: &[EventRecord]) -> BTreeSet<&str> {
    universe
        .iter()
        .map(EventRecord::author_name)
        .filter(|name| !name.is_empty())
        .collect()
}

/// Reconstructs the sessions of every contributor in `universe`.
///
/// Contributors are enumerated from the whole universe, but only events
/// passing `selection` are folded. A contributor whose events were all
/// filtered out gets an empty session list.
pub fn sessions_by_author(
    universe: &[EventRecord],
    selection: &Selection,
    config: &SessionConfig,
) -> Result<BTreeMap<String, Vec<WorkSession>>, SessionError> {
    let selected = selection.select(universe);
    let mut by_author = BTreeMap::new();

    for author in contributors(universe) {
        let timestamps = selected
            .iter()
            .filter(|event| event.author_name() == author)
            .map(|event| event.timestamp());
        let sessions = reconstruct(timestamps, config)?;
        tracing::debug!(author, sessions = sessions.len(), "reconstructed sessions");
        by_author.insert(author.to_string(), sessions);
    }

    Ok(by_author)
}

/// Computes one summary per contributor, ordered by author name.
pub fn summarize(
    repo: &str,
    universe: &[EventRecord],
    selection: &Selection,
    config: &SessionConfig,
) -> Result<Vec<ContributorSummary>, SessionError> {
    let summaries = sessions_by_author(universe, selection, config)?
        .into_iter()
        .map(|(author, sessions)| ContributorSummary::from_sessions(repo, author, &sessions))
        .collect::<Vec<_>>();

    tracing::debug!(
        repo,
        events = universe.len(),
        contributors = summaries.len(),
        "summarized contributors"
    );
    Ok(summaries)
}
