//! Work-session reconstruction.
//!
//! Turns one author's activity timestamps into contiguous work sessions.
//!
//! # Algorithm Summary
//!
//! 1. Sort the author's timestamps ascending (stable).
//! 2. The first timestamp opens a session whose start is pulled back by the
//!    before-commit buffer.
//! 3. Each later timestamp extends the open session, unless the gap since the
//!    previous folded timestamp exceeds the between-commit buffer. In that case
//!    the session closes and a new one opens at the overflowing timestamp.
//! 4. Under [`TerminationPolicy::Legacy`] the penultimate timestamp closes the
//!    open session and becomes a zero-width session of its own.
//! 5. Whatever session is still open at the end is closed and emitted.

use std::fmt;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::event::format_timestamp;

pub const DEFAULT_BEFORE_COMMIT_BUFFER_MINUTES: i64 = 10;
pub const DEFAULT_BETWEEN_COMMIT_BUFFER_MINUTES: i64 = 15;
/// Upper bound for either buffer: one year.
pub const MAX_BUFFER_MINUTES: i64 = 365 * 24 * 60;

const SECONDS_PER_HOUR: f64 = 3600.0;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The session start was already fixed; reconstruction bookkeeping is broken.
    #[error("session start time already set")]
    StartAlreadySet,
    /// A session was closed before any timestamp opened it.
    #[error("session was never started")]
    NotStarted,
    #[error("{field} must be between 1 and {max} minutes, got {minutes}", max = MAX_BUFFER_MINUTES)]
    InvalidBuffer { field: &'static str, minutes: i64 },
}

/// Extending a session would leave a gap wider than the between-commit buffer.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("{attempted} is too long after {previous}")]
pub struct GapExceeded {
    pub previous: DateTime<Utc>,
    pub attempted: DateTime<Utc>,
}

/// How the last two timestamps of an author's stream are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationPolicy {
    /// Every timestamp is folded by the ordinary gap rule.
    #[default]
    FoldAll,
    /// The penultimate timestamp becomes its own zero-width session and the
    /// final timestamp seeds a fresh session, matching reports produced by the
    /// earlier tooling.
    Legacy,
}

impl TerminationPolicy {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::FoldAll => "fold_all",
            Self::Legacy => "legacy",
        }
    }
}

impl fmt::Display for TerminationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Buffers and termination rule for reconstruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// Warm-up time credited before a session's first timestamp.
    /// Default: 10 minutes.
    pub before_commit_buffer: Duration,

    /// Largest gap between folded timestamps that keeps a session open.
    /// Default: 15 minutes.
    pub between_commit_buffer: Duration,

    pub termination: TerminationPolicy,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            before_commit_buffer: Duration::minutes(DEFAULT_BEFORE_COMMIT_BUFFER_MINUTES),
            between_commit_buffer: Duration::minutes(DEFAULT_BETWEEN_COMMIT_BUFFER_MINUTES),
            termination: TerminationPolicy::default(),
        }
    }
}

impl SessionConfig {
    /// Builds a config from buffer sizes in minutes.
    /// Both must be positive and at most [`MAX_BUFFER_MINUTES`].
    pub fn from_minutes(before: i64, between: i64) -> Result<Self, SessionError> {
        Ok(Self {
            before_commit_buffer: positive_minutes("before_commit_buffer", before)?,
            between_commit_buffer: positive_minutes("between_commit_buffer", between)?,
            termination: TerminationPolicy::default(),
        })
    }

    #[must_use]
    pub const fn with_termination(mut self, termination: TerminationPolicy) -> Self {
        self.termination = termination;
        self
    }
}

fn positive_minutes(field: &'static str, minutes: i64) -> Result<Duration, SessionError> {
    if !(1..=MAX_BUFFER_MINUTES).contains(&minutes) {
        return Err(SessionError::InvalidBuffer { field, minutes });
    }
    Ok(Duration::minutes(minutes))
}

/// A closed work session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkSession {
    date: NaiveDate,
    start_time: DateTime<Utc>,
    stop_time: DateTime<Utc>,
    before_commit_buffer: Duration,
    between_commit_buffer: Duration,
}

impl WorkSession {
    /// A one-timestamp session with start and stop both pinned to `at`.
    pub fn degenerate(at: DateTime<Utc>, config: &SessionConfig) -> Self {
        Self {
            date: at.date_naive(),
            start_time: at,
            stop_time: at,
            before_commit_buffer: config.before_commit_buffer,
            between_commit_buffer: config.between_commit_buffer,
        }
    }

    /// Calendar day of the session's first timestamp.
    pub const fn date(&self) -> NaiveDate {
        self.date
    }

    pub const fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    pub const fn stop_time(&self) -> DateTime<Utc> {
        self.stop_time
    }

    /// Time credited for this session.
    ///
    /// The start-to-stop window when it is longer than the between-commit
    /// buffer, otherwise the before-commit buffer.
    pub fn duration(&self) -> Duration {
        let window = self.stop_time - self.start_time;
        if window > self.between_commit_buffer {
            window
        } else {
            self.before_commit_buffer
        }
    }

    #[allow(clippy::cast_precision_loss)]
    pub fn hours(&self) -> f64 {
        let hours = self.duration().num_seconds() as f64 / SECONDS_PER_HOUR;
        (hours * 100.0).round() / 100.0
    }

    /// Serializable view of this session.
    pub fn to_record(&self) -> SessionRow {
        SessionRow {
            date: self.date.format("%Y-%m-%d").to_string(),
            start_time: format_timestamp(self.start_time),
            stop_time: format_timestamp(self.stop_time),
            hours: self.hours(),
        }
    }
}

/// Flat serialized form of a [`WorkSession`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionRow {
    pub date: String,
    pub start_time: String,
    pub stop_time: String,
    pub hours: f64,
}

/// A session under construction.
#[derive(Debug, Clone)]
pub struct SessionBuilder {
    config: SessionConfig,
    date: Option<NaiveDate>,
    seed: Option<DateTime<Utc>>,
    start_time: Option<DateTime<Utc>>,
    stop_time: Option<DateTime<Utc>>,
}

impl SessionBuilder {
    pub const fn new(config: SessionConfig) -> Self {
        Self {
            config,
            date: None,
            seed: None,
            start_time: None,
            stop_time: None,
        }
    }

    /// Opens the session at `first`. May only happen once per builder.
    pub fn begin(&mut self, first: DateTime<Utc>) -> Result<(), SessionError> {
        if self.start_time.is_some() {
            return Err(SessionError::StartAlreadySet);
        }
        self.date = Some(first.date_naive());
        self.seed = Some(first);
        self.start_time = Some(first - self.config.before_commit_buffer);
        Ok(())
    }

    pub const fn start_time(&self) -> Option<DateTime<Utc>> {
        self.start_time
    }

    pub const fn stop_time(&self) -> Option<DateTime<Utc>> {
        self.stop_time
    }

    /// Moves the stop time forward to `at`.
    ///
    /// The gap is measured from the last folded timestamp, or from the
    /// buffered start when nothing has been folded yet. When the gap exceeds
    /// the between-commit buffer the stop time is pinned to the last folded
    /// timestamp (the seed if there is none) and the session must be closed.
    /// An unopened builder is opened at `at` instead.
    pub fn try_extend(&mut self, at: DateTime<Utc>) -> Result<(), GapExceeded> {
        let Some(previous) = self.stop_time.or(self.start_time) else {
            self.date = Some(at.date_naive());
            self.seed = Some(at);
            self.start_time = Some(at - self.config.before_commit_buffer);
            return Ok(());
        };

        if at - previous > self.config.between_commit_buffer {
            self.stop_time = self.stop_time.or(self.seed);
            return Err(GapExceeded {
                previous,
                attempted: at,
            });
        }

        self.stop_time = Some(at);
        Ok(())
    }

    /// Finalizes the session. A session with nothing folded stops at its seed.
    pub fn close(self) -> Result<WorkSession, SessionError> {
        let (Some(date), Some(seed), Some(start_time)) = (self.date, self.seed, self.start_time)
        else {
            return Err(SessionError::NotStarted);
        };

        Ok(WorkSession {
            date,
            start_time,
            stop_time: self.stop_time.unwrap_or(seed),
            before_commit_buffer: self.config.before_commit_buffer,
            between_commit_buffer: self.config.between_commit_buffer,
        })
    }
}

/// Fold state: the sessions closed so far plus the one still open.
#[derive(Debug, Clone, Default)]
pub struct Reconstruction {
    closed: Vec<WorkSession>,
    current: Option<SessionBuilder>,
}

impl Reconstruction {
    pub fn closed(&self) -> &[WorkSession] {
        &self.closed
    }

    pub const fn current(&self) -> Option<&SessionBuilder> {
        self.current.as_ref()
    }

    /// Folds one timestamp by the ordinary gap rule.
    pub fn fold(mut self, at: DateTime<Utc>, config: &SessionConfig) -> Result<Self, SessionError> {
        let Some(mut current) = self.current.take() else {
            self.current = Some(open(at, config)?);
            return Ok(self);
        };

        match current.try_extend(at) {
            Ok(()) => self.current = Some(current),
            Err(gap) => {
                tracing::trace!(previous = %gap.previous, attempted = %gap.attempted, "gap exceeded, closing session");
                self.closed.push(current.close()?);
                self.current = Some(open(at, config)?);
            }
        }
        Ok(self)
    }

    /// Closes the open session and emits a zero-width session at `at`.
    pub fn split_degenerate(
        mut self,
        at: DateTime<Utc>,
        config: &SessionConfig,
    ) -> Result<Self, SessionError> {
        if let Some(current) = self.current.take() {
            self.closed.push(current.close()?);
        }
        self.closed.push(WorkSession::degenerate(at, config));
        Ok(self)
    }

    pub fn finish(mut self) -> Result<Vec<WorkSession>, SessionError> {
        if let Some(current) = self.current.take() {
            self.closed.push(current.close()?);
        }
        Ok(self.closed)
    }
}

fn open(at: DateTime<Utc>, config: &SessionConfig) -> Result<SessionBuilder, SessionError> {
    let mut builder = SessionBuilder::new(*config);
    builder.begin(at)?;
    Ok(builder)
}

/// Reconstructs the work sessions of one author.
///
/// `timestamps` need not be sorted. An empty input yields no sessions.
pub fn reconstruct<I>(timestamps: I, config: &SessionConfig) -> Result<Vec<WorkSession>, SessionError>
where
    I: IntoIterator<Item = DateTime<Utc>>,
{
    let mut sorted: Vec<DateTime<Utc>> = timestamps.into_iter().collect();
    sorted.sort();

    let penultimate = match config.termination {
        TerminationPolicy::FoldAll => None,
        TerminationPolicy::Legacy => sorted.len().checked_sub(2),
    };

    sorted
        .iter()
        .enumerate()
        .try_fold(Reconstruction::default(), |state, (index, &at)| {
            if Some(index) == penultimate {
                state.split_degenerate(at, config)
            } else {
                state.fold(at, config)
            }
        })?
        .finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::parse_timestamp;

    fn ts(value: &str) -> DateTime<Utc> {
        parse_timestamp(value).unwrap()
    }

    fn at(hhmm: &str) -> DateTime<Utc> {
        ts(&format!("2024-01-01T{hhmm}:00Z"))
    }

    fn legacy() -> SessionConfig {
        SessionConfig::default().with_termination(TerminationPolicy::Legacy)
    }

    fn spans(sessions: &[WorkSession]) -> Vec<(String, String, i64)> {
        sessions
            .iter()
            .map(|s| {
                (
                    s.start_time().format("%H:%M").to_string(),
                    s.stop_time().format("%H:%M").to_string(),
                    s.duration().num_minutes(),
                )
            })
            .collect()
    }

    fn span(start: &str, stop: &str, minutes: i64) -> (String, String, i64) {
        (start.to_string(), stop.to_string(), minutes)
    }

    // ========== Builder ==========

    #[test]
    fn test_begin_pulls_start_back_by_before_buffer() {
        let mut builder = SessionBuilder::new(SessionConfig::default());
        builder.begin(at("09:00")).unwrap();
        assert_eq!(builder.start_time(), Some(at("08:50")));
        assert_eq!(builder.stop_time(), None);
    }

    #[test]
    fn test_begin_twice_is_a_contract_violation() {
        let mut builder = SessionBuilder::new(SessionConfig::default());
        builder.begin(at("09:00")).unwrap();
        assert_eq!(builder.begin(at("09:01")), Err(SessionError::StartAlreadySet));
        assert_eq!(builder.start_time(), Some(at("08:50")));
    }

    #[test]
    fn test_first_extension_is_measured_from_buffered_start() {
        let mut builder = SessionBuilder::new(SessionConfig::default());
        builder.begin(at("09:00")).unwrap();

        // 09:06 is 16 minutes after the buffered start of 08:50.
        let err = builder.try_extend(at("09:06")).unwrap_err();
        assert_eq!(err.previous, at("08:50"));
        assert_eq!(err.attempted, at("09:06"));
        assert_eq!(builder.stop_time(), Some(at("09:00")));
    }

    #[test]
    fn test_gap_exceeded_pins_stop_to_previous_timestamp() {
        let mut builder = SessionBuilder::new(SessionConfig::default());
        builder.begin(at("09:00")).unwrap();
        builder.try_extend(at("09:05")).unwrap();
        builder.try_extend(at("09:20")).unwrap();

        assert!(builder.try_extend(at("09:36")).is_err());
        assert_eq!(builder.stop_time(), Some(at("09:20")));
    }

    #[test]
    fn test_try_extend_on_unopened_builder_opens_it() {
        let mut builder = SessionBuilder::new(SessionConfig::default());
        builder.try_extend(at("09:00")).unwrap();
        assert_eq!(builder.start_time(), Some(at("08:50")));
        assert_eq!(builder.begin(at("09:00")), Err(SessionError::StartAlreadySet));
    }

    #[test]
    fn test_closing_unopened_builder_fails() {
        let builder = SessionBuilder::new(SessionConfig::default());
        assert_eq!(builder.close(), Err(SessionError::NotStarted));
    }

    #[test]
    fn test_config_rejects_non_positive_buffers() {
        assert_eq!(
            SessionConfig::from_minutes(0, 15),
            Err(SessionError::InvalidBuffer {
                field: "before_commit_buffer",
                minutes: 0
            })
        );
        assert!(SessionConfig::from_minutes(10, -1).is_err());
        assert_eq!(
            SessionConfig::from_minutes(10, 15).unwrap(),
            SessionConfig::default()
        );
    }

    #[test]
    fn test_config_rejects_buffers_longer_than_a_year() {
        assert_eq!(
            SessionConfig::from_minutes(1_000_000_000_000, 15),
            Err(SessionError::InvalidBuffer {
                field: "before_commit_buffer",
                minutes: 1_000_000_000_000
            })
        );
        assert!(SessionConfig::from_minutes(10, MAX_BUFFER_MINUTES + 1).is_err());

        let widest = SessionConfig::from_minutes(MAX_BUFFER_MINUTES, MAX_BUFFER_MINUTES).unwrap();
        let sessions = reconstruct([ts("0001-01-01T00:00:00Z"), at("09:00")], &widest).unwrap();
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].duration(), Duration::minutes(MAX_BUFFER_MINUTES));
    }

    // ========== Session duration ==========

    #[test]
    fn test_duration_floors_to_before_buffer_when_window_is_short() {
        let mut session = SessionBuilder::new(SessionConfig::default());
        session.begin(at("09:00")).unwrap();
        session.try_extend(at("09:05")).unwrap();
        let session = session.close().unwrap();
        // Window 08:50..09:05 is exactly 15 minutes: not above the buffer.
        assert_eq!(session.duration(), Duration::minutes(10));
        assert!((session.hours() - 0.17).abs() < f64::EPSILON);
    }

    #[test]
    fn test_degenerate_session_is_credited_the_before_buffer() {
        let session = WorkSession::degenerate(at("09:00"), &SessionConfig::default());
        assert_eq!(session.start_time(), session.stop_time());
        assert_eq!(session.duration(), Duration::minutes(10));
    }

    #[test]
    fn test_to_record_serializes_named_fields() {
        let sessions = reconstruct([at("09:00"), at("09:05"), at("09:20")], &SessionConfig::default())
            .unwrap();
        let json = serde_json::to_string(&sessions[0].to_record()).unwrap();
        assert_eq!(
            json,
            r#"{"date":"2024-01-01","start_time":"2024-01-01T08:50:00Z","stop_time":"2024-01-01T09:20:00Z","hours":0.5}"#
        );
    }

    // ========== Reconstruction (fold all) ==========

    #[test]
    fn test_no_timestamps_yield_no_sessions() {
        let sessions = reconstruct(Vec::new(), &SessionConfig::default()).unwrap();
        assert!(sessions.is_empty());
    }

    #[test]
    fn test_single_timestamp_yields_one_floored_session() {
        let t = ts("2024-05-06T23:59:00Z");
        let sessions = reconstruct([t], &SessionConfig::default()).unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].date(), t.date_naive());
        assert_eq!(sessions[0].duration(), Duration::minutes(10));
    }

    #[test]
    fn test_two_timestamps_five_minutes_apart_share_a_session() {
        let sessions =
            reconstruct([at("09:00"), at("09:05")], &SessionConfig::default()).unwrap();
        assert_eq!(spans(&sessions), vec![span("08:50", "09:05", 10)]);
    }

    #[test]
    fn test_two_timestamps_twenty_minutes_apart_split() {
        let sessions =
            reconstruct([at("09:00"), at("09:20")], &SessionConfig::default()).unwrap();
        assert_eq!(
            spans(&sessions),
            vec![span("08:50", "09:00", 10), span("09:10", "09:20", 10)]
        );
    }

    #[test]
    fn test_three_close_timestamps_fold_into_one_session() {
        let sessions = reconstruct(
            [at("09:00"), at("09:05"), at("09:08")],
            &SessionConfig::default(),
        )
        .unwrap();
        // 08:50..09:08 is 18 minutes, above the 15 minute buffer.
        assert_eq!(spans(&sessions), vec![span("08:50", "09:08", 18)]);
    }

    #[test]
    fn test_long_chain_credits_whole_window() {
        let sessions = reconstruct(
            [at("09:00"), at("09:05"), at("09:15"), at("09:30"), at("11:00")],
            &SessionConfig::default(),
        )
        .unwrap();
        assert_eq!(
            spans(&sessions),
            vec![span("08:50", "09:30", 40), span("10:50", "11:00", 10)]
        );
    }

    #[test]
    fn test_unsorted_input_is_sorted_first() {
        let sessions = reconstruct(
            [at("09:08"), at("09:00"), at("09:05")],
            &SessionConfig::default(),
        )
        .unwrap();
        assert_eq!(spans(&sessions), vec![span("08:50", "09:08", 18)]);
    }

    #[test]
    fn test_custom_buffers_change_split_points() {
        let config = SessionConfig::from_minutes(5, 30).unwrap();
        let sessions = reconstruct([at("09:00"), at("09:20"), at("09:45")], &config).unwrap();
        assert_eq!(spans(&sessions), vec![span("08:55", "09:45", 50)]);
    }

    // ========== Reconstruction (legacy termination) ==========

    #[test]
    fn test_legacy_single_timestamp_matches_fold_all() {
        let sessions = reconstruct([at("09:00")], &legacy()).unwrap();
        assert_eq!(spans(&sessions), vec![span("08:50", "09:00", 10)]);
    }

    #[test]
    fn test_legacy_two_timestamps_split_into_degenerate_and_fresh_session() {
        let sessions = reconstruct([at("09:00"), at("09:05")], &legacy()).unwrap();
        assert_eq!(
            spans(&sessions),
            vec![span("09:00", "09:00", 10), span("08:55", "09:05", 10)]
        );
    }

    #[test]
    fn test_legacy_twenty_minute_gap() {
        let sessions = reconstruct([at("09:00"), at("09:20")], &legacy()).unwrap();
        assert_eq!(
            spans(&sessions),
            vec![span("09:00", "09:00", 10), span("09:10", "09:20", 10)]
        );
    }

    #[test]
    fn test_legacy_three_timestamps_produce_three_sessions() {
        let sessions = reconstruct([at("09:00"), at("09:05"), at("09:08")], &legacy()).unwrap();
        assert_eq!(
            spans(&sessions),
            vec![
                span("08:50", "09:00", 10),
                span("09:05", "09:05", 10),
                span("08:58", "09:08", 10),
            ]
        );
    }

    #[test]
    fn test_legacy_keeps_folding_before_the_penultimate_timestamp() {
        let sessions = reconstruct(
            [at("09:00"), at("09:05"), at("09:15"), at("09:30"), at("09:40")],
            &legacy(),
        )
        .unwrap();
        assert_eq!(
            spans(&sessions),
            vec![
                span("08:50", "09:15", 25),
                span("09:30", "09:30", 10),
                span("09:30", "09:40", 10),
            ]
        );
    }

    // ========== Fold state ==========

    #[test]
    fn test_fold_exposes_closed_and_open_sessions() {
        let config = SessionConfig::default();
        let state = Reconstruction::default()
            .fold(at("09:00"), &config)
            .unwrap()
            .fold(at("10:00"), &config)
            .unwrap();

        assert_eq!(state.closed().len(), 1);
        assert_eq!(
            state.current().and_then(SessionBuilder::start_time),
            Some(at("09:50"))
        );
    }
}
