//! Time-window and author allow-list selection over event records.

use chrono::{DateTime, Utc};

use crate::event::{EventError, EventRecord, parse_timestamp};

/// Which events take part in a report.
///
/// Both filters are optional and combine with AND. An empty allow-list lets
/// every author through.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    /// Inclusive lower bound.
    pub start: Option<DateTime<Utc>>,
    /// Inclusive upper bound.
    pub end: Option<DateTime<Utc>>,
    /// Substrings matched against author names.
    pub contributors: Vec<String>,
}

impl Selection {
    /// Builds a selection from bound strings in the event timestamp format.
    pub fn parse(
        start: Option<&str>,
        end: Option<&str>,
        contributors: Vec<String>,
    ) -> Result<Self, EventError> {
        Ok(Self {
            start: start.map(parse_timestamp).transpose()?,
            end: end.map(parse_timestamp).transpose()?,
            contributors,
        })
    }

    pub fn in_window(&self, timestamp: DateTime<Utc>) -> bool {
        self.start.is_none_or(|start| start <= timestamp)
            && self.end.is_none_or(|end| timestamp <= end)
    }

    pub fn allows_author(&self, event: &EventRecord) -> bool {
        self.contributors.is_empty() || event.is_author(&self.contributors)
    }

    pub fn matches(&self, event: &EventRecord) -> bool {
        self.in_window(event.timestamp()) && self.allows_author(event)
    }

    /// Returns the matching events in their original order.
    pub fn select<'a>(&self, events: &'a [EventRecord]) -> Vec<&'a EventRecord> {
        events.iter().filter(|event| self.matches(event)).collect()
    }
}
