//! Normalized activity events.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::category::Category;

/// Timestamp pattern used by the hosting API and by every serialized record.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

#[derive(Debug, Error)]
pub enum EventError {
    #[error("malformed timestamp {value:?}: expected YYYY-MM-DDTHH:MM:SSZ")]
    MalformedTimestamp {
        value: String,
        #[source]
        source: chrono::ParseError,
    },
}

/// Parses a `YYYY-MM-DDTHH:MM:SSZ` string into a UTC point in time.
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, EventError> {
    NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|source| EventError::MalformedTimestamp {
            value: value.to_string(),
            source,
        })
}

/// Formats a timestamp with [`TIMESTAMP_FORMAT`].
pub fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.format(TIMESTAMP_FORMAT).to_string()
}

/// A fetched activity item that can be normalized into an [`EventRecord`].
///
/// Implemented by the hosting client's commit and comment payloads, and by
/// offline event-file rows.
pub trait RawActivity {
    /// Author display name. Empty when the source had none.
    fn author_name(&self) -> &str;

    /// Author email. Empty when the source had none.
    fn author_email(&self) -> &str;

    /// Timestamp string in [`TIMESTAMP_FORMAT`].
    fn date_time(&self) -> &str;

    fn category(&self) -> Category;
}

/// One normalized activity: a commit, a comment, or another tagged item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRecord {
    author_name: String,
    author_email: String,
    timestamp: DateTime<Utc>,
    category: Category,
}

impl EventRecord {
    /// Builds a record, failing if `date_time` does not match [`TIMESTAMP_FORMAT`].
    pub fn new(
        author_name: impl Into<String>,
        author_email: impl Into<String>,
        date_time: &str,
        category: Category,
    ) -> Result<Self, EventError> {
        Ok(Self {
            author_name: author_name.into(),
            author_email: author_email.into(),
            timestamp: parse_timestamp(date_time)?,
            category,
        })
    }

    pub fn from_raw<R: RawActivity + ?Sized>(raw: &R) -> Result<Self, EventError> {
        Self::new(
            raw.author_name(),
            raw.author_email(),
            raw.date_time(),
            raw.category(),
        )
    }

    pub fn author_name(&self) -> &str {
        &self.author_name
    }

    pub fn author_email(&self) -> &str {
        &self.author_email
    }

    pub const fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub const fn category(&self) -> Category {
        self.category
    }

    /// True if any of `bot_names` occurs inside the author name.
    pub fn is_author_bot<S: AsRef<str>>(&self, bot_names: &[S]) -> bool {
        self.is_author(bot_names)
    }

    /// True if any of `names` occurs inside the author name.
    ///
    /// Matching is by substring, so `alice` matches `alice.bot`.
    pub fn is_author<S: AsRef<str>>(&self, names: &[S]) -> bool {
        names
            .iter()
            .any(|name| self.author_name.contains(name.as_ref()))
    }

    /// Serializable view of this record.
    pub fn to_record(&self) -> EventRow {
        EventRow {
            author_name: self.author_name.clone(),
            author_email: self.author_email.clone(),
            date_time: format_timestamp(self.timestamp),
            category: self.category,
        }
    }
}

/// Flat serialized form of an [`EventRecord`].
///
/// Also the row format of offline event files, so missing author fields
/// default to empty strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRow {
    #[serde(default)]
    pub author_name: String,
    #[serde(default)]
    pub author_email: String,
    pub date_time: String,
    #[serde(default, alias = "type")]
    pub category: Category,
}

impl RawActivity for EventRow {
    fn author_name(&self) -> &str {
        &self.author_name
    }

    fn author_email(&self) -> &str {
        &self.author_email
    }

    fn date_time(&self) -> &str {
        &self.date_time
    }

    fn category(&self) -> Category {
        self.category
    }
}
