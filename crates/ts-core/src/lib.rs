//! Core domain logic for timespent.
//!
//! This crate contains the fundamental types and logic for:
//! - Events: normalized commit/comment activity with strict timestamps
//! - Selection: time-window and author allow-list filtering
//! - Sessions: reconstructing work sessions from activity timestamps
//! - Aggregation: distinct days worked and time spent per contributor

mod aggregate;
pub mod category;
pub mod event;
pub mod select;
pub mod session;

pub use aggregate::{ContributorSummary, contributors, sessions_by_author, summarize};
pub use category::{Category, UnknownCategory};
pub use event::{EventError, EventRecord, EventRow, RawActivity, format_timestamp, parse_timestamp};
pub use select::Selection;
pub use session::{
    GapExceeded, SessionConfig, SessionError, SessionRow, TerminationPolicy, WorkSession,
    reconstruct,
};
