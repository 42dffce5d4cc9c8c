//! Sessions command: lists each contributor's reconstructed work sessions.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::io::Write;

use anyhow::Result;
use clap::Args;
use ts_core::{SessionRow, WorkSession, sessions_by_author};

use crate::Config;
use crate::commands::input::{self, InputArgs};

#[derive(Debug, Args)]
pub struct SessionsArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Print JSON instead of a listing.
    #[arg(long)]
    pub json: bool,
}

pub fn run<W: Write>(writer: &mut W, args: &SessionsArgs, config: &Config) -> Result<()> {
    let input = input::load(&args.input, config)?;
    let sessions = sessions_by_author(&input.events, &input.selection, &input.session_config)?;

    if args.json {
        writeln!(writer, "{}", format_sessions_json(&sessions)?)?;
    } else {
        write!(writer, "{}", format_sessions(&input.repo, &sessions))?;
    }
    Ok(())
}

/// Formats the human-readable session listing.
pub fn format_sessions(repo: &str, sessions: &BTreeMap<String, Vec<WorkSession>>) -> String {
    let mut output = String::new();
    writeln!(output, "SESSIONS: {repo}").unwrap();

    for (author, author_sessions) in sessions {
        writeln!(output).unwrap();
        writeln!(output, "{author}").unwrap();
        if author_sessions.is_empty() {
            writeln!(output, "  (no sessions)").unwrap();
            continue;
        }
        for session in author_sessions {
            let SessionRow {
                date,
                start_time,
                stop_time,
                hours,
            } = session.to_record();
            writeln!(output, "  {date}  {start_time} -> {stop_time}  {hours:.2}h").unwrap();
        }
    }

    output
}

/// Formats sessions as pretty JSON keyed by author.
pub fn format_sessions_json(sessions: &BTreeMap<String, Vec<WorkSession>>) -> Result<String> {
    let rows: BTreeMap<&str, Vec<SessionRow>> = sessions
        .iter()
        .map(|(author, list)| (author.as_str(), list.iter().map(WorkSession::to_record).collect()))
        .collect();
    Ok(serde_json::to_string_pretty(&rows)?)
}
