//! Report command: days worked and time spent per contributor.
//!
//! Writes a timestamped CSV artifact and prints either a table or JSON.

use std::fmt::Write as _;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use clap::Args;
use serde::Serialize;
use ts_core::{ContributorSummary, summarize};

use crate::Config;
use crate::commands::input::{self, InputArgs};

const AUTHOR_WIDTH: usize = 24;
const DAYS_WIDTH: usize = 6;
const TIME_WIDTH: usize = 12;

#[derive(Debug, Args)]
pub struct ReportArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Directory for the CSV report (overrides config).
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Print JSON instead of a table.
    #[arg(long)]
    pub json: bool,

    /// Do not write the CSV report.
    #[arg(long)]
    pub no_write: bool,
}

pub fn run<W: Write>(writer: &mut W, args: &ReportArgs, config: &Config) -> Result<()> {
    let generated_at = Utc::now();
    let input = input::load(&args.input, config)?;
    let summaries = summarize(
        &input.repo,
        &input.events,
        &input.selection,
        &input.session_config,
    )?;

    let written = if args.no_write {
        None
    } else {
        let dir = args
            .output_dir
            .as_deref()
            .unwrap_or(config.output_dir.as_path());
        let path = write_csv(dir, generated_at, &summaries)?;
        tracing::info!(path = %path.display(), "wrote report");
        Some(path)
    };

    if args.json {
        writeln!(writer, "{}", format_report_json(&summaries)?)?;
    } else {
        write!(writer, "{}", format_report(&input.repo, &summaries))?;
        if let Some(path) = written {
            writeln!(writer, "\nReport written to {}", path.display())?;
        }
    }
    Ok(())
}

// ========== Duration Formatting ==========

/// Formats a duration as `H:MM:SS` with unbounded hours.
/// Negative durations are treated as zero.
pub fn format_time_spent(duration: Duration) -> String {
    let total = duration.num_seconds().max(0);
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;
    format!("{hours}:{minutes:02}:{seconds:02}")
}

// ========== Human-readable Output ==========

fn table_row(author: &str, days: &str, time: &str) -> String {
    format!("{author:<AUTHOR_WIDTH$}{days:>DAYS_WIDTH$}{time:>TIME_WIDTH$}")
}

/// Formats the human-readable report.
pub fn format_report(repo: &str, summaries: &[ContributorSummary]) -> String {
    let mut output = String::new();
    writeln!(output, "TIME SPENT: {repo}").unwrap();
    writeln!(output).unwrap();

    if summaries.is_empty() {
        writeln!(output, "No contributors found.").unwrap();
        return output;
    }

    writeln!(output, "{}", table_row("AUTHOR", "DAYS", "TIME SPENT")).unwrap();
    for summary in summaries {
        let days = summary.days_worked.to_string();
        let time = format_time_spent(summary.time_spent);
        writeln!(output, "{}", table_row(&summary.author, &days, &time)).unwrap();
    }

    // Days are summed per author, so the total counts person-days.
    let person_days: usize = summaries.iter().map(|s| s.days_worked).sum();
    let total_time = summaries
        .iter()
        .fold(Duration::zero(), |total, s| total + s.time_spent);
    writeln!(
        output,
        "{}",
        "─".repeat(AUTHOR_WIDTH + DAYS_WIDTH + TIME_WIDTH)
    )
    .unwrap();
    writeln!(
        output,
        "{}",
        table_row(
            "TOTAL (person-days)",
            &person_days.to_string(),
            &format_time_spent(total_time)
        )
    )
    .unwrap();

    output
}

// ========== JSON Output ==========

#[derive(Debug, Serialize)]
pub struct JsonSummary<'a> {
    pub repo: &'a str,
    pub author: &'a str,
    pub days_worked: usize,
    pub time_spent: String,
    pub time_spent_seconds: i64,
}

/// Formats summaries as pretty JSON.
pub fn format_report_json(summaries: &[ContributorSummary]) -> Result<String> {
    let rows: Vec<_> = summaries
        .iter()
        .map(|s| JsonSummary {
            repo: &s.repo,
            author: &s.author,
            days_worked: s.days_worked,
            time_spent: format_time_spent(s.time_spent),
            time_spent_seconds: s.time_spent.num_seconds(),
        })
        .collect();
    Ok(serde_json::to_string_pretty(&rows)?)
}

// ========== CSV Artifact ==========

#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    repo: &'a str,
    author: &'a str,
    days_worked: usize,
    time_spent: String,
}

/// File name of the report generated at `generated_at`.
pub fn report_file_name(generated_at: DateTime<Utc>) -> String {
    format!("output-{}.csv", generated_at.format("%Y%m%dT%H%M%SZ"))
}

/// Writes summaries as CSV with a header row.
pub fn write_csv_to<W: Write>(writer: W, summaries: &[ContributorSummary]) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    if summaries.is_empty() {
        csv.write_record(["repo", "author", "days_worked", "time_spent"])?;
    }
    for summary in summaries {
        csv.serialize(CsvRow {
            repo: &summary.repo,
            author: &summary.author,
            days_worked: summary.days_worked,
            time_spent: format_time_spent(summary.time_spent),
        })?;
    }
    csv.flush()?;
    Ok(())
}

/// Writes the CSV report into `dir` and returns its path.
pub fn write_csv(
    dir: &Path,
    generated_at: DateTime<Utc>,
    summaries: &[ContributorSummary],
) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create {}", dir.display()))?;
    let path = dir.join(report_file_name(generated_at));
    let file = std::fs::File::create(&path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    write_csv_to(file, summaries).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path)
}
