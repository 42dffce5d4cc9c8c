//! Event loading and selection shared by the reporting commands.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use ts_core::{
    Category, EventRecord, EventRow, SessionConfig, Selection, TerminationPolicy,
};
use ts_github::{Client, normalize_repo};

use crate::Config;

/// Which repository to read and which of its events to count.
#[derive(Debug, Clone, Args)]
pub struct InputArgs {
    /// Repository as owner/name or a GitHub URL.
    #[arg(long)]
    pub repo: String,

    /// Only count authors whose name contains this value (repeatable).
    #[arg(long = "contributor", value_name = "NAME")]
    pub contributors: Vec<String>,

    /// Ignore commit comments.
    #[arg(long)]
    pub no_comments: bool,

    /// Ignore events before this time.
    #[arg(long, value_name = "YYYY-MM-DDTHH:MM:SSZ")]
    pub start: Option<String>,

    /// Ignore events after this time.
    #[arg(long, value_name = "YYYY-MM-DDTHH:MM:SSZ")]
    pub end: Option<String>,

    /// Minutes credited before the first event of a session.
    #[arg(long, value_name = "MINUTES")]
    pub before_buffer: Option<i64>,

    /// Largest gap in minutes between events of one session.
    #[arg(long, value_name = "MINUTES")]
    pub between_buffer: Option<i64>,

    /// Reproduce the older penultimate-event session split.
    #[arg(long)]
    pub legacy_termination: bool,

    /// Read events from a JSON Lines file instead of GitHub.
    #[arg(long, value_name = "PATH")]
    pub events: Option<PathBuf>,
}

/// Everything the core needs for one run.
#[derive(Debug)]
pub struct Input {
    pub repo: String,
    pub events: Vec<EventRecord>,
    pub selection: Selection,
    pub session_config: SessionConfig,
}

/// Resolves arguments against `config` and loads the event universe.
pub fn load(args: &InputArgs, config: &Config) -> Result<Input> {
    let effective = Config {
        before_commit_buffer: args.before_buffer.unwrap_or(config.before_commit_buffer),
        between_commit_buffer: args.between_buffer.unwrap_or(config.between_commit_buffer),
        termination: if args.legacy_termination {
            TerminationPolicy::Legacy
        } else {
            config.termination
        },
        ..config.clone()
    };
    let session_config = effective
        .session_config()
        .context("invalid session buffers")?;

    let selection = Selection::parse(
        args.start.as_deref(),
        args.end.as_deref(),
        args.contributors.clone(),
    )
    .context("invalid time window")?;

    let (repo, events) = match &args.events {
        Some(path) => {
            let repo = normalize_repo(&args.repo, &config.github_url).unwrap_or_else(|err| {
                tracing::debug!(error = %err, "using repository name as given");
                args.repo.trim().to_string()
            });
            let file = File::open(path)
                .with_context(|| format!("failed to open {}", path.display()))?;
            let events = parse_events(BufReader::new(file), !args.no_comments)
                .with_context(|| format!("failed to load events from {}", path.display()))?;
            (repo, events)
        }
        None => {
            let repo = normalize_repo(&args.repo, &config.github_url)?;
            let events = fetch_events(&repo, !args.no_comments, config)?;
            (repo, events)
        }
    };

    let events = drop_bots(events, &config.bot_names);
    tracing::debug!(%repo, events = events.len(), ?selection, ?session_config, "loaded input");

    Ok(Input {
        repo,
        events,
        selection,
        session_config,
    })
}

/// Reads JSON Lines event rows. Blank lines are skipped.
pub fn parse_events<R: BufRead>(reader: R, include_comments: bool) -> Result<Vec<EventRecord>> {
    let mut events = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line_no = index + 1;
        let line = line.with_context(|| format!("failed to read line {line_no}"))?;
        if line.trim().is_empty() {
            continue;
        }

        let row: EventRow = serde_json::from_str(&line)
            .with_context(|| format!("invalid event on line {line_no}"))?;
        if !include_comments && row.category == Category::Comment {
            continue;
        }
        let event = EventRecord::from_raw(&row)
            .with_context(|| format!("invalid event on line {line_no}"))?;
        events.push(event);
    }
    Ok(events)
}

fn fetch_events(repo: &str, include_comments: bool, config: &Config) -> Result<Vec<EventRecord>> {
    let client = Client::new(config.api_url.clone(), config.token.clone())
        .context("failed to create GitHub client")?;
    if !client.is_authenticated() {
        tracing::debug!("no GitHub token configured, using unauthenticated requests");
    }

    let runtime = tokio::runtime::Runtime::new().context("failed to initialize tokio runtime")?;
    let activity = runtime
        .block_on(client.fetch_activity(repo, include_comments))
        .with_context(|| format!("failed to fetch activity for {repo}"))?;

    activity
        .iter()
        .map(EventRecord::from_raw)
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("invalid activity from {repo}"))
}

fn drop_bots(mut events: Vec<EventRecord>, bot_names: &[String]) -> Vec<EventRecord> {
    if bot_names.is_empty() {
        return events;
    }
    let before = events.len();
    events.retain(|event| !event.is_author_bot(bot_names));
    let dropped = before - events.len();
    if dropped > 0 {
        tracing::warn!(dropped, "skipped events from bot authors");
    }
    events
}
