//! Configuration loading and management.

use std::fmt;
use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use ts_core::session::{
    DEFAULT_BEFORE_COMMIT_BUFFER_MINUTES, DEFAULT_BETWEEN_COMMIT_BUFFER_MINUTES,
};
use ts_core::{SessionConfig, SessionError, TerminationPolicy};

/// Application configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    /// Web prefix stripped from repository URLs.
    pub github_url: String,

    /// Base URL of the GitHub REST API.
    pub api_url: String,

    /// API token. Also read from `GITHUB_TOKEN`.
    pub token: Option<String>,

    /// Minutes credited before the first event of a session.
    pub before_commit_buffer: i64,

    /// Largest gap in minutes between events of one session.
    pub between_commit_buffer: i64,

    pub termination: TerminationPolicy,

    /// Author-name substrings whose events are dropped before reporting.
    pub bot_names: Vec<String>,

    /// Directory the CSV report is written to.
    pub output_dir: PathBuf,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("github_url", &self.github_url)
            .field("api_url", &self.api_url)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("before_commit_buffer", &self.before_commit_buffer)
            .field("between_commit_buffer", &self.between_commit_buffer)
            .field("termination", &self.termination)
            .field("bot_names", &self.bot_names)
            .field("output_dir", &self.output_dir)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            github_url: ts_github::DEFAULT_WEB_URL.to_string(),
            api_url: ts_github::DEFAULT_API_URL.to_string(),
            token: None,
            before_commit_buffer: DEFAULT_BEFORE_COMMIT_BUFFER_MINUTES,
            between_commit_buffer: DEFAULT_BETWEEN_COMMIT_BUFFER_MINUTES,
            termination: TerminationPolicy::default(),
            bot_names: Vec::new(),
            output_dir: PathBuf::from("."),
        }
    }
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Load from default config location
        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        // Load from specified config file
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // The conventional token variable, below TS_* in precedence
        figment = figment.merge(
            Env::raw()
                .only(&["GITHUB_TOKEN"])
                .map(|_| "token".into()),
        );

        // Load from environment variables (TS_*)
        figment = figment.merge(Env::prefixed("TS_"));

        figment.extract()
    }

    /// Session buffers and termination rule from this config.
    pub fn session_config(&self) -> Result<SessionConfig, SessionError> {
        Ok(
            SessionConfig::from_minutes(self.before_commit_buffer, self.between_commit_buffer)?
                .with_termination(self.termination),
        )
    }
}

/// Returns the platform-specific config directory for timespent.
///
/// On Linux: `~/.config/timespent`
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("timespent"))
}
