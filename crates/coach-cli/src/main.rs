//! # coach
//!
//! Command-line front end: extracts rules from a repository's instruction
//! files, scans recorded sessions for misalignments and assembles coaching
//! context. Results go to stdout; bookkeeping goes to stderr via `tracing`.

#![deny(unsafe_code)]

mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use coach_core::MisalignmentStatus;
use coach_detect::GateSource;
use coach_settings::{CoachSettings, SettingsError};

/// Session coach.
#[derive(Parser, Debug)]
#[command(name = "coach", about = "Check agent sessions against repository rules")]
struct Cli {
    /// Log filter (overrides settings; `RUST_LOG` wins over both).
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Discover instruction files under a root and print their rules.
    Rules {
        /// Repository root.
        root: PathBuf,
        /// Print rules as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Check whether a file repeats an already indexed instruction file.
    CheckDuplicate {
        /// Repository root.
        root: PathBuf,
        /// Candidate file.
        file: PathBuf,
    },
    /// Detect misalignments in a recorded session.
    Detect {
        /// Repository root.
        root: PathBuf,
        /// Session snapshot JSON.
        #[arg(long)]
        session: PathBuf,
        /// Previously detected records JSON.
        #[arg(long)]
        existing: Option<PathBuf>,
    },
    /// Assemble the coaching prompt for a session.
    Context {
        /// Repository root.
        root: PathBuf,
        /// Session snapshot JSON.
        #[arg(long)]
        session: PathBuf,
        /// Previously detected records JSON.
        #[arg(long)]
        existing: Option<PathBuf>,
        /// Chat history JSON.
        #[arg(long)]
        history: Option<PathBuf>,
        /// Coaching question; `#N` references pull in event details.
        #[arg(long, default_value = "")]
        prompt: String,
        /// Print the full assembly result as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Gate content before it is sent to the coach.
    Gate {
        /// Repository root.
        root: PathBuf,
        /// Content to check.
        #[arg(long)]
        content: String,
        /// Where the content came from.
        #[arg(long, value_enum, default_value_t = SourceArg::Manual)]
        source: SourceArg,
        /// Scan this session instead of the content alone.
        #[arg(long)]
        session: Option<PathBuf>,
    },
    /// Move a stored misalignment to a new review status.
    Status {
        /// Records JSON, rewritten in place.
        records: PathBuf,
        /// Misalignment ID.
        id: String,
        /// Target status: open, acknowledged or dismissed.
        status: MisalignmentStatus,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum SourceArg {
    Timeline,
    Session,
    Manual,
}

impl From<SourceArg> for GateSource {
    fn from(arg: SourceArg) -> Self {
        match arg {
            SourceArg::Timeline => Self::Timeline,
            SourceArg::Session => Self::Session,
            SourceArg::Manual => Self::Manual,
        }
    }
}

/// Settings to run with, plus the load failure to report once logging is up.
fn settings_or_defaults(
    loaded: coach_settings::Result<CoachSettings>,
) -> (CoachSettings, Option<SettingsError>) {
    match loaded {
        Ok(settings) => (settings, None),
        Err(error) => (CoachSettings::default(), Some(error)),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let (settings, load_error) = settings_or_defaults(coach_settings::load_settings());
    let level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| settings.logging.level.clone());
    if settings.logging.json {
        coach_core::logging::init_json_subscriber(&level);
    } else {
        coach_core::logging::init_subscriber(&level);
    }
    if let Some(error) = load_error {
        tracing::warn!(%error, "settings file ignored, using defaults");
    }
    if coach_settings::init_settings(settings).is_err() {
        tracing::debug!("settings already initialized");
    }

    match cli.command {
        Command::Rules { root, json } => commands::rules(&root, json),
        Command::CheckDuplicate { root, file } => commands::check_duplicate(&root, &file),
        Command::Detect {
            root,
            session,
            existing,
        } => commands::detect(&root, &session, existing.as_deref()),
        Command::Context {
            root,
            session,
            existing,
            history,
            prompt,
            json,
        } => commands::context(&commands::ContextArgs {
            root: &root,
            session: &session,
            existing: existing.as_deref(),
            history: history.as_deref(),
            prompt: &prompt,
            json,
        }),
        Command::Gate {
            root,
            content,
            source,
            session,
        } => commands::gate(&root, &content, source.into(), session.as_deref()),
        Command::Status {
            records,
            id,
            status,
        } => commands::set_status(&records, &id, status),
    }
}

#[cfg(test)]
#[allow(unused_results)]
mod tests {
    use super::*;

    #[test]
    fn broken_settings_file_falls_back_and_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"logging": {"level": "debug""#).unwrap();

        let (settings, error) = settings_or_defaults(coach_settings::load_settings_from_path(&path));
        assert_eq!(settings, CoachSettings::default());
        let error = error.unwrap();
        assert_eq!(error.path(), Some(path.as_path()));
        assert!(error.to_string().starts_with("invalid settings in "));
    }

    #[test]
    fn readable_settings_are_used_without_a_report() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"context": {"rulesLimit": 4}}"#).unwrap();

        let (settings, error) = settings_or_defaults(coach_settings::load_settings_from_path(&path));
        assert!(error.is_none());
        assert_eq!(settings.context.rules_limit, 4);
    }
}
