mod answer;
mod commands;
mod config;
mod error;
mod events;
mod orchestrator;
mod session;
mod storage;
mod store;
mod ui;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::session::Session;

#[derive(Parser)]
#[command(name = "garai")]
#[command(version)]
#[command(about = "Chat with GarAi from the terminal", long_about = None)]
struct Cli {
    /// Answering service URL
    #[arg(long, global = true)]
    endpoint: Option<String>,

    /// Name the transcript is stored under
    #[arg(long, global = true)]
    storage_key: Option<String>,

    /// Give up on a request after this many seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Keep the conversation in memory only
    #[arg(long, global = true)]
    ephemeral: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the chat screen (default)
    Chat,
    /// Ask a single question and print the answer
    Ask { question: String },
    /// Print the stored conversation
    History,
}

impl Cli {
    /// Command-line flags win over the config file and environment
    fn apply_overrides(&self, config: &mut Config) {
        if let Some(endpoint) = &self.endpoint {
            config.endpoint = endpoint.clone();
        }
        if let Some(key) = &self.storage_key {
            config.storage_key = key.clone();
        }
        if let Some(secs) = self.timeout {
            config.request_timeout_secs = Some(secs);
        }
    }
}

/// Where log output goes for a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LogTarget {
    /// `~/.garai/garai.log`, since the chat screen owns the terminal
    File,
    /// One-shot commands
    Stderr,
    /// Ephemeral chat: the terminal is taken and the disk is off limits
    Off,
}

impl LogTarget {
    fn for_run(chat_mode: bool, ephemeral: bool) -> Self {
        match (chat_mode, ephemeral) {
            (true, false) => LogTarget::File,
            (true, true) => LogTarget::Off,
            (false, _) => LogTarget::Stderr,
        }
    }
}

fn init_logging(config: &Config, target: LogTarget) -> Result<()> {
    // One-shot commands print to the terminal, so keep stderr quiet by default
    let default_level = match target {
        LogTarget::File => "info",
        LogTarget::Stderr | LogTarget::Off => "warn",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    match target {
        LogTarget::File => {
            config.ensure_home()?;
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(config.log_path())
                .context("Failed to open log file")?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        LogTarget::Stderr => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
        LogTarget::Off => {}
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load()?;
    cli.apply_overrides(&mut config);

    let chat_mode = matches!(cli.command, None | Some(Commands::Chat));
    init_logging(&config, LogTarget::for_run(chat_mode, cli.ephemeral))?;

    let mut session = Session::open(config, cli.ephemeral)?;

    match cli.command {
        None | Some(Commands::Chat) => ui::run(session).await,
        Some(Commands::Ask { question }) => {
            commands::ask(&mut session.orchestrator, &session.client, &question).await
        }
        Some(Commands::History) => commands::history(
            session.orchestrator.transcript(),
            &session.config.ui.assistant_name,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults_to_chat() {
        let cli = Cli::try_parse_from(["garai"]).unwrap();
        assert!(cli.command.is_none());
        assert!(!cli.ephemeral);
    }

    #[test]
    fn test_cli_flags_override_config() {
        let cli = Cli::try_parse_from([
            "garai",
            "ask",
            "What is GarAi?",
            "--endpoint",
            "http://localhost:8000/ask-ai",
            "--timeout",
            "15",
            "--storage-key",
            "scratch",
        ])
        .unwrap();

        let mut config = Config::default();
        cli.apply_overrides(&mut config);

        assert_eq!(config.endpoint, "http://localhost:8000/ask-ai");
        assert_eq!(config.request_timeout_secs, Some(15));
        assert_eq!(config.storage_key, "scratch");
        assert!(matches!(
            cli.command,
            Some(Commands::Ask { ref question }) if question == "What is GarAi?"
        ));
    }

    #[test]
    fn test_log_target_keeps_ephemeral_chat_off_disk() {
        assert_eq!(LogTarget::for_run(true, false), LogTarget::File);
        assert_eq!(LogTarget::for_run(true, true), LogTarget::Off);
        assert_eq!(LogTarget::for_run(false, true), LogTarget::Stderr);
        assert_eq!(LogTarget::for_run(false, false), LogTarget::Stderr);
    }

    #[test]
    fn test_disabled_logging_leaves_home_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            garai_home: dir.path().join(".garai"),
            ..Config::default()
        };

        init_logging(&config, LogTarget::Off).unwrap();

        assert!(!config.garai_home.exists());
    }

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
