//! autocommit - CLI entry point.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::io::BufReader;

use autocommit::config::{ensure_settings_file, open_settings};
use autocommit::watch::{WatchSession, wait_for_interrupt};
use autocommit::{
    AutoCommitter, ConsoleNotifier, FileSettings, GeminiClient, GitCli, Scheduler, SettingsSource,
    Trigger,
};

/// Commit your workspace periodically with AI-generated messages.
#[derive(Parser, Debug)]
#[command(name = "autocommit")]
#[command(about = "Commit your workspace periodically with AI-generated messages")]
#[command(version)]
struct Cli {
    /// Workspace root (defaults to the current directory)
    #[arg(short = 'w', long, global = true)]
    workspace: Option<PathBuf>,

    /// Settings file (defaults to <workspace>/.autocommit.toml)
    #[arg(short = 'c', long, global = true)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Stage everything and commit once
    Run,

    /// Commit on an interval, reading control commands from stdin
    Watch,

    /// Open the settings file, creating it with defaults if missing
    Settings {
        /// Print effective settings instead of opening the file
        #[arg(long, conflicts_with = "path")]
        show: bool,

        /// Print the settings file path
        #[arg(long)]
        path: bool,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let default_level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    // Absolute paths let runs tell whether the settings file sits in the tree
    let workspace = match cli.workspace {
        Some(path) => std::path::absolute(&path)
            .with_context(|| format!("Failed to resolve workspace {}", path.display()))?,
        None => std::env::current_dir().context("Failed to read the current directory")?,
    };
    let settings = match cli.config {
        Some(path) => FileSettings::new(
            std::path::absolute(&path)
                .with_context(|| format!("Failed to resolve settings file {}", path.display()))?,
        ),
        None => FileSettings::for_workspace(&workspace),
    };

    match cli.command {
        Command::Run => {
            let committer = build_committer(&workspace, &settings)?;
            let ok = committer.run_and_report(Trigger::Manual).await;
            Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
        }
        Command::Watch => {
            let committer = Arc::new(build_committer(&workspace, &settings)?);
            let settings_path = settings.path().to_path_buf();
            let scheduler = Scheduler::new(committer, Arc::new(settings));
            let session = WatchSession::new(scheduler, settings_path, Arc::new(ConsoleNotifier));

            let stdin = BufReader::new(tokio::io::stdin());
            session
                .run(stdin, wait_for_interrupt(tokio::signal::ctrl_c()))
                .await;
            Ok(ExitCode::SUCCESS)
        }
        Command::Settings { show, path } => {
            settings_command(&settings, show, path)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Wire the committer to git, Gemini, and the console.
///
/// The generation endpoint and model are read once here; every other setting
/// is re-read at the start of each run.
fn build_committer(workspace: &Path, settings: &FileSettings) -> Result<AutoCommitter> {
    let initial = settings.load().context("Failed to load settings")?;
    let generator = GeminiClient::new(&initial.endpoint, &initial.model)
        .context("Failed to set up the generation client")?;

    Ok(AutoCommitter::new(
        workspace,
        Arc::new(GitCli::new()),
        Arc::new(generator),
        Arc::new(settings.clone()),
        Arc::new(ConsoleNotifier),
    ))
}

fn settings_command(settings: &FileSettings, show: bool, path: bool) -> Result<()> {
    if path {
        println!("{}", settings.path().display());
        return Ok(());
    }

    if show {
        let effective = settings.load().context("Failed to load settings")?;
        println!("# {}", settings.path().display());
        println!("{}", effective);
        return Ok(());
    }

    if ensure_settings_file(settings.path())? {
        println!("Created {}", settings.path().display());
    }
    open_settings(settings.path())
        .with_context(|| format!("Could not open {}", settings.path().display()))?;
    Ok(())
}
