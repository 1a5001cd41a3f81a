//! Long-running watch mode: scheduler plus line-based control verbs.

use std::future::Future;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, warn};

use crate::commit::Trigger;
use crate::config::open_settings;
use crate::notify::Notifier;
use crate::scheduler::Scheduler;

const HELP: &str = "Commands: run, stop, restart, settings, status, help, quit";

/// Resolve once `signal` fires. If the listener could not be installed this
/// never resolves, leaving `quit` as the only way out.
pub async fn wait_for_interrupt<F>(signal: F)
where
    F: Future<Output = std::io::Result<()>>,
{
    if let Err(e) = signal.await {
        warn!("Could not listen for Ctrl-C, type 'quit' to stop: {}", e);
        std::future::pending::<()>().await;
    }
}

/// A verb typed on stdin while watching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    /// Commit now.
    Run,
    Stop,
    /// Restart the timer with fresh settings and commit now.
    Restart,
    /// Open the settings file.
    Settings,
    Status,
    Help,
    Quit,
}

#[derive(Error, Debug, PartialEq, Eq)]
#[error("Unknown command '{0}'. Type 'help' for the list of commands")]
pub struct UnknownCommand(pub String);

impl FromStr for ControlCommand {
    type Err = UnknownCommand;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "run" | "commit" => Ok(ControlCommand::Run),
            "stop" => Ok(ControlCommand::Stop),
            "restart" => Ok(ControlCommand::Restart),
            "settings" => Ok(ControlCommand::Settings),
            "status" => Ok(ControlCommand::Status),
            "help" | "?" => Ok(ControlCommand::Help),
            "quit" | "exit" | "q" => Ok(ControlCommand::Quit),
            other => Err(UnknownCommand(other.to_string())),
        }
    }
}

/// Drives a [`Scheduler`] from a stream of control lines.
pub struct WatchSession {
    scheduler: Scheduler,
    settings_path: PathBuf,
    notifier: Arc<dyn Notifier>,
}

impl WatchSession {
    pub fn new(scheduler: Scheduler, settings_path: PathBuf, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            scheduler,
            settings_path,
            notifier,
        }
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Start the timer, run once, then handle control lines until `quit` or
    /// until `shutdown` resolves. When the input ends first the timer keeps
    /// firing until `shutdown`. Waits for in-flight runs before returning.
    pub async fn run<R, S>(&self, input: R, shutdown: S)
    where
        R: AsyncBufRead + Unpin,
        S: Future<Output = ()>,
    {
        match self.scheduler.start() {
            Ok(period) => self.notifier.info(&format!(
                "Auto commit started, running every {}s. Type 'help' for commands.",
                period.as_secs()
            )),
            Err(e) => self
                .notifier
                .error(&format!("Auto commit could not start: {}", e)),
        }
        self.scheduler.run_now(Trigger::Scheduled);

        let mut lines = input.lines();
        tokio::pin!(shutdown);

        loop {
            let line = tokio::select! {
                line = lines.next_line() => line,
                _ = &mut shutdown => {
                    debug!("Shutdown requested");
                    break;
                }
            };

            let line = match line {
                Ok(Some(line)) => line,
                Ok(None) => {
                    debug!("Control input closed, watching until interrupted");
                    (&mut shutdown).await;
                    break;
                }
                Err(e) => {
                    warn!("Failed to read control input: {}", e);
                    (&mut shutdown).await;
                    break;
                }
            };

            if line.trim().is_empty() {
                continue;
            }

            match line.parse::<ControlCommand>() {
                Ok(ControlCommand::Quit) => break,
                Ok(command) => self.handle(command).await,
                Err(e) => self.notifier.warn(&e.to_string()),
            }
        }

        self.scheduler.shutdown().await;
        self.notifier.info("Auto commit stopped.");
    }

    async fn handle(&self, command: ControlCommand) {
        match command {
            ControlCommand::Run => {
                self.scheduler.run_now(Trigger::Manual);
            }
            ControlCommand::Stop => {
                if self.scheduler.stop() {
                    self.notifier.info("Auto commit stopped.");
                } else {
                    self.notifier.info("Auto commit is not running.");
                }
            }
            ControlCommand::Restart => match self.scheduler.restart() {
                Ok(period) => self.notifier.info(&format!(
                    "Auto commit restarted, running every {}s.",
                    period.as_secs()
                )),
                Err(e) => self
                    .notifier
                    .error(&format!("Auto commit could not restart: {}", e)),
            },
            ControlCommand::Settings => self.edit_settings().await,
            ControlCommand::Status => match self.scheduler.interval() {
                Some(period) if self.scheduler.is_active() => self.notifier.info(&format!(
                    "Auto commit is running every {}s.",
                    period.as_secs()
                )),
                _ => self.notifier.info("Auto commit is stopped."),
            },
            ControlCommand::Help => self.notifier.info(HELP),
            ControlCommand::Quit => {}
        }
    }

    async fn edit_settings(&self) {
        let path = self.settings_path.clone();
        // An editor may block until closed
        let result = tokio::task::spawn_blocking(move || open_settings(&path)).await;

        match result {
            Ok(Ok(())) => self
                .notifier
                .info(&format!("Opened {}", self.settings_path.display())),
            Ok(Err(e)) => self.notifier.error(&e.to_string()),
            Err(e) => self
                .notifier
                .error(&format!("Failed to open settings: {}", e)),
        }
    }
}
