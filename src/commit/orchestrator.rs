//! One commit run: stage, diff, generate, sanitize, commit, and maybe push.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::commit::sanitize::{escape_quotes, sanitize_message};
use crate::config::{Settings, SettingsSource};
use crate::error::AutoCommitError;
use crate::git::{PushCapability, Transport, VersionControl};
use crate::llm::MessageGenerator;
use crate::notify::Notifier;

/// What started a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Explicit user request; "nothing to commit" is reported.
    Manual,
    /// Timer firing; "nothing to commit" stays silent.
    Scheduled,
}

impl Trigger {
    pub fn notify_on_noop(&self) -> bool {
        matches!(self, Trigger::Manual)
    }
}

/// Per-run record, discarded when the run ends.
#[derive(Debug, Clone)]
pub struct CommitSession {
    pub root: PathBuf,
    pub trigger: Trigger,
    pub diff: String,
    /// Raw generator output (or the fallback).
    pub candidate: String,
    /// Sanitized message, before quote escaping.
    pub message: String,
    pub push_enabled: bool,
}

impl CommitSession {
    /// First line of the committed message.
    pub fn subject(&self) -> &str {
        self.message.lines().next().unwrap_or_default()
    }
}

/// What happened to the push step of a successful commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushOutcome {
    /// `push_enabled` is off.
    Disabled,
    /// `push_enabled` is on but the push capability flag is off.
    Unavailable,
    /// The remote cannot be pushed to unattended; the commit stays local.
    Skipped { transport: Transport, reason: String },
    Pushed { remote: String },
}

/// Successful end states of a run.
#[derive(Debug)]
pub enum RunOutcome {
    Committed {
        session: CommitSession,
        push: PushOutcome,
    },
    /// Staged diff was empty; nothing generated, nothing committed.
    NothingToCommit,
    /// Another run was still in progress, so this one did nothing.
    Busy,
}

/// Sequences a commit run against its collaborators.
///
/// At most one run executes at a time; a run requested while another is in
/// flight returns [`RunOutcome::Busy`] without touching the working tree.
pub struct AutoCommitter {
    root: PathBuf,
    vcs: Arc<dyn VersionControl>,
    generator: Arc<dyn MessageGenerator>,
    settings: Arc<dyn SettingsSource>,
    notifier: Arc<dyn Notifier>,
    running: Mutex<()>,
}

impl AutoCommitter {
    pub fn new(
        root: impl Into<PathBuf>,
        vcs: Arc<dyn VersionControl>,
        generator: Arc<dyn MessageGenerator>,
        settings: Arc<dyn SettingsSource>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            root: root.into(),
            vcs,
            generator,
            settings,
            notifier,
            running: Mutex::new(()),
        }
    }

    /// Workspace paths a run must never stage: the settings file, when it
    /// lives inside the workspace.
    fn protected_paths(&self) -> Vec<PathBuf> {
        self.settings
            .location()
            .and_then(|path| path.strip_prefix(&self.root).ok())
            .filter(|rel| !rel.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .into_iter()
            .collect()
    }

    /// Execute one run. Steps happen strictly in order; nothing already done
    /// (staging, the commit) is rolled back when a later step fails.
    pub async fn run(&self, trigger: Trigger) -> Result<RunOutcome, AutoCommitError> {
        let Ok(_guard) = self.running.try_lock() else {
            debug!("Commit run already in progress, skipping {:?} run", trigger);
            return Ok(RunOutcome::Busy);
        };

        let settings = self.settings.load()?;

        // ── Check repository ──
        if !self.root.is_dir() {
            return Err(AutoCommitError::MissingWorkspace(self.root.clone()));
        }
        self.vcs
            .ensure_installed()
            .await
            .map_err(|_| AutoCommitError::ToolUnavailable)?;
        let inside = self
            .vcs
            .is_inside_work_tree(&self.root)
            .await
            .map_err(|source| AutoCommitError::RepositoryCheckFailed {
                path: self.root.clone(),
                source,
            })?;
        if !inside {
            return Err(AutoCommitError::NotARepository(self.root.clone()));
        }

        // ── Stage and diff ──
        self.vcs
            .stage_all(&self.root, &self.protected_paths())
            .await
            .map_err(AutoCommitError::StageFailed)?;
        let diff = self
            .vcs
            .staged_diff(&self.root)
            .await
            .map_err(AutoCommitError::DiffFailed)?;

        if diff.trim().is_empty() {
            return Ok(RunOutcome::NothingToCommit);
        }

        // ── Generate and sanitize ──
        let generated = self
            .generator
            .generate(
                &diff,
                settings.api_key.as_deref(),
                &settings.default_message,
            )
            .await;
        if let Some(ref issue) = generated.issue {
            self.notifier
                .warn(&format!("{}. Using the default commit message.", issue));
        }

        let message = sanitize_message(&generated.message);
        if message.is_empty() {
            return Err(AutoCommitError::EmptyGeneratedMessage);
        }

        // ── Commit ──
        self.vcs
            .commit(&self.root, &escape_quotes(&message))
            .await
            .map_err(AutoCommitError::CommitFailed)?;
        info!("Committed: {}", message.lines().next().unwrap_or_default());

        let session = CommitSession {
            root: self.root.clone(),
            trigger,
            diff,
            candidate: generated.message,
            message,
            push_enabled: settings.push_enabled,
        };

        // ── Push ──
        let push = self.push(&settings).await?;

        Ok(RunOutcome::Committed { session, push })
    }

    async fn push(&self, settings: &Settings) -> Result<PushOutcome, AutoCommitError> {
        if !settings.should_push() {
            if settings.push_enabled {
                debug!("push_enabled is set but the push feature is off");
                return Ok(PushOutcome::Unavailable);
            }
            return Ok(PushOutcome::Disabled);
        }

        let remote = settings.remote.as_str();
        let capability = self
            .vcs
            .push_capability(&self.root, remote)
            .await
            .map_err(AutoCommitError::PushFailed)?;

        match capability {
            PushCapability::Unsupported { transport, reason } => {
                Ok(PushOutcome::Skipped { transport, reason })
            }
            PushCapability::Ready { transport } => {
                debug!("Pushing to {} over {}", remote, transport);
                self.vcs
                    .push(&self.root, remote)
                    .await
                    .map_err(AutoCommitError::PushFailed)?;
                Ok(PushOutcome::Pushed {
                    remote: remote.to_string(),
                })
            }
        }
    }

    /// Run and turn every outcome into a notification. Never fails; returns
    /// false when the run ended in an error.
    pub async fn run_and_report(&self, trigger: Trigger) -> bool {
        let result = self.run(trigger).await;
        self.report(trigger, &result);
        result.is_ok()
    }

    fn report(&self, trigger: Trigger, result: &Result<RunOutcome, AutoCommitError>) {
        match result {
            Ok(RunOutcome::Committed { session, push }) => match push {
                PushOutcome::Pushed { remote } => self.notifier.info(&format!(
                    "Auto commit complete and pushed to {}: {}",
                    remote,
                    session.subject()
                )),
                PushOutcome::Skipped { transport, reason } => {
                    self.notifier
                        .info(&format!("Auto commit complete: {}", session.subject()));
                    warn!("Push skipped ({}): {}", transport, reason);
                    self.notifier.warn(&format!(
                        "Push skipped for {} remote: {}. Commit kept local.",
                        transport, reason
                    ));
                }
                PushOutcome::Disabled | PushOutcome::Unavailable => self
                    .notifier
                    .info(&format!("Auto commit complete: {}", session.subject())),
            },
            Ok(RunOutcome::NothingToCommit) => {
                if trigger.notify_on_noop() {
                    self.notifier.info("No changes to commit.");
                } else {
                    debug!("Scheduled run found no changes");
                }
            }
            Ok(RunOutcome::Busy) => {
                if trigger.notify_on_noop() {
                    self.notifier.info("A commit run is already in progress.");
                }
            }
            Err(e) => {
                error!("Auto commit failed: {}", e);
                self.notifier.error(&format!("Auto commit failed: {}", e));
            }
        }
    }
}
