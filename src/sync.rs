//! Project staging.
//!
//! Before a task runs on a platform, its project's files must exist under
//! `<projects_path>/<project name>` on that platform. Staging is two steps:
//!
//! 1. Create the destination root (`mkdir -p`, locally or through `ssh`).
//! 2. Mirror the project's contents with `rsync -aq <project>/ <destination>`.
//!
//! Both steps are best-effort. A failing `mkdir` is logged and the mirror is
//! still attempted. A failing mirror is logged once with the full command
//! line and reported as a [`SyncOutcome`]; nothing is raised. Mirroring an
//! already-synced tree changes nothing, so repeated calls are safe.
//! Concurrent calls for the same project must be serialized by the caller.
//!
//! Over `ssh` both steps go through the configured `ssh_path`: `mkdir` runs
//! it directly and rsync receives it through `-e`.

use std::path::Path;
use std::sync::Arc;

use crate::endpoint::{Endpoint, Scheme};
use crate::logging::Logger;
use crate::model::Project;
use crate::paths::{PlatformPaths, absolute};
use crate::runner::{CommandRunner, TransportCommand, shell_escape};

/// Result of staging a project
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Files mirrored to the destination
    Synced,
    /// The platform runs tasks in place; nothing to stage
    Skipped,
    /// The project cannot be staged (bad name); nothing was run
    Rejected { reason: String },
    /// The mirror command failed
    Failed { command: String, reason: String },
}

impl SyncOutcome {
    /// Whether the project's files can be expected at the destination
    pub fn is_ok(&self) -> bool {
        matches!(self, SyncOutcome::Synced | SyncOutcome::Skipped)
    }
}

/// Transfer binaries used by the synchronizer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferTools {
    pub rsync_path: String,
    pub ssh_path: String,
}

impl Default for TransferTools {
    fn default() -> Self {
        Self {
            rsync_path: "rsync".to_string(),
            ssh_path: "ssh".to_string(),
        }
    }
}

/// Stages projects onto a platform through its endpoint
pub struct ProjectSynchronizer {
    endpoint: Endpoint,
    paths: PlatformPaths,
    tools: TransferTools,
    runner: Arc<dyn CommandRunner>,
    logger: Logger,
}

impl ProjectSynchronizer {
    pub fn new(
        endpoint: Endpoint,
        paths: PlatformPaths,
        tools: TransferTools,
        runner: Arc<dyn CommandRunner>,
        logger: Logger,
    ) -> Self {
        Self {
            endpoint,
            paths,
            tools,
            runner,
            logger,
        }
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Command creating `path` (and parents) where the endpoint stores files.
    ///
    /// For `ssh`/`rsync` the command runs through `ssh`; the remote shell
    /// joins its arguments, so the path is escaped for it.
    pub fn mkdir_command(&self, path: &Path) -> TransportCommand {
        match self.endpoint.scheme() {
            Scheme::Local | Scheme::File => TransportCommand::new("mkdir")
                .arg("-p")
                .arg(path.display().to_string()),
            Scheme::Ssh | Scheme::Rsync => {
                let mut cmd = TransportCommand::new(&self.tools.ssh_path);
                if self.endpoint.scheme() == Scheme::Ssh
                    && let Some(port) = self.endpoint.port()
                {
                    cmd = cmd.arg("-p").arg(port.to_string());
                }
                cmd.arg(self.endpoint.authority())
                    .arg("mkdir")
                    .arg("-p")
                    .arg(shell_escape(&path.display().to_string()))
            }
        }
    }

    /// Command mirroring the project's contents to its staged root
    pub fn mirror_command(&self, project: &Project) -> TransportCommand {
        let mut source = absolute(&project.path).display().to_string();
        if !source.ends_with('/') {
            source.push('/');
        }
        let dest = self
            .endpoint
            .destination(&self.paths.project_root(&project.name));

        let mut cmd = TransportCommand::new(&self.tools.rsync_path).arg("-aq");
        match (self.endpoint.scheme(), self.endpoint.port()) {
            // rsync splits -e on whitespace, honouring quotes
            (Scheme::Ssh, Some(port)) => {
                cmd = cmd
                    .arg("-e")
                    .arg(format!("{} -p {}", shell_escape(&self.tools.ssh_path), port));
            }
            (Scheme::Ssh, None) => {
                cmd = cmd.arg("-e").arg(shell_escape(&self.tools.ssh_path));
            }
            (Scheme::Rsync, Some(port)) => {
                cmd = cmd.arg(format!("--port={}", port));
            }
            _ => {}
        }
        cmd.arg(source).arg(dest)
    }

    /// Create a directory on the endpoint. Failure is logged, not raised.
    pub fn ensure_dir(&self, path: &Path, purpose: &str) -> bool {
        let cmd = self.mkdir_command(path);
        self.logger.debug(format!("Running: {}", cmd));
        let outcome = self.runner.run(&cmd);
        if !outcome.success() {
            self.logger.error(format!(
                "Error while creating {} ({}): {}",
                purpose,
                outcome.describe(),
                cmd
            ));
            if !outcome.stderr.is_empty() {
                self.logger.debug(format!("stderr: {}", outcome.stderr));
            }
        }
        outcome.success()
    }

    /// Stage a project's files.
    pub fn sync(&self, project: &Project) -> SyncOutcome {
        if !project.has_valid_name() {
            let reason = format!("project name '{}' is not a valid directory name", project.name);
            self.logger.error(format!("Not synchronizing project: {}", reason));
            return SyncOutcome::Rejected { reason };
        }

        self.logger
            .info(format!("Synchronizing project {} ...", project.name));

        self.ensure_dir(
            &self.paths.projects_path,
            &format!("destination path for project {}", project.name),
        );

        let cmd = self.mirror_command(project);
        self.logger.debug(format!("Running: {}", cmd));
        let outcome = self.runner.run(&cmd);
        if outcome.success() {
            self.logger
                .info(format!("Project {} synchronized", project.name));
            return SyncOutcome::Synced;
        }

        let reason = outcome.describe();
        self.logger.error(format!(
            "Error syncing project {} ({}): {}",
            project.name, reason, cmd
        ));
        if !outcome.stderr.is_empty() {
            self.logger.debug(format!("stderr: {}", outcome.stderr));
        }
        SyncOutcome::Failed {
            command: cmd.to_string(),
            reason,
        }
    }
}
