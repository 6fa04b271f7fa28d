//! External command execution.
//!
//! Transports never build shell strings. A [`TransportCommand`] is a program
//! plus an argument vector handed straight to the OS; its `Display` output is
//! a shell-escaped rendering used only for log lines so operators can paste
//! it into a terminal.
//!
//! `SystemRunner` spawns real processes. `DryRunRunner` logs and skips.
//! `RecordingRunner` records commands and replays canned exit codes for tests.

use std::collections::VecDeque;
use std::fmt;
use std::process::{Command, Stdio};
use std::sync::Mutex;

use crate::logging::Logger;

/// A program and its argument vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl TransportCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }
}

impl fmt::Display for TransportCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", shell_escape(&self.program))?;
        for arg in &self.args {
            write!(f, " {}", shell_escape(arg))?;
        }
        Ok(())
    }
}

/// Escape a string for a POSIX shell.
///
/// Plain words pass through; anything else is single-quoted with embedded
/// quotes written as `'\''`.
pub fn shell_escape(s: &str) -> String {
    if s.is_empty() {
        return "''".to_string();
    }
    if s.chars().all(|c| {
        c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '/' | ':' | '@' | '=' | ',' | '+')
    }) {
        return s.to_string();
    }
    format!("'{}'", s.replace('\'', "'\\''"))
}

/// Result of running a command.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandOutcome {
    /// Exit code (None if terminated by signal or never spawned).
    pub exit_code: Option<i32>,
    /// Captured standard error.
    pub stderr: String,
    /// Why the process could not be started, if it wasn't.
    pub spawn_error: Option<String>,
}

impl CommandOutcome {
    /// Successful exit with no output
    pub fn ok() -> Self {
        Self::exited(0)
    }

    pub fn exited(code: i32) -> Self {
        Self {
            exit_code: Some(code),
            ..Self::default()
        }
    }

    pub fn spawn_failed(reason: impl Into<String>) -> Self {
        Self {
            spawn_error: Some(reason.into()),
            ..Self::default()
        }
    }

    pub fn success(&self) -> bool {
        self.spawn_error.is_none() && self.exit_code == Some(0)
    }

    /// Short human description of a failure (`exit code 23`, `terminated by signal`)
    pub fn describe(&self) -> String {
        match (&self.spawn_error, self.exit_code) {
            (Some(reason), _) => format!("failed to start: {}", reason),
            (None, Some(code)) => format!("exit code {}", code),
            (None, None) => "terminated by signal".to_string(),
        }
    }
}

/// Executes transport commands. Blocks until the process exits.
pub trait CommandRunner: Send + Sync {
    fn run(&self, cmd: &TransportCommand) -> CommandOutcome;
}

/// Production runner backed by `std::process::Command`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, cmd: &TransportCommand) -> CommandOutcome {
        let output = Command::new(&cmd.program)
            .args(&cmd.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output();

        match output {
            Ok(output) => CommandOutcome {
                exit_code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
                spawn_error: None,
            },
            Err(e) => CommandOutcome::spawn_failed(e.to_string()),
        }
    }
}

/// Runner that logs what would be executed and reports success.
#[derive(Debug, Clone)]
pub struct DryRunRunner {
    logger: Logger,
}

impl DryRunRunner {
    pub fn new(logger: Logger) -> Self {
        Self { logger }
    }
}

impl CommandRunner for DryRunRunner {
    fn run(&self, cmd: &TransportCommand) -> CommandOutcome {
        self.logger.info(format!("[DRY RUN] Skipped: {}", cmd));
        CommandOutcome::ok()
    }
}

/// Test double that records commands and replays queued outcomes.
///
/// When the queue is empty every command succeeds.
#[derive(Debug, Default)]
pub struct RecordingRunner {
    outcomes: Mutex<VecDeque<CommandOutcome>>,
    commands: Mutex<Vec<TransportCommand>>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Outcomes are returned in the order given, one per command
    pub fn with_outcomes(outcomes: Vec<CommandOutcome>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into()),
            commands: Mutex::new(Vec::new()),
        }
    }

    pub fn executed_commands(&self) -> Vec<TransportCommand> {
        self.commands
            .lock()
            .map(|c| c.clone())
            .unwrap_or_default()
    }
}

impl CommandRunner for RecordingRunner {
    fn run(&self, cmd: &TransportCommand) -> CommandOutcome {
        if let Ok(mut commands) = self.commands.lock() {
            commands.push(cmd.clone());
        }
        self.outcomes
            .lock()
            .ok()
            .and_then(|mut q| q.pop_front())
            .unwrap_or_else(CommandOutcome::ok)
    }
}
