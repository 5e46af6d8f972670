//! Command execution abstraction for florist.
//!
//! This module provides:
//! - [`CommandSpec`]: Specification for commands to execute
//! - [`ExecutionResult`]: Result of command execution
//! - [`CommandExecutor`]: Trait for command execution strategies
//! - [`RealCommandExecutor`]: Production implementation using `std::process::Command`
//! - [`run`]: Executes a spec and turns a non-zero exit into [`FloristError::Execution`]

mod pipe;
mod real;

use std::process::ExitStatus;

use anyhow::Result;
use camino::Utf8PathBuf;

use crate::error::FloristError;

pub use pipe::{MAX_LOG_LINE_BYTES, STDERR_TAIL_LINES, truncate_line};
pub use real::RealCommandExecutor;

/// Specification for a command to be executed
#[derive(Debug, Clone)]
pub struct CommandSpec {
    /// The command to execute (e.g., "apt-get")
    pub command: String,
    /// Command arguments
    pub args: Vec<String>,
    /// Working directory (optional, defaults to current directory)
    pub cwd: Option<Utf8PathBuf>,
    /// Environment variables to set (in addition to inherited environment)
    pub env: Vec<(String, String)>,
}

impl CommandSpec {
    /// Creates a new CommandSpec with command and args
    #[must_use]
    pub fn new<I, S>(command: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            command: command.into(),
            args: args.into_iter().map(Into::into).collect(),
            cwd: None,
            env: Vec::new(),
        }
    }

    /// Sets the working directory
    #[must_use]
    pub fn with_cwd(mut self, cwd: Utf8PathBuf) -> Self {
        self.cwd = Some(cwd);
        self
    }

    /// Adds an environment variable
    #[must_use]
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Returns the command line as a single space-separated string.
    pub fn display_line(&self) -> String {
        std::iter::once(self.command.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Result of command execution
#[derive(Debug)]
pub struct ExecutionResult {
    /// Exit status of the command
    pub status: ExitStatus,
    /// Trailing lines the command wrote to stderr
    pub stderr: Vec<String>,
}

impl ExecutionResult {
    /// Returns true if the command exited with status 0.
    pub fn success(&self) -> bool {
        self.status.success()
    }

    /// Returns the exit code if available
    pub fn code(&self) -> Option<i32> {
        self.status.code()
    }
}

/// Trait for command execution.
///
/// Implementations must be `Send + Sync` so a single executor can be shared
/// as `Arc<dyn CommandExecutor>` by the host context and the package layer.
pub trait CommandExecutor: Send + Sync {
    /// Executes a command with the given specification.
    ///
    /// Returns `Ok` whenever the child ran to completion, whatever its exit
    /// status; use [`run`] to require success.
    fn execute(&self, spec: &CommandSpec) -> Result<ExecutionResult>;
}

/// Executes `spec` and fails unless the child exited with status 0.
///
/// The returned error carries the command line, the exit status and the
/// captured stderr tail.
pub fn run(executor: &dyn CommandExecutor, spec: &CommandSpec) -> Result<()> {
    let result = executor.execute(spec)?;
    if !result.success() {
        return Err(FloristError::Execution {
            command: spec.display_line(),
            status: result.status.to_string(),
            stderr: result.stderr,
        }
        .into());
    }
    Ok(())
}
