//! Domain-specific error types for florist.
//!
//! This module defines `FloristError`, a `thiserror`-based enum with one
//! variant per failure kind the provisioner distinguishes: validation,
//! registration, external process, I/O, network, integrity, configuration,
//! templating and archive errors. Library functions return
//! `Result<T, FloristError>`, while trait boundaries (flowers, executors,
//! operator callbacks) use `anyhow::Result`.
//!
//! `FloristError` implements `Into<anyhow::Error>`, so the `?` operator
//! converts it automatically at those boundaries.

use std::io;

/// Formats an IO error kind into a human-readable message.
///
/// Provides consistent, user-friendly messages for common IO error kinds
/// (e.g., "I/O error: not found") instead of the OS-level messages
/// (e.g., "No such file or directory (os error 2)"). For unrecognized
/// error kinds, falls back to including the OS-level error message.
pub(crate) fn io_error_kind_message(err: &io::Error) -> String {
    match err.kind() {
        io::ErrorKind::NotFound => "I/O error: not found".to_string(),
        io::ErrorKind::PermissionDenied => "I/O error: permission denied".to_string(),
        io::ErrorKind::IsADirectory => "I/O error: is a directory".to_string(),
        io::ErrorKind::AlreadyExists => "I/O error: already exists".to_string(),
        _ => format!("I/O error: {}", err),
    }
}

/// Formats the captured stderr tail of a failed command.
fn stderr_tail(lines: &[String]) -> String {
    if lines.is_empty() {
        String::new()
    } else {
        format!("; stderr: {}", lines.join(" | "))
    }
}

/// Domain-specific error type for florist.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum FloristError {
    /// A flower rejected its own fields, or an argument was malformed.
    #[error("validation error: {0}")]
    Validation(String),

    /// The flower registry was misused (duplicate name, empty name, second batch).
    #[error("registration error: {0}")]
    Registration(String),

    /// The requested program could not be located in `PATH`.
    #[error("command not found in PATH: {command}")]
    CommandNotFound {
        /// The program name that was looked up.
        command: String,
    },

    /// A child process could not be run or exited with a non-zero status.
    #[error("command execution failed: {command}: {status}{}", stderr_tail(.stderr))]
    Execution {
        /// The command line that was executed.
        command: String,
        /// Exit status, signal, or a description of the internal failure.
        status: String,
        /// The last lines the child wrote to stderr.
        stderr: Vec<String>,
    },

    /// An I/O operation failed with contextual information.
    #[error("{context}: {message}")]
    Io {
        /// Operation and path that failed (e.g., `"CopyFile: open /etc/foo"`).
        context: String,
        /// Human-readable description derived from [`io_error_kind_message`].
        message: String,
        /// The underlying I/O error, preserved for programmatic inspection.
        #[source]
        source: io::Error,
    },

    /// An HTTP request completed with a status other than 200.
    #[error("NetFetch: received {status} (GET {url})")]
    HttpStatus {
        /// Status line, e.g. `404 Not Found`.
        status: String,
        /// The requested URL.
        url: String,
    },

    /// An HTTP request failed at the transport level.
    #[error("NetFetch: GET {url}: {message}")]
    Network {
        /// The requested URL.
        url: String,
        /// Transport error description.
        message: String,
    },

    /// Downloaded content did not match the pinned hash.
    #[error("NetFetch: hash mismatch: have: {have}; want: {want}")]
    HashMismatch {
        /// Hex digest of what was received.
        have: String,
        /// Hex digest that was expected.
        want: String,
    },

    /// Settings could not be loaded, or required keys were missing.
    #[error("configuration error: {0}")]
    Config(String),

    /// A template could not be parsed or rendered.
    #[error("template {path}: {message}")]
    Template { path: String, message: String },

    /// An archive could not be read, or the requested member is absent.
    #[error("archive {archive}: {message}")]
    Archive { archive: String, message: String },

    /// The system user or group database could not be queried.
    #[error("user database error: {0}")]
    UserDatabase(String),
}

impl FloristError {
    /// Creates an `Io` variant with the `message` field automatically derived
    /// from the `source` via [`io_error_kind_message`].
    pub(crate) fn io(context: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            context: context.into(),
            message: io_error_kind_message(&source),
            source,
        }
    }
}
