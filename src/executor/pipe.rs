//! Internal utilities for streaming command output to logs.
//!
//! This module handles reading from stdout/stderr pipes and logging
//! the output line by line while the child is running.

use std::collections::VecDeque;
use std::io::{BufRead, BufReader, Read};

/// Maximum number of bytes of a single output line forwarded to the log.
///
/// Longer lines are cut at this budget (moved back to the nearest UTF-8
/// character boundary). A line of exactly this length is logged whole.
pub const MAX_LOG_LINE_BYTES: usize = 160;

/// Number of trailing stderr lines kept for the error of a failed command.
pub const STDERR_TAIL_LINES: usize = 20;

/// Type of output stream for logging purposes.
#[derive(Clone, Copy)]
pub(super) enum StreamType {
    Stdout,
    Stderr,
}

impl std::fmt::Display for StreamType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stdout => f.write_str("stdout"),
            Self::Stderr => f.write_str("stderr"),
        }
    }
}

/// Extracts a human-readable message from a thread panic.
pub(super) fn panic_message(err: &(dyn std::any::Any + Send)) -> &str {
    err.downcast_ref::<&str>()
        .copied()
        .or_else(|| err.downcast_ref::<String>().map(|s| s.as_str()))
        .unwrap_or("unknown panic")
}

/// Cuts `line` to at most `max` bytes without splitting a character.
pub fn truncate_line(line: &str, max: usize) -> &str {
    if line.len() <= max {
        return line;
    }
    let mut end = max;
    while !line.is_char_boundary(end) {
        end -= 1;
    }
    &line[..end]
}

/// Reads from a pipe and logs each line at DEBUG level.
///
/// - Lines are split on LF, trailing whitespace is trimmed and empty lines are dropped
/// - Each logged line is truncated to [`MAX_LOG_LINE_BYTES`]
/// - Binary data uses lossy UTF-8 conversion
/// - I/O errors stop reading but don't fail command execution
///   (command success is determined by exit status)
///
/// Returns the last [`STDERR_TAIL_LINES`] lines (untruncated) when `keep_tail`
/// is set, and an empty vector otherwise.
pub(super) fn read_pipe_to_log<R: Read>(
    pipe: Option<R>,
    stream_type: StreamType,
    command: &str,
    keep_tail: bool,
) -> Vec<String> {
    let mut tail = VecDeque::new();
    let Some(pipe) = pipe else {
        tracing::error!(
            stream = %stream_type,
            "pipe was None (unexpected: Stdio::piped() was set), no output will be captured"
        );
        return Vec::new();
    };

    let mut reader = BufReader::new(pipe);
    let mut line_buf = Vec::new();

    loop {
        line_buf.clear();
        match reader.read_until(b'\n', &mut line_buf) {
            Ok(0) => break,
            Ok(_) => {
                let text = String::from_utf8_lossy(&line_buf);
                let trimmed = text.trim_end();
                if trimmed.is_empty() {
                    continue;
                }
                tracing::debug!(
                    stream = %stream_type,
                    command,
                    "{}",
                    truncate_line(trimmed, MAX_LOG_LINE_BYTES)
                );
                if keep_tail {
                    if tail.len() == STDERR_TAIL_LINES {
                        tail.pop_front();
                    }
                    tail.push_back(trimmed.to_string());
                }
            }
            Err(e) => {
                tracing::error!(stream = %stream_type, error = %e, "I/O error, stopping read");
                break;
            }
        }
    }

    tail.into()
}
