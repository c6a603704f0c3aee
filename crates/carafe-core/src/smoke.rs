//! Post-install smoke check.
//!
//! Runs the installed entry point once and looks for an expected substring
//! in its combined output. Help-flag conventions vary, so a non-zero exit
//! with matching output still passes; the exit status is only a liveness
//! signal. A failure here means "installed but broken", which callers keep
//! distinct from install-time failures.

use std::io::Read;
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::Duration;

use thiserror::Error;
use wait_timeout::ChildExt;

/// Default time budget for the check invocation.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors from the post-install check.
#[derive(Error, Debug)]
pub enum SmokeError {
    /// The entry point could not be spawned at all.
    #[error("could not launch {entry}: {source}")]
    Launch {
        /// Entry point path.
        entry: String,
        /// Underlying spawn failure.
        #[source]
        source: std::io::Error,
    },

    /// The entry point did not finish within the time budget.
    #[error("check timed out after {secs}s")]
    Timeout {
        /// Time budget in seconds.
        secs: u64,
    },

    /// The output did not contain the expected substring.
    #[error("expected output to contain '{expected}', got: {output}")]
    Mismatch {
        /// Substring the recipe expects.
        expected: String,
        /// Combined output (truncated for display).
        output: String,
    },

    /// Failure reading the entry point's output.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Invoke `entry` with `args` and require `expected` in the combined
/// stdout/stderr. Returns the combined output on success.
///
/// # Errors
///
/// Returns [`SmokeError`] when the process cannot launch, exceeds `timeout`,
/// or its output lacks the expected substring.
pub fn run_check(
    entry: &Path,
    args: &[String],
    expected: &str,
    timeout: Duration,
) -> Result<String, SmokeError> {
    let mut child = Command::new(entry)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| SmokeError::Launch {
            entry: entry.display().to_string(),
            source,
        })?;

    // Drain both pipes on reader threads so a chatty child cannot deadlock
    // against a full pipe buffer while we wait on it.
    let mut stdout = child.stdout.take();
    let mut stderr = child.stderr.take();
    let out_handle = std::thread::spawn(move || read_all(stdout.as_mut()));
    let err_handle = std::thread::spawn(move || read_all(stderr.as_mut()));

    let status = child.wait_timeout(timeout)?;
    if status.is_none() {
        child.kill().ok();
        child.wait().ok();
        return Err(SmokeError::Timeout {
            secs: timeout.as_secs(),
        });
    }

    let mut output = out_handle.join().unwrap_or_default();
    let err_output = err_handle.join().unwrap_or_default();
    if !err_output.is_empty() {
        if !output.is_empty() {
            output.push('\n');
        }
        output.push_str(&err_output);
    }

    if output.contains(expected) {
        Ok(output)
    } else {
        Err(SmokeError::Mismatch {
            expected: expected.to_string(),
            output: truncate_for_display(&output),
        })
    }
}

fn read_all(source: Option<&mut impl Read>) -> String {
    let mut buf = String::new();
    if let Some(reader) = source {
        let _ = reader.read_to_string(&mut buf);
    }
    buf
}

fn truncate_for_display(output: &str) -> String {
    const LIMIT: usize = 400;
    if output.len() <= LIMIT {
        output.to_string()
    } else {
        let cut = output
            .char_indices()
            .take_while(|(i, _)| *i < LIMIT)
            .last()
            .map_or(0, |(i, c)| i + c.len_utf8());
        format!("{}...", &output[..cut])
    }
}
