//! Bounded external process execution.
//!
//! A hung converter used to stall the whole batch. Every call now runs under
//! `tokio::time::timeout`; the child is spawned with `kill_on_drop` so the
//! process is reaped when the timeout drops the wait future. Expiry is a
//! failure of that one item and is never retried.

use crate::error::ItemError;
use std::ffi::OsStr;
use std::path::Path;
use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// Longest stderr excerpt kept in an error message.
const STDERR_EXCERPT: usize = 400;

/// Run `program args…` to completion within `timeout_secs`.
///
/// `subject` is the file the call is about; it only feeds error messages.
pub async fn run_tool<I, S>(
    program: &str,
    args: I,
    subject: &Path,
    timeout_secs: u64,
) -> Result<Output, ItemError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    debug!(tool = program, subject = %subject.display(), "spawning");

    let child = cmd.spawn().map_err(|e| ItemError::ToolFailed {
        tool: program.to_string(),
        path: subject.to_path_buf(),
        detail: format!("failed to start: {e}"),
    })?;

    let output = tokio::time::timeout(Duration::from_secs(timeout_secs), child.wait_with_output())
        .await
        .map_err(|_| ItemError::ToolTimeout {
            tool: program.to_string(),
            path: subject.to_path_buf(),
            secs: timeout_secs,
        })?
        .map_err(|e| ItemError::ToolFailed {
            tool: program.to_string(),
            path: subject.to_path_buf(),
            detail: e.to_string(),
        })?;

    if !output.status.success() {
        return Err(ItemError::ToolFailed {
            tool: program.to_string(),
            path: subject.to_path_buf(),
            detail: format!("{}: {}", output.status, stderr_excerpt(&output.stderr)),
        });
    }
    Ok(output)
}

fn stderr_excerpt(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let text = text.trim();
    if text.chars().count() > STDERR_EXCERPT {
        let cut: String = text.chars().take(STDERR_EXCERPT).collect();
        format!("{cut}\u{2026}")
    } else {
        text.to_string()
    }
}
