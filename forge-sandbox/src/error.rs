//! Errors raised by sandboxed process execution.

use thiserror::Error;

/// Failures specific to spawning and supervising a sandboxed process.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SandboxError {
    /// The child process could not be spawned at all.
    #[error("failed to spawn sandboxed process: {0}")]
    Spawn(String),

    /// The process exceeded its wall-clock budget and was killed.
    #[error("sandboxed process exceeded timeout of {0:?}")]
    Timeout(std::time::Duration),

    /// Writing the caller-supplied input to the child's stdin failed.
    #[error("failed to write stdin to sandboxed process: {0}")]
    StdinWrite(String),

    /// Reading stdout/stderr from the child failed.
    #[error("failed to read output from sandboxed process: {0}")]
    OutputRead(String),
}
