//! The sandbox runner: spawns an isolated child process, feeds it
//! stdin, and supervises it against a wall-clock timeout and an
//! optional memory ceiling.

use crate::contract::OutputContract;
use crate::error::SandboxError;
use crate::memory;
use forge_core::DurationMs;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Everything needed to spawn and supervise one sandboxed invocation.
pub struct SandboxConfig {
    /// Executable to run (an interpreter, or the target binary itself).
    pub command: String,
    /// Arguments passed to `command`.
    pub args: Vec<String>,
    /// Working directory for the child process; defaults to the
    /// parent's if `None`.
    pub working_dir: Option<PathBuf>,
    /// Extra environment variables set for the child.
    pub env: Vec<(String, String)>,
    /// Wall-clock budget; the process is killed if it runs longer.
    pub timeout: DurationMs,
    /// Memory ceiling in bytes; the process is killed if its peak RSS
    /// exceeds this. `None` disables the check.
    pub memory_ceiling_bytes: Option<u64>,
    /// Shape stdout must satisfy for the run to count as successful.
    pub output_contract: OutputContract,
}

impl SandboxConfig {
    /// A config with a 300 second timeout and no memory ceiling,
    /// the runtime's default for EXECUTABLE tool invocations.
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
            working_dir: None,
            env: Vec::new(),
            timeout: DurationMs::from_secs(300),
            memory_ceiling_bytes: None,
            output_contract: OutputContract::Unconstrained,
        }
    }
}

/// Outcome of one sandboxed run.
#[derive(Debug, Clone)]
pub struct SandboxResult {
    /// Process exit code, `None` if it was killed before exiting.
    pub exit_code: Option<i32>,
    /// Wall-clock time from spawn to completion (or kill).
    pub elapsed: DurationMs,
    /// Peak resident memory observed, in bytes, if sampling succeeded.
    pub peak_resident_memory: Option<u64>,
    /// Captured stdout, lossily decoded as UTF-8.
    pub stdout: String,
    /// Captured stderr, lossily decoded as UTF-8.
    pub stderr: String,
    /// The process was killed for exceeding its wall-clock timeout.
    pub timed_out: bool,
    /// The process was killed for exceeding its memory ceiling.
    pub memory_exceeded: bool,
}

impl SandboxResult {
    /// Exit code `0` and a stdout satisfying the declared output
    /// contract, with no timeout or memory kill.
    pub fn success(&self, contract: &OutputContract) -> bool {
        !self.timed_out
            && !self.memory_exceeded
            && self.exit_code == Some(0)
            && contract.is_satisfied_by(&self.stdout)
    }
}

const MEMORY_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Spawn `config.command` with `config.args`, write `input` to its
/// stdin, and wait for it to finish (or be killed). `kill_on_drop` is
/// set so an early return here never leaves a zombie behind.
pub async fn run(config: &SandboxConfig, input: &[u8]) -> Result<SandboxResult, SandboxError> {
    let started = Instant::now();
    let mut command = Command::new(&config.command);
    command
        .args(&config.args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(dir) = &config.working_dir {
        command.current_dir(dir);
    }
    for (key, value) in &config.env {
        command.env(key, value);
    }

    let mut child = command
        .spawn()
        .map_err(|e| SandboxError::Spawn(e.to_string()))?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin
            .write_all(input)
            .await
            .map_err(|e| SandboxError::StdinWrite(e.to_string()))?;
        drop(stdin);
    }

    let pid = child.id();
    let timeout_dur = config.timeout.to_std();

    let wait_future = child.wait_with_output();
    tokio::pin!(wait_future);

    let memory_watch = async {
        match (pid, config.memory_ceiling_bytes) {
            (Some(pid), Some(ceiling)) => {
                memory::watch_ceiling(pid, ceiling, MEMORY_POLL_INTERVAL).await
            }
            _ => std::future::pending().await,
        }
    };
    tokio::pin!(memory_watch);

    let outcome = tokio::select! {
        result = &mut wait_future => Outcome::Exited(result),
        _ = tokio::time::sleep(timeout_dur) => Outcome::TimedOut,
        exceeded = &mut memory_watch, if config.memory_ceiling_bytes.is_some() => {
            if exceeded {
                Outcome::MemoryExceeded
            } else {
                Outcome::Exited(wait_future.as_mut().await)
            }
        }
    };

    let peak_resident_memory = match pid {
        Some(pid) => memory::peak_rss_bytes(pid).await,
        None => None,
    };
    let elapsed = DurationMs::from(started.elapsed());

    match outcome {
        Outcome::Exited(Ok(output)) => Ok(SandboxResult {
            exit_code: output.status.code(),
            elapsed,
            peak_resident_memory,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            timed_out: false,
            memory_exceeded: false,
        }),
        Outcome::Exited(Err(e)) => Err(SandboxError::OutputRead(e.to_string())),
        Outcome::TimedOut => {
            drop(wait_future);
            Ok(SandboxResult {
                exit_code: None,
                elapsed,
                peak_resident_memory,
                stdout: String::new(),
                stderr: String::new(),
                timed_out: true,
                memory_exceeded: false,
            })
        }
        Outcome::MemoryExceeded => {
            drop(wait_future);
            Ok(SandboxResult {
                exit_code: None,
                elapsed,
                peak_resident_memory,
                stdout: String::new(),
                stderr: String::new(),
                timed_out: false,
                memory_exceeded: true,
            })
        }
    }
}

enum Outcome {
    Exited(std::io::Result<std::process::Output>),
    TimedOut,
    MemoryExceeded,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn echoes_stdin_to_stdout() {
        let config = SandboxConfig::new("cat", vec![]);
        let result = run(&config, b"hello sandbox").await.unwrap();
        assert_eq!(result.stdout, "hello sandbox");
        assert_eq!(result.exit_code, Some(0));
        assert!(result.success(&OutputContract::NonEmpty));
    }

    #[tokio::test]
    async fn kills_process_exceeding_timeout() {
        let mut config = SandboxConfig::new("sleep", vec!["5".into()]);
        config.timeout = DurationMs::from_millis(50);
        let result = run(&config, b"").await.unwrap();
        assert!(result.timed_out);
        assert_eq!(result.exit_code, None);
        assert!(!result.success(&OutputContract::Unconstrained));
    }

    #[tokio::test]
    async fn nonzero_exit_fails_contract_check() {
        let config = SandboxConfig::new("sh", vec!["-c".into(), "exit 1".into()]);
        let result = run(&config, b"").await.unwrap();
        assert_eq!(result.exit_code, Some(1));
        assert!(!result.success(&OutputContract::Unconstrained));
    }
}
