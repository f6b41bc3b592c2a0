//! Peak resident memory sampling for a running child process.
//!
//! Linux exposes `VmHWM` ("high water mark") in `/proc/<pid>/status`,
//! which already tracks the process's peak RSS — no need to poll and
//! take a running max ourselves, just re-read it before the process
//! exits and on every tick of the ceiling check.

use std::path::PathBuf;

/// Read the current peak resident set size, in bytes, for `pid`.
/// Returns `None` on non-Linux targets or if the proc entry is gone
/// (the process has already exited).
pub async fn peak_rss_bytes(pid: u32) -> Option<u64> {
    read_vm_hwm(PathBuf::from(format!("/proc/{pid}/status"))).await
}

async fn read_vm_hwm(status_path: PathBuf) -> Option<u64> {
    let contents = tokio::fs::read_to_string(status_path).await.ok()?;
    for line in contents.lines() {
        if let Some(rest) = line.strip_prefix("VmHWM:") {
            let kb: u64 = rest.trim().trim_end_matches(" kB").trim().parse().ok()?;
            return Some(kb * 1024);
        }
    }
    None
}

/// Poll `pid`'s peak RSS every `interval` until `ceiling_bytes` is
/// exceeded, then report it via the returned flag. Runs until the
/// process exits (detected by the proc entry disappearing) or the
/// ceiling is breached.
pub async fn watch_ceiling(pid: u32, ceiling_bytes: u64, interval: std::time::Duration) -> bool {
    loop {
        match peak_rss_bytes(pid).await {
            Some(bytes) if bytes > ceiling_bytes => return true,
            Some(_) => tokio::time::sleep(interval).await,
            None => return false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_proc_entry_returns_none() {
        assert_eq!(peak_rss_bytes(u32::MAX).await, None);
    }
}
