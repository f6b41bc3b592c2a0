//! Smoothing Buffer: batches high-frequency writes (usage counters,
//! telemetry) behind an on-disk journal so a burst of updates doesn't
//! hammer the Artifact Store with one write per event.

use forge_core::{DurationMs, ForgeError, ForgeResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tokio::sync::Mutex;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct JournalEntry {
    buffer_id: String,
    payload: serde_json::Value,
}

struct BufferState {
    pending: Vec<serde_json::Value>,
    opened_at: Instant,
}

/// Status snapshot for a single buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct BufferStatus {
    /// Items waiting to be flushed.
    pub pending_count: usize,
    /// How long the oldest pending item has been waiting.
    pub age: DurationMs,
}

/// Accepts items addressed by a `buffer_id`, flushing to a downstream
/// sink when a buffer reaches `max_size` items or `flush_interval` age.
/// Survives process restarts via an append-only on-disk journal keyed
/// by `buffer_id`.
pub struct SmoothingBuffer {
    journal_path: PathBuf,
    max_size: usize,
    flush_interval: DurationMs,
    buffers: Mutex<HashMap<String, BufferState>>,
}

impl SmoothingBuffer {
    /// Create a buffer journaling to `journal_path`, flushing at
    /// `max_size` items or `flush_interval` age, whichever comes
    /// first.
    pub fn new(journal_path: impl Into<PathBuf>, max_size: usize, flush_interval: DurationMs) -> Self {
        Self {
            journal_path: journal_path.into(),
            max_size: max_size.max(1),
            flush_interval,
            buffers: Mutex::new(HashMap::new()),
        }
    }

    /// Replay the on-disk journal into memory, restoring buffers
    /// across a process restart.
    pub async fn restore(&self) -> ForgeResult<()> {
        let contents = match tokio::fs::read_to_string(&self.journal_path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(ForgeError::StorageError(format!("read journal failed: {e}"))),
        };
        let mut buffers = self.buffers.lock().await;
        for line in contents.lines() {
            if line.trim().is_empty() {
                continue;
            }
            let entry: JournalEntry = serde_json::from_str(line)
                .map_err(|e| ForgeError::StorageError(format!("corrupt journal line: {e}")))?;
            buffers
                .entry(entry.buffer_id)
                .or_insert_with(|| BufferState {
                    pending: Vec::new(),
                    opened_at: Instant::now(),
                })
                .pending
                .push(entry.payload);
        }
        Ok(())
    }

    /// Append `payload` to `buffer_id`, journaling it durably before
    /// returning. Returns `true` if the caller should now call
    /// [`SmoothingBuffer::flush`] (size or age threshold reached).
    pub async fn write(&self, buffer_id: &str, payload: serde_json::Value) -> ForgeResult<bool> {
        let entry = JournalEntry {
            buffer_id: buffer_id.to_string(),
            payload: payload.clone(),
        };
        let line = serde_json::to_string(&entry)
            .map_err(|e| ForgeError::StorageError(format!("serialize journal entry failed: {e}")))?;
        append_line(&self.journal_path, &line).await?;

        let mut buffers = self.buffers.lock().await;
        let state = buffers.entry(buffer_id.to_string()).or_insert_with(|| BufferState {
            pending: Vec::new(),
            opened_at: Instant::now(),
        });
        state.pending.push(payload);
        let should_flush = state.pending.len() >= self.max_size
            || state.opened_at.elapsed() >= self.flush_interval.to_std();
        Ok(should_flush)
    }

    /// Drain and return all pending items for `buffer_id`, clearing
    /// its journal entries. Callers are responsible for actually
    /// writing the drained items downstream.
    pub async fn flush(&self, buffer_id: &str) -> ForgeResult<Vec<serde_json::Value>> {
        let mut buffers = self.buffers.lock().await;
        let drained = buffers
            .remove(buffer_id)
            .map(|s| s.pending)
            .unwrap_or_default();
        drop(buffers);
        self.rewrite_journal_without(buffer_id).await?;
        Ok(drained)
    }

    /// Current status of `buffer_id`, or `None` if nothing is
    /// pending.
    pub async fn status(&self, buffer_id: &str) -> Option<BufferStatus> {
        let buffers = self.buffers.lock().await;
        buffers.get(buffer_id).map(|s| BufferStatus {
            pending_count: s.pending.len(),
            age: DurationMs::from(s.opened_at.elapsed()),
        })
    }

    /// Discard `buffer_id`'s pending items without flushing them
    /// downstream.
    pub async fn clear(&self, buffer_id: &str) -> ForgeResult<()> {
        self.buffers.lock().await.remove(buffer_id);
        self.rewrite_journal_without(buffer_id).await
    }

    async fn rewrite_journal_without(&self, buffer_id: &str) -> ForgeResult<()> {
        let buffers = self.buffers.lock().await;
        let mut lines = Vec::new();
        for (id, state) in buffers.iter() {
            if id == buffer_id {
                continue;
            }
            for payload in &state.pending {
                let entry = JournalEntry {
                    buffer_id: id.clone(),
                    payload: payload.clone(),
                };
                lines.push(
                    serde_json::to_string(&entry)
                        .map_err(|e| ForgeError::StorageError(format!("serialize journal entry failed: {e}")))?,
                );
            }
        }
        let contents = lines.join("\n");
        let tmp = self.journal_path.with_extension("tmp");
        tokio::fs::write(&tmp, contents)
            .await
            .map_err(|e| ForgeError::StorageError(format!("write journal failed: {e}")))?;
        tokio::fs::rename(&tmp, &self.journal_path)
            .await
            .map_err(|e| ForgeError::StorageError(format!("rename journal failed: {e}")))?;
        Ok(())
    }
}

async fn append_line(path: &Path, line: &str) -> ForgeResult<()> {
    use tokio::io::AsyncWriteExt;
    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await
        .map_err(|e| ForgeError::StorageError(format!("open journal failed: {e}")))?;
    file.write_all(line.as_bytes())
        .await
        .map_err(|e| ForgeError::StorageError(format!("append journal failed: {e}")))?;
    file.write_all(b"\n")
        .await
        .map_err(|e| ForgeError::StorageError(format!("append journal failed: {e}")))?;
    Ok(())
}
