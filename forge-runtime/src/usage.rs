//! Usage-counter tracking: three precedence-ordered disable flags feeding
//! into the [`forge_tool::SmoothingBuffer`] journal, flushed into the
//! Artifact Store's `increment_usage`.

use forge_core::{ArtifactId, ForgeResult, ToolId};
use forge_store::ArtifactStore;
use forge_tool::SmoothingBuffer;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Buffers per-tool usage increments and decides, per call, whether a
/// given invocation should be counted at all.
///
/// Call-level, tool-level (`ToolDescriptor::track_usage`) and process-level
/// flags are all disable flags: any of the three being `true` turns
/// tracking off for that call, regardless of what the others say.
pub struct UsageTracker {
    buffer: SmoothingBuffer,
    store: Arc<dyn ArtifactStore>,
    process_disabled: AtomicBool,
}

impl UsageTracker {
    /// Build a tracker journaling to `journal_path`, flushing into
    /// `store`.
    pub fn new(
        journal_path: impl Into<std::path::PathBuf>,
        max_size: usize,
        flush_interval: forge_core::DurationMs,
        store: Arc<dyn ArtifactStore>,
    ) -> Self {
        Self {
            buffer: SmoothingBuffer::new(journal_path, max_size, flush_interval),
            store,
            process_disabled: AtomicBool::new(false),
        }
    }

    /// Replay the on-disk journal, restoring buffered counts across a
    /// process restart.
    pub async fn restore(&self) -> ForgeResult<()> {
        self.buffer.restore().await
    }

    /// Process-wide kill switch; disables tracking regardless of what
    /// individual tools or calls request.
    pub fn set_process_disabled(&self, disabled: bool) {
        self.process_disabled.store(disabled, Ordering::SeqCst);
    }

    /// Whether an invocation of a tool with `tool_track_usage` should be
    /// counted, given an optional call-level override.
    pub fn is_enabled(&self, tool_track_usage: bool, call_disable: Option<bool>) -> bool {
        let process_disable = self.process_disabled.load(Ordering::SeqCst);
        let tool_disable = !tool_track_usage;
        let call_disable = call_disable.unwrap_or(false);
        !(process_disable || tool_disable || call_disable)
    }

    /// Record one invocation of `tool_id`, flushing into the store if the
    /// buffer's size or age threshold is reached.
    pub async fn record(&self, tool_id: &ToolId) -> ForgeResult<()> {
        let should_flush = self
            .buffer
            .write(tool_id.as_str(), serde_json::json!({"tool_id": tool_id.as_str()}))
            .await?;
        if should_flush {
            self.flush(tool_id).await?;
        }
        Ok(())
    }

    /// Drain and apply all pending increments for `tool_id`.
    pub async fn flush(&self, tool_id: &ToolId) -> ForgeResult<()> {
        let drained = self.buffer.flush(tool_id.as_str()).await?;
        let artifact_id = ArtifactId::from(tool_id.0.clone());
        for _ in drained {
            self.store.increment_usage(&artifact_id).await?;
        }
        Ok(())
    }
}
