//! The controller's view of the Deduplication Gate.
//!
//! forge-controller is built before the crate that implements
//! deduplication, so the dependency runs the other way: the consumer
//! (this crate) defines the trait, and `forge-dedupe` implements it.
//! DEDUPE stays a pluggable check from the controller's point of
//! view — a run with no gate configured always misses and falls
//! through to PLAN.

use async_trait::async_trait;
use forge_core::ForgeResult;
use forge_types::Artifact;

/// Outcome of a DEDUPE check against a task description.
#[derive(Debug, Clone)]
pub enum DedupeOutcome {
    /// An existing artifact already satisfies this task closely enough
    /// to reuse directly; the controller skips straight to REUSE.
    Hit(Artifact),
    /// Nothing close enough exists; proceed to PLAN.
    Miss,
}

/// The DEDUPE state's contract: given a task description and its
/// tags, decide whether an existing artifact can be reused instead of
/// regenerating.
#[async_trait]
pub trait DedupeGate: Send + Sync {
    /// Check for a reusable artifact. Implementations decide their own
    /// similarity thresholds; the controller treats this as a single
    /// hit-or-miss decision.
    async fn check(&self, task_description: &str, tags: &[String]) -> ForgeResult<DedupeOutcome>;
}
