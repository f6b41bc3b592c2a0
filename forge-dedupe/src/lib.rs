#![deny(missing_docs)]
//! # forge-dedupe — the Deduplication Gate
//!
//! Implements [`forge_controller::DedupeGate`]: given a task description,
//! decide whether an existing `Function`/`Workflow` artifact is close
//! enough to reuse, ask a reviewer tool when the match is ambiguous, or
//! fall through to generation.
//!
//! | Module | What it holds |
//! |--------|---------------|
//! | [`gate`] | `SimilarityDedupeGate`, the trait implementation |
//! | [`tags`] | declarative tag-enrichment patterns used to bias retrieval |

pub mod gate;
pub mod tags;

pub use gate::{DedupeThresholds, SimilarityDedupeGate};
pub use tags::enrich_tags;
