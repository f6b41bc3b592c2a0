#![deny(missing_docs)]
//! # forge-controller — the Generation/Repair Controller
//!
//! Drives one generation task from a task description through to a
//! stored [`forge_types::ArtifactKind::Function`]:
//!
//! `DEDUPE -> (REUSE | PLAN -> GENERATE -> STATIC -> EXECUTE -> EVALUATE -> STORE)`
//!
//! with a REPAIR loop bridging a STATIC or EXECUTE failure back to
//! another GENERATE attempt, up to [`repair::MAX_REPAIR_ATTEMPTS`]
//! tiered tries before the run gives up.
//!
//! | Module | What it holds |
//! |--------|---------------|
//! | [`controller`] | `GenerationController`, the state machine itself |
//! | [`plan`] | PLAN's structured output and parallel batching |
//! | [`generate`] | GENERATE's structured output and path-setup repair |
//! | [`repair`] | the REPAIR ladder: fix-fraud checks, tier escalation, auto-fix patterns |
//! | [`evaluate`] | EVALUATE's structured output |
//! | [`dedupe`] | the DEDUPE gate's trait, implemented by `forge-dedupe` |
//! | [`node`] | the on-disk node artifact set STORE writes |

pub mod controller;
pub mod dedupe;
pub mod evaluate;
pub mod generate;
pub mod node;
pub mod plan;
pub mod repair;

pub use controller::{ControllerConfig, ControllerOutcome, GenerationController};
pub use dedupe::{DedupeGate, DedupeOutcome};
pub use evaluate::EvaluationScore;
pub use generate::GenerationResult;
pub use node::{NodeArtifacts, PostStoreMeasurements};
pub use plan::{Plan, PlanStep};
pub use repair::{FixPattern, RepairAttempt};
