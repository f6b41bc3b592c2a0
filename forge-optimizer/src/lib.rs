#![deny(missing_docs)]
//! # forge-optimizer — the Cluster Optimizer
//!
//! A resumable background loop (spec §4.J) that watches similarity
//! clusters of stored artifacts, synthesizes fitter candidates from the
//! deltas of the runners-up, and promotes whichever variant clears the
//! improvement threshold.
//!
//! | Module | What it holds |
//! |--------|---------------|
//! | [`fitness`] | [`fitness::PerformanceMetrics`], [`fitness::FitnessWeights`] |
//! | [`checkpoint`] | [`checkpoint::ClusterCheckpoint`], the resumable per-cluster progress record |
//! | [`validate`] | [`validate::CandidateValidator`], the STATIC/EXECUTE/EVALUATE check for a synthesized candidate |
//! | [`optimizer`] | [`optimizer::ClusterOptimizer`], the loop itself |

pub mod checkpoint;
pub mod fitness;
pub mod optimizer;
pub mod validate;

pub use checkpoint::ClusterCheckpoint;
pub use fitness::{FitnessWeights, PerformanceMetrics};
pub use optimizer::{ClusterConfig, ClusterOptimizer, OptimizationTrigger, Strategy};
pub use validate::CandidateValidator;
