//! # forge-core — shared primitives for the codeforge workspace
//!
//! This crate has no behavior of its own. It holds the typed ids, the
//! `DurationMs` wire type, the tier enums used to pick a model backend,
//! and the unified [`error::ForgeError`] taxonomy that every other
//! crate in the workspace builds on.
//!
//! | Module | What it holds |
//! |--------|---------------|
//! | [`id`] | `ArtifactId`, `ToolId`, `NodeId`, `SessionId`, `ClusterId`, tier enums |
//! | [`duration`] | [`DurationMs`], a stable-JSON millisecond duration |
//! | [`error`] | [`error::ForgeError`], [`error::FailureResult`] |
//!
//! ## Dependency Notes
//!
//! Depends on `serde_json::Value` transitively through the crates
//! above it, but this crate itself only needs `serde` + `thiserror`.

#![deny(missing_docs)]

pub mod duration;
pub mod error;
pub mod id;

pub use duration::DurationMs;
pub use error::{FailureResult, ForgeError, ForgeResult};
pub use id::{ArtifactId, ClusterId, CostTier, NodeId, QualityTier, SessionId, Severity, SpeedTier, ToolId};
