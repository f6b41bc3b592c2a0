//! Typed ID wrappers for artifacts, tools, clusters, nodes, and sessions.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Typed ID wrappers prevent mixing up artifact IDs, tool IDs, etc. at
/// compile time. These are plain strings underneath — no UUID
/// enforcement, no format requirement beyond uniqueness within their
/// own namespace.
macro_rules! typed_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl $name {
            /// Create a new typed ID from anything that converts to String.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrow the inner string.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

typed_id!(ArtifactId, "Unique identifier for a stored artifact.");
typed_id!(ToolId, "Unique identifier for a registered tool.");
typed_id!(NodeId, "Unique identifier for a generation/repair run.");
typed_id!(SessionId, "Unique identifier for a conversation session.");
typed_id!(ClusterId, "Unique identifier for an artifact cluster.");

/// Relative generation speed of a model backend, used to pick a
/// fallback when the primary backend times out.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeedTier {
    /// Smallest, fastest models — used for reviewer/classifier calls.
    Fast,
    /// General-purpose default.
    Standard,
    /// Slower, used when quality matters more than latency.
    Slow,
}

/// Relative per-call cost tier of a model backend.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostTier {
    /// Cheapest available backend.
    Low,
    /// Default tier.
    Medium,
    /// Reserved for requests that explicitly ask for the best quality.
    High,
}

/// Relative output quality tier of a model backend.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityTier {
    /// Lower quality, used only as a last-resort fallback.
    Basic,
    /// Default tier.
    Standard,
    /// Highest quality, used when the task type's performance record
    /// shows repeated failures at lower tiers.
    Premium,
}

/// Severity of a static validator finding or a fix-fraud detection,
/// used to decide whether a finding blocks the repair loop or is
/// merely recorded.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Advisory only; does not block.
    Info,
    /// Should be fixed but does not block STORE.
    Warning,
    /// Blocks progression to STORE; drives REPAIR.
    Error,
}
