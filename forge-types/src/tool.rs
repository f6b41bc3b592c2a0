//! Tool descriptors: the declarative definitions loaded by the Tool
//! Registry.

use forge_core::{CostTier, QualityTier, SpeedTier, ToolId};
use serde::{Deserialize, Serialize};

/// What kind of thing a tool invokes.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    /// Invoked by sending a prompt to a model backend.
    LanguageModel,
    /// Invoked as a subprocess with a JSON-in/JSON-out contract.
    Executable,
    /// Invoked by running a stored workflow node.
    Workflow,
    /// Invoked over HTTP against a remote API.
    RemoteApi,
}

/// How to actually invoke a tool, one shape per [`ToolKind`]. The
/// `Custom` variant is the escape hatch for an invocation shape that
/// hasn't earned a named variant yet.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InvocationSpec {
    /// A prompt template plus the model role to route it to.
    LanguageModel {
        /// Prompt template, with `{{placeholders}}` filled by the caller.
        prompt_template: String,
        /// Logical model role, e.g. `"reviewer"` or `"planner"`, that
        /// the Router resolves to a concrete backend.
        model_role: String,
    },
    /// An interpreter + path pair, invoked with JSON on stdin and JSON
    /// expected on stdout.
    Executable {
        /// Interpreter binary, e.g. `"python3"` or the empty string for
        /// a directly-executable binary.
        interpreter: String,
        /// Path to the script or binary, relative to the tool's node
        /// directory.
        path: String,
    },
    /// A reference to a stored workflow node directory.
    Workflow {
        /// Node directory to execute.
        node_id: String,
    },
    /// An HTTP endpoint and operation.
    RemoteApi {
        /// Base endpoint URL.
        endpoint: String,
        /// Operation name or path segment appended to the endpoint.
        operation: String,
    },
    /// Future invocation shapes.
    Custom {
        /// Identifier for the custom invocation kind.
        kind_name: String,
        /// Arbitrary invocation payload.
        spec: serde_json::Value,
    },
}

/// `(major, minor, patch)` version triple for a [`ToolDescriptor`].
/// Mutations always produce a new version with a lineage pointer to
/// the parent, never an in-place edit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VersionTriple(pub u32, pub u32, pub u32);

impl VersionTriple {
    /// The initial version, `0.1.0`.
    pub fn initial() -> Self {
        Self(0, 1, 0)
    }

    /// Bump patch, leaving major/minor unchanged.
    pub fn bump_patch(self) -> Self {
        Self(self.0, self.1, self.2 + 1)
    }

    /// Bump minor, resetting patch to zero.
    pub fn bump_minor(self) -> Self {
        Self(self.0, self.1 + 1, 0)
    }

    /// Bump major, resetting minor and patch to zero.
    pub fn bump_major(self) -> Self {
        Self(self.0 + 1, 0, 0)
    }
}

impl std::fmt::Display for VersionTriple {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.0, self.1, self.2)
    }
}

/// A declarative tool definition loaded by the Tool Registry from a
/// descriptor file on disk.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// Stable identifier.
    pub tool_id: ToolId,
    /// What kind of tool this is.
    pub tool_kind: ToolKind,
    /// How to invoke it.
    pub invocation: InvocationSpec,
    /// Routing/search tags.
    pub tags: Vec<String>,
    /// Ordering hint among otherwise-equal candidates; higher wins.
    pub priority: i32,
    /// Relative speed tier, used by the Router's fallback selection.
    pub speed_tier: SpeedTier,
    /// Relative cost tier.
    pub cost_tier: CostTier,
    /// Relative quality tier.
    pub quality_tier: QualityTier,
    /// Free-text keywords the Router matches against a request to
    /// shortlist candidate tools before scoring by fitness.
    pub routing_keywords: Vec<String>,
    /// Whether invocations of this tool should update its usage
    /// counters. Disabled for throwaway/test tools.
    pub track_usage: bool,
    /// Current version.
    pub version: VersionTriple,
    /// The tool this version was derived from, if any.
    #[serde(default)]
    pub lineage_parent: Option<ToolId>,
}

impl ToolDescriptor {
    /// Produce the next version of this descriptor with an updated
    /// invocation spec, pointing its lineage at `self`.
    pub fn new_version(&self, invocation: InvocationSpec, bump: VersionBump) -> Self {
        let version = match bump {
            VersionBump::Patch => self.version.bump_patch(),
            VersionBump::Minor => self.version.bump_minor(),
            VersionBump::Major => self.version.bump_major(),
        };
        Self {
            tool_id: self.tool_id.clone(),
            invocation,
            version,
            lineage_parent: Some(self.tool_id.clone()),
            ..self.clone()
        }
    }
}

/// Which component of a version triple a mutation bumps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionBump {
    /// Backwards-compatible fix.
    Patch,
    /// Backwards-compatible addition.
    Minor,
    /// Breaking change.
    Major,
}
