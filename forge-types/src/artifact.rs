//! The universal unit of storage: [`Artifact`] and its supporting types.

use chrono::{DateTime, Utc};
use forge_core::ArtifactId;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// What kind of thing an artifact represents.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// A decomposition of a request into ordered tool calls.
    Plan,
    /// A generated, reusable function.
    Function,
    /// A generated multi-step workflow.
    Workflow,
    /// A workflow invoked as a step of a larger workflow.
    SubWorkflow,
    /// A reusable prompt template.
    Prompt,
    /// A tool definition promoted from a one-off generation.
    Tool,
    /// A recurring generation/repair pattern worth reusing directly.
    Pattern,
    /// A task-type performance record.
    Performance,
    /// The result of running a validator or reviewer over an artifact.
    Evaluation,
    /// A record of a tool invocation that failed.
    Failure,
    /// A summary of an exhausted repair budget.
    BugReport,
    /// A stored conversation transcript or summary.
    Conversation,
}

/// A free-form metadata bag with typed accessors for the well-known
/// keys every component relies on, so lookups aren't scattered as
/// string literals through the codebase.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactMetadata(Map<String, Value>);

impl ArtifactMetadata {
    /// An empty metadata bag.
    pub fn new() -> Self {
        Self::default()
    }

    /// The artifact this one was derived from, if any.
    pub fn parent_id(&self) -> Option<ArtifactId> {
        self.0
            .get("parent_id")
            .and_then(Value::as_str)
            .map(ArtifactId::from)
    }

    /// Set the parent artifact id.
    pub fn set_parent_id(&mut self, id: &ArtifactId) {
        self.0
            .insert("parent_id".to_string(), Value::String(id.0.clone()));
    }

    /// The version string, for artifacts that carry one (tools,
    /// prompts).
    pub fn version(&self) -> Option<&str> {
        self.0.get("version").and_then(Value::as_str)
    }

    /// Set the version string.
    pub fn set_version(&mut self, version: impl Into<String>) {
        self.0
            .insert("version".to_string(), Value::String(version.into()));
    }

    /// The generation/repair run that produced this artifact.
    pub fn node_id(&self) -> Option<&str> {
        self.0.get("node_id").and_then(Value::as_str)
    }

    /// Set the node id.
    pub fn set_node_id(&mut self, node_id: impl Into<String>) {
        self.0
            .insert("node_id".to_string(), Value::String(node_id.into()));
    }

    /// The tool a FAILURE or EVALUATION artifact targets. Required by
    /// the data model invariant for those two kinds.
    pub fn target_tool_id(&self) -> Option<&str> {
        self.0.get("target_tool_id").and_then(Value::as_str)
    }

    /// Set the target tool id.
    pub fn set_target_tool_id(&mut self, tool_id: impl Into<String>) {
        self.0
            .insert("target_tool_id".to_string(), Value::String(tool_id.into()));
    }

    /// Arbitrary backend-specific field lookup for anything not
    /// promoted to a named accessor above.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Set an arbitrary backend-specific field.
    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), value);
    }
}

/// The universal unit of storage. Every generated plan, function,
/// workflow, prompt, tool, pattern, performance record, evaluation,
/// failure, bug report and stored conversation is an `Artifact`.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact {
    /// Stable, unique identifier.
    pub artifact_id: ArtifactId,
    /// What this artifact represents.
    pub kind: ArtifactKind,
    /// Short human-readable name.
    pub name: String,
    /// Longer description.
    pub description: String,
    /// Text/code/serialized spec payload.
    pub content: String,
    tags: Vec<String>,
    /// Fixed-dimensional embedding vector, absent until computed.
    pub embedding: Option<Vec<f32>>,
    /// Free-form extension fields.
    pub metadata: ArtifactMetadata,
    quality_score: f32,
    /// Number of times this artifact has been reused.
    pub usage_count: u64,
    /// When the artifact was first created.
    pub created_at: DateTime<Utc>,
    /// When the artifact was last mutated.
    pub last_updated_at: DateTime<Utc>,
}

impl Artifact {
    /// Create a new artifact with a freshly-deduplicated tag set and a
    /// clamped quality score. `created_at` and `last_updated_at` are
    /// both set to `now`.
    pub fn new(
        artifact_id: ArtifactId,
        kind: ArtifactKind,
        name: impl Into<String>,
        description: impl Into<String>,
        content: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            artifact_id,
            kind,
            name: name.into(),
            description: description.into(),
            content: content.into(),
            tags: Vec::new(),
            embedding: None,
            metadata: ArtifactMetadata::new(),
            quality_score: 0.5,
            usage_count: 0,
            created_at: now,
            last_updated_at: now,
        }
    }

    /// Current quality score, always in `[0, 1]`.
    pub fn quality_score(&self) -> f32 {
        self.quality_score
    }

    /// Overwrite the quality score, clamping to `[0, 1]`.
    pub fn set_quality_score(&mut self, score: f32, now: DateTime<Utc>) {
        self.quality_score = score.clamp(0.0, 1.0);
        self.last_updated_at = now;
    }

    /// Apply a signed delta to the quality score (e.g. a failure-record
    /// penalty), clamping the result.
    pub fn adjust_quality_score(&mut self, delta: f32, now: DateTime<Utc>) {
        self.set_quality_score(self.quality_score + delta, now);
    }

    /// Read-only view of the deduplicated tag set.
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Replace the tag set, deduplicating and dropping empty strings.
    pub fn set_tags(&mut self, tags: impl IntoIterator<Item = String>) {
        let mut seen = std::collections::HashSet::new();
        self.tags = tags
            .into_iter()
            .filter(|t| !t.is_empty())
            .filter(|t| seen.insert(t.clone()))
            .collect();
    }

    /// Add a single tag if not already present.
    pub fn add_tag(&mut self, tag: impl Into<String>) {
        let tag = tag.into();
        if !tag.is_empty() && !self.tags.contains(&tag) {
            self.tags.push(tag);
        }
    }

    /// Record one reuse of this artifact.
    pub fn record_usage(&mut self, now: DateTime<Utc>) {
        self.usage_count += 1;
        self.last_updated_at = now;
    }

    /// Attach an embedding, checking it matches the store's fixed
    /// dimension.
    pub fn set_embedding(&mut self, embedding: Vec<f32>, expected_dim: usize) -> Result<(), String> {
        if embedding.len() != expected_dim {
            return Err(format!(
                "embedding dimension {} does not match store dimension {}",
                embedding.len(),
                expected_dim
            ));
        }
        self.embedding = Some(embedding);
        Ok(())
    }

    /// `true` for the two kinds the data model requires to carry a
    /// `target_tool_id` in metadata.
    pub fn requires_target_tool_id(&self) -> bool {
        matches!(self.kind, ArtifactKind::Failure | ArtifactKind::Evaluation)
    }
}
