//! The Tool Registry: descriptor storage, session-local shadowing, and
//! capability search.

use crate::versioning::classify;
use chrono::Utc;
use forge_core::{ForgeError, ForgeResult, SessionId, ToolId};
use forge_store::{ArtifactStore, LookupFilter, StoreOptions};
use forge_types::{Artifact, ArtifactKind, InvocationSpec, ToolDescriptor, ToolKind};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Registry of tool descriptors, backed by an [`ArtifactStore`] for
/// `find_by_capability`'s semantic search over tool descriptions.
///
/// Every descriptor registered here is mirrored into the store as a
/// `Tool`-kind artifact; the registry itself is the source of truth
/// for dispatch, the store mirror only exists to be searched.
pub struct ToolRegistry {
    store: Arc<dyn ArtifactStore>,
    base: RwLock<HashMap<ToolId, ToolDescriptor>>,
    session_overlay: RwLock<HashMap<SessionId, HashMap<ToolId, ToolDescriptor>>>,
}

impl ToolRegistry {
    /// Create an empty registry that mirrors tool descriptions into
    /// `store`.
    pub fn new(store: Arc<dyn ArtifactStore>) -> Self {
        Self {
            store,
            base: RwLock::new(HashMap::new()),
            session_overlay: RwLock::new(HashMap::new()),
        }
    }

    /// Load every descriptor found under `root`, discarding invalid
    /// files (already logged by [`crate::loader::load_descriptors`]).
    pub async fn load_from_directory(&self, root: &std::path::Path) -> ForgeResult<usize> {
        let descriptors = crate::loader::load_descriptors(root).await;
        let count = descriptors.len();
        for descriptor in descriptors {
            self.register(descriptor).await?;
        }
        Ok(count)
    }

    /// Register (or overwrite) a descriptor, mirroring it into the
    /// Artifact Store for capability search.
    pub async fn register(&self, descriptor: ToolDescriptor) -> ForgeResult<()> {
        let artifact_id = forge_core::ArtifactId::from(descriptor.tool_id.0.clone());
        let description = describe_invocation(&descriptor.invocation);
        let mut artifact = Artifact::new(
            artifact_id,
            ArtifactKind::Tool,
            descriptor.tool_id.as_str(),
            description.clone(),
            description,
            Utc::now(),
        );
        artifact.set_tags(descriptor.tags.iter().cloned());
        self.store
            .store(
                artifact,
                StoreOptions {
                    auto_embed: true,
                    overwrite: true,
                },
            )
            .await?;
        self.base
            .write()
            .await
            .insert(descriptor.tool_id.clone(), descriptor);
        Ok(())
    }

    /// Look up a tool, preferring a session-local promotion over the
    /// on-disk descriptor.
    pub async fn get(&self, tool_id: &ToolId, session: Option<&SessionId>) -> Option<ToolDescriptor> {
        if let Some(session) = session {
            if let Some(overlay) = self.session_overlay.read().await.get(session) {
                if let Some(descriptor) = overlay.get(tool_id) {
                    return Some(descriptor.clone());
                }
            }
        }
        self.base.read().await.get(tool_id).cloned()
    }

    /// Shadow `tool_id` with `descriptor` for the duration of
    /// `session`, without mutating the on-disk descriptor.
    pub async fn promote_for_session(&self, session: SessionId, descriptor: ToolDescriptor) {
        self.session_overlay
            .write()
            .await
            .entry(session)
            .or_default()
            .insert(descriptor.tool_id.clone(), descriptor);
    }

    /// All descriptors matching every tag in `tags` (or any, per
    /// `match_all`).
    pub async fn find_by_tags(&self, tags: &[String], match_all: bool) -> Vec<ToolDescriptor> {
        self.base
            .read()
            .await
            .values()
            .filter(|d| {
                let has = |t: &String| d.tags.contains(t);
                if match_all {
                    tags.iter().all(has)
                } else {
                    tags.iter().any(has)
                }
            })
            .cloned()
            .collect()
    }

    /// All descriptors of a given kind.
    pub async fn find_by_kind(&self, kind: ToolKind) -> Vec<ToolDescriptor> {
        self.base
            .read()
            .await
            .values()
            .filter(|d| d.tool_kind == kind)
            .cloned()
            .collect()
    }

    /// Semantic search over tool descriptions via the Artifact Store,
    /// resolved back to full descriptors.
    pub async fn find_by_capability(&self, query_text: &str, limit: usize) -> ForgeResult<Vec<ToolDescriptor>> {
        let hits = self
            .store
            .find_similar(
                query_text,
                LookupFilter {
                    kind: Some(ArtifactKind::Tool),
                    tags: None,
                    match_all_tags: false,
                },
                limit,
                0.0,
            )
            .await?;
        let base = self.base.read().await;
        Ok(hits
            .into_iter()
            .filter_map(|hit| {
                let tool_id = ToolId::from(hit.artifact.artifact_id.0);
                base.get(&tool_id).cloned()
            })
            .collect())
    }

    /// Classify a proposed invocation change against the current
    /// descriptor and, if not a major change, apply it and return the
    /// new descriptor. Major changes return `Err` so the caller can
    /// re-invoke after obtaining explicit confirmation (see
    /// [`crate::versioning::MutationClass::MajorRequiresConfirmation`]).
    pub async fn propose_mutation(
        &self,
        tool_id: &ToolId,
        new_invocation: InvocationSpec,
    ) -> ForgeResult<ToolDescriptor> {
        let base = self.base.read().await;
        let current = base
            .get(tool_id)
            .ok_or_else(|| ForgeError::StorageError(format!("tool {tool_id} not found")))?;
        let class = classify(current, &new_invocation);
        let bump = Option::from(class).ok_or_else(|| {
            ForgeError::ProtectedResourceError {
                resource: tool_id.to_string(),
                reason: "breaking invocation change requires explicit confirmation".to_string(),
            }
        })?;
        Ok(current.new_version(new_invocation, bump))
    }

    /// Apply a confirmed major-version mutation regardless of
    /// classification, used once the caller has confirmed the
    /// breaking change.
    pub async fn apply_confirmed_mutation(
        &self,
        tool_id: &ToolId,
        new_invocation: InvocationSpec,
        bump: forge_types::VersionBump,
    ) -> ForgeResult<()> {
        let next = {
            let base = self.base.read().await;
            let current = base
                .get(tool_id)
                .ok_or_else(|| ForgeError::StorageError(format!("tool {tool_id} not found")))?;
            current.new_version(new_invocation, bump)
        };
        self.register(next).await
    }
}

fn describe_invocation(invocation: &InvocationSpec) -> String {
    match invocation {
        InvocationSpec::LanguageModel { model_role, .. } => {
            format!("language model tool routed via role {model_role}")
        }
        InvocationSpec::Executable { interpreter, path } => {
            format!("executable tool: {interpreter} {path}")
        }
        InvocationSpec::Workflow { node_id } => format!("workflow tool: {node_id}"),
        InvocationSpec::RemoteApi { endpoint, operation } => {
            format!("remote API tool: {operation} at {endpoint}")
        }
        InvocationSpec::Custom { kind_name, .. } => format!("custom tool: {kind_name}"),
        _ => unreachable!("InvocationSpec variants are exhaustively matched above"),
    }
}
