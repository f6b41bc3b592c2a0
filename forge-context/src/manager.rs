//! Session-scoped dialog memory: [`ContextManager`] holds the ordered
//! message list for one session, hands back a budget-fitting bundle on
//! every turn, and can be asked for cross-session digests of prior,
//! related conversations.

use crate::budget::{ModelBudget, TokenEstimator};
use crate::message::{Message, TurnPerformance};
use chrono::{DateTime, Utc};
use forge_core::{ArtifactId, ForgeError, ForgeResult, SessionId};
use forge_router::{ModelTier, ProviderRequest, Router, RoutingConstraints};
use forge_store::{ArtifactStore, LookupFilter, StoreOptions};
use forge_types::{Artifact, ArtifactKind};
use std::sync::Arc;

/// Reserve left for the summary message itself when compacting, so the
/// freshly-produced summary doesn't immediately blow the same budget
/// that triggered it.
const SUMMARY_RESERVE_TOKENS: usize = 300;

/// The messages to actually send for a turn, and whether compaction
/// fired to produce them.
#[derive(Debug, Clone)]
pub struct ContextBundle {
    /// Messages in order: an optional leading summary, then as much
    /// recent history as fit, then the new user message.
    pub messages: Vec<Message>,
    /// Whether older messages were folded into a summary this turn.
    pub summarized: bool,
}

/// A compact cross-session digest returned by [`ContextManager::related`].
#[derive(Debug, Clone)]
pub struct PriorSessionDigest {
    /// The session the digest came from.
    pub session_id: SessionId,
    /// The stored digest text.
    pub digest: String,
    /// Similarity score against the new message.
    pub score: f32,
}

/// Per-session dialog memory.
pub struct ContextManager {
    session_id: SessionId,
    messages: Vec<Message>,
    estimator: TokenEstimator,
    router: Arc<Router>,
    store: Arc<dyn ArtifactStore>,
    summarizer_task_kind: String,
}

impl ContextManager {
    /// A fresh manager for `session_id`, with no prior messages.
    pub fn new(session_id: SessionId, router: Arc<Router>, store: Arc<dyn ArtifactStore>, summarizer_task_kind: impl Into<String>) -> Self {
        Self { session_id, messages: Vec::new(), estimator: TokenEstimator::default(), router, store, summarizer_task_kind: summarizer_task_kind.into() }
    }

    /// The session this manager tracks.
    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Append a completed turn's two messages.
    pub fn record_turn(&mut self, user_text: impl Into<String>, assistant_text: impl Into<String>, now: DateTime<Utc>, performance: Option<TurnPerformance>) {
        self.messages.push(Message::user(user_text, now));
        self.messages.push(Message::assistant(assistant_text, now, performance));
    }

    /// Build the context to send for `new_user_message` against
    /// `target`'s budget. If the stored history plus the new message
    /// fits, it's returned as-is; otherwise older messages are folded
    /// into a single summary produced by a cheap-model call.
    pub async fn prepare_context(&mut self, new_user_message: &str, target: &ModelBudget) -> ForgeResult<ContextBundle> {
        let incoming = Message::user(new_user_message, Utc::now());
        let mut candidate = self.messages.clone();
        candidate.push(incoming.clone());

        let budget = target.history_budget();
        if self.estimator.total_tokens(&candidate) <= budget {
            return Ok(ContextBundle { messages: candidate, summarized: false });
        }

        let kept_budget = budget.saturating_sub(SUMMARY_RESERVE_TOKENS);
        let mut kept = Vec::new();
        let mut kept_tokens = self.estimator.message_tokens(&incoming);
        for message in self.messages.iter().rev() {
            let tokens = self.estimator.message_tokens(message);
            if kept_tokens + tokens > kept_budget && !kept.is_empty() {
                break;
            }
            kept.push(message.clone());
            kept_tokens += tokens;
        }
        kept.reverse();

        let fold_count = self.messages.len() - kept.len();
        let to_fold = &self.messages[..fold_count];
        let bundle = if to_fold.is_empty() {
            let mut messages = kept;
            messages.push(incoming);
            ContextBundle { messages, summarized: false }
        } else {
            let summary_text = self.summarize(to_fold).await?;
            let mut messages = vec![Message::summary(summary_text, Utc::now())];
            messages.extend(kept);
            messages.push(incoming);
            ContextBundle { messages, summarized: true }
        };
        Ok(bundle)
    }

    async fn summarize(&self, messages: &[Message]) -> ForgeResult<String> {
        let transcript = messages
            .iter()
            .map(|m| format!("{:?}: {}", m.role, m.text))
            .collect::<Vec<_>>()
            .join("\n");
        let prompt = format!(
            "Summarize this conversation excerpt in a few sentences. Preserve every named entity and every decision that was made; drop small talk and restated context.\n\n{transcript}"
        );
        let request = ProviderRequest {
            model: String::new(),
            system: None,
            prompt,
            max_tokens: Some(400),
            temperature: Some(0.2),
            extra: serde_json::json!({}),
        };
        let constraints = RoutingConstraints { min_tier: Some(ModelTier::Fast) };
        let response = self
            .router
            .generate(&self.summarizer_task_kind, constraints, request)
            .await
            .map_err(|e| ForgeError::TransientBackendError(e.to_string()))?;
        Ok(response.text)
    }

    /// Semantic search over stored `Conversation` artifacts for
    /// cross-session context related to `new_user_message`.
    pub async fn related(&self, new_user_message: &str, limit: usize) -> ForgeResult<Vec<PriorSessionDigest>> {
        let filter = LookupFilter { kind: Some(ArtifactKind::Conversation), tags: None, match_all_tags: false };
        let hits = self.store.find_similar(new_user_message, filter, limit, 0.0).await?;
        Ok(hits
            .into_iter()
            .filter(|h| h.artifact.metadata.get("session_id").and_then(|v| v.as_str()).map(SessionId::from) != Some(self.session_id.clone()))
            .map(|h| PriorSessionDigest {
                session_id: h
                    .artifact
                    .metadata
                    .get("session_id")
                    .and_then(|v| v.as_str())
                    .map(SessionId::from)
                    .unwrap_or_else(|| SessionId::from("unknown")),
                digest: h.artifact.description.clone(),
                score: h.score,
            })
            .collect())
    }

    /// Store this session's transcript as a `Conversation` artifact.
    /// Callers typically call this at session end; the Deduplication
    /// Gate's reviewer step is permitted to call it mid-session too.
    pub async fn store_digest(&self, digest: impl Into<String>, now: DateTime<Utc>) -> ForgeResult<ArtifactId> {
        let digest = digest.into();
        let content = self
            .messages
            .iter()
            .map(|m| format!("{:?}: {}", m.role, m.text))
            .collect::<Vec<_>>()
            .join("\n");
        let mut artifact = Artifact::new(
            ArtifactId::from(format!("conversation-{}-{}", self.session_id.as_str(), now.timestamp_nanos_opt().unwrap_or_default())),
            ArtifactKind::Conversation,
            format!("session {}", self.session_id),
            digest,
            content,
            now,
        );
        artifact.metadata.set("session_id", serde_json::json!(self.session_id.as_str()));
        self.store.store(artifact, StoreOptions::default_auto_embed()).await
    }
}
