//! The similarity-tiered [`DedupeGate`] implementation.

use crate::tags::enrich_tags;
use async_trait::async_trait;
use forge_controller::{DedupeGate, DedupeOutcome};
use forge_core::{ForgeError, ForgeResult, ToolId};
use forge_runtime::Runtime;
use forge_store::{ArtifactStore, LookupFilter};
use forge_types::ArtifactKind;
use serde::Deserialize;
use std::sync::Arc;

/// Similarity thresholds driving the REUSE / ask-a-reviewer / regenerate
/// decision. Defaults match the spec's examples.
#[derive(Debug, Clone, Copy)]
pub struct DedupeThresholds {
    /// At or above this similarity, reuse without asking a reviewer.
    pub exact_threshold: f32,
    /// At or above this similarity (but below `exact_threshold`), ask
    /// the reviewer tool.
    pub review_threshold: f32,
}

impl Default for DedupeThresholds {
    fn default() -> Self {
        Self { exact_threshold: 0.98, review_threshold: 0.95 }
    }
}

/// How many candidates to pull from the store before picking the top
/// match.
const CANDIDATE_LIMIT: usize = 10;

/// Similarity bonus per overlapping tag between the request's hint
/// tags and a candidate's own tags, capped so tag overlap can tip a
/// close call but never manufacture a reuse out of an unrelated match.
const TAG_BIAS_PER_MATCH: f32 = 0.01;
const TAG_BIAS_CAP: f32 = 0.03;

#[derive(Debug, Deserialize)]
struct ReviewerVerdict {
    same_task: bool,
}

/// DEDUPE implemented as: embed + similarity search, tag-enriched,
/// resolved against [`DedupeThresholds`] with a reviewer tool call for
/// the review-threshold band.
pub struct SimilarityDedupeGate {
    store: Arc<dyn ArtifactStore>,
    runtime: Arc<Runtime>,
    reviewer_tool: ToolId,
    thresholds: DedupeThresholds,
}

impl SimilarityDedupeGate {
    /// Build a gate against `store` for similarity search and
    /// `runtime` to invoke `reviewer_tool` for the review-threshold
    /// band, using `thresholds` to place the similarity cutoffs.
    pub fn new(store: Arc<dyn ArtifactStore>, runtime: Arc<Runtime>, reviewer_tool: ToolId, thresholds: DedupeThresholds) -> Self {
        Self { store, runtime, reviewer_tool, thresholds }
    }

    async fn ask_reviewer(&self, task_description: &str, candidate_description: &str) -> ForgeResult<bool> {
        let prompt = format!(
            "Are these the same task? Answer as JSON {{\"same_task\": true|false}}.\n\nTASK A:\n{task_description}\n\nTASK B:\n{candidate_description}"
        );
        let text = self.runtime.call_tool(&self.reviewer_tool, None, &prompt, serde_json::json!({}), Some(true)).await?.text;
        let verdict: ReviewerVerdict = serde_json::from_str(&text)
            .map_err(|e| ForgeError::ValidationError(format!("malformed reviewer verdict: {e}")))?;
        Ok(verdict.same_task)
    }
}

#[async_trait]
impl DedupeGate for SimilarityDedupeGate {
    async fn check(&self, task_description: &str, tags: &[String]) -> ForgeResult<DedupeOutcome> {
        let mut hint_tags: Vec<String> = tags.to_vec();
        hint_tags.extend(enrich_tags(task_description));

        // Tag hints bias ranking rather than hard-filtering candidates:
        // a near-identical description with no matching tags should
        // still surface, just without the nudge a tag-aligned one gets.
        // Ask the store for raw similarity down to zero: the tag bias
        // is applied afterward, so a candidate the bias would lift into
        // the review band must not be excluded before it gets the
        // chance.
        let filter = LookupFilter { kind: None, tags: None, match_all_tags: false };
        let mut candidates = self.store.find_similar(task_description, filter, CANDIDATE_LIMIT, 0.0).await?;
        candidates.retain(|c| matches!(c.artifact.kind, ArtifactKind::Function | ArtifactKind::Workflow));

        let Some(top) = candidates.into_iter().max_by(|a, b| {
            let score_a = biased_score(a, &hint_tags);
            let score_b = biased_score(b, &hint_tags);
            score_a.total_cmp(&score_b)
        }) else {
            return Ok(DedupeOutcome::Miss);
        };
        let top_score = biased_score(&top, &hint_tags);

        if top_score >= self.thresholds.exact_threshold {
            return Ok(DedupeOutcome::Hit(top.artifact));
        }

        if top_score >= self.thresholds.review_threshold {
            let same_task = self.ask_reviewer(task_description, &top.artifact.description).await?;
            if same_task {
                return Ok(DedupeOutcome::Hit(top.artifact));
            }
        }

        Ok(DedupeOutcome::Miss)
    }
}

fn biased_score(candidate: &forge_store::ScoredArtifact, hint_tags: &[String]) -> f32 {
    let overlap = hint_tags.iter().filter(|t| candidate.artifact.tags().contains(t)).count();
    (candidate.score + overlap as f32 * TAG_BIAS_PER_MATCH).min(candidate.score + TAG_BIAS_CAP)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use forge_core::ArtifactId;
    use forge_embed::DeterministicHashEmbedder;
    use forge_router::{Provider, ProviderError, ProviderRequest, ProviderResponse};
    use forge_store::{InMemoryArtifactStore, StoreOptions};
    use forge_tool::ToolRegistry;
    use forge_types::{Artifact, InvocationSpec, ToolDescriptor, ToolKind, VersionTriple};
    use std::collections::HashMap;

    struct AlwaysSameTaskReviewer;

    #[async_trait]
    impl Provider for AlwaysSameTaskReviewer {
        async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
            Ok(ProviderResponse {
                text: r#"{"same_task": true}"#.to_string(),
                stop_reason: forge_router::StopReason::EndTurn,
                usage: forge_router::TokenUsage::default(),
                model: request.model,
                cost: None,
            })
        }
    }

    async fn harness_with_stored_function(content: &str) -> (SimilarityDedupeGate, ArtifactId) {
        std::env::set_var("FORGE_DEDUPE_TEST_KEY", "x");
        let store: Arc<dyn ArtifactStore> = Arc::new(InMemoryArtifactStore::new(Arc::new(DeterministicHashEmbedder::new(32))));
        let artifact_id = ArtifactId::from("existing-fn");
        let artifact = Artifact::new(artifact_id.clone(), ArtifactKind::Function, "existing", "an existing function", content, Utc::now());
        store.store(artifact, StoreOptions::default_auto_embed()).await.unwrap();

        let registry = Arc::new(ToolRegistry::new(Arc::clone(&store)));
        registry
            .register(ToolDescriptor {
                tool_id: ToolId::from("reviewer"),
                tool_kind: ToolKind::LanguageModel,
                invocation: InvocationSpec::LanguageModel { prompt_template: "{{prompt}}".to_string(), model_role: "reviewer".to_string() },
                tags: vec![],
                priority: 0,
                speed_tier: forge_core::SpeedTier::Fast,
                cost_tier: forge_core::CostTier::Low,
                quality_tier: forge_core::QualityTier::Standard,
                routing_keywords: vec![],
                track_usage: false,
                version: VersionTriple::initial(),
                lineage_parent: None,
            })
            .await
            .unwrap();

        let config = forge_router::RouterConfig::from_toml_str(
            r#"
            [[backends]]
            name = "stub"
            credential_env_var = "FORGE_DEDUPE_TEST_KEY"

            [[backends.models]]
            model_id = "stub-model"
            tier = "fast"
            base_timeout = 30
            expected_latency_ms = 10
            "#,
        )
        .unwrap();
        let mut providers: HashMap<String, Arc<dyn forge_router::Provider>> = HashMap::new();
        providers.insert("stub".to_string(), Arc::new(AlwaysSameTaskReviewer));
        let router = Arc::new(forge_router::Router::new(config, providers));

        let usage = Arc::new(forge_runtime::UsageTracker::new(
            std::env::temp_dir().join("forge-dedupe-test-journal.jsonl"),
            50,
            forge_core::DurationMs::from_secs(60),
            Arc::clone(&store),
        ));
        let runtime = Arc::new(Runtime::new(registry, Arc::clone(&store), router, usage, std::env::temp_dir().join("forge-dedupe-test-tools")));

        let gate = SimilarityDedupeGate::new(store, runtime, ToolId::from("reviewer"), DedupeThresholds::default());
        (gate, artifact_id)
    }

    #[tokio::test]
    async fn identical_description_hits_without_asking_the_reviewer() {
        let (gate, artifact_id) = harness_with_stored_function("def f():\n    return 1\n").await;
        match gate.check("def f():\n    return 1\n", &[]).await.unwrap() {
            DedupeOutcome::Hit(artifact) => assert_eq!(artifact.artifact_id, artifact_id),
            DedupeOutcome::Miss => panic!("expected an exact-threshold hit"),
        }
    }

    #[tokio::test]
    async fn unrelated_description_misses() {
        let (gate, _) = harness_with_stored_function("def f():\n    return 1\n").await;
        match gate.check("compile a report of quarterly sales figures as a PDF", &[]).await.unwrap() {
            DedupeOutcome::Miss => {}
            DedupeOutcome::Hit(_) => panic!("expected a miss for an unrelated description"),
        }
    }
}
