//! Resilient fallback: rank candidate tools for a scenario, call the
//! top-ranked one, and retry against the next-best on failure.

use crate::{Runtime, ToolOutput};
use forge_core::{ArtifactId, ForgeError, ForgeResult, ToolId};
use forge_store::LookupFilter;
use forge_types::{Artifact, ArtifactKind, FailureRecord, FailureSeverity};
use std::collections::HashSet;

/// Prior FAILURE artifacts with at least this cosine similarity to the
/// current scenario count against a candidate's score.
const FAILURE_SIMILARITY_FLOOR: f32 = 0.7;
/// Weight applied to each qualifying prior failure's similarity.
const FAILURE_PENALTY_WEIGHT: f32 = 0.3;
/// How many Tool-kind candidates to pull per ranking pass.
const CANDIDATE_POOL: usize = 20;

impl Runtime {
    /// Ask the Artifact Store for tools matching `scenario_text`
    /// (optionally tag-filtered), call the best-ranked one, and on
    /// failure record a FAILURE artifact, exclude that tool, re-rank, and
    /// retry until `max_attempts` or candidate exhaustion.
    pub async fn call_tool_resilient(
        &self,
        scenario_text: &str,
        prompt: &str,
        kwargs: serde_json::Value,
        tags: Option<Vec<String>>,
        max_attempts: u32,
    ) -> ForgeResult<ToolOutput> {
        let mut excluded: HashSet<ToolId> = HashSet::new();
        let mut last_err: Option<ForgeError> = None;

        for _ in 0..max_attempts.max(1) {
            let ranked = self.rank_candidates(scenario_text, tags.as_deref(), &excluded).await?;
            let Some((tool_id, _score)) = ranked.into_iter().next() else {
                break;
            };
            match self.call_tool(&tool_id, None, prompt, kwargs.clone(), None).await {
                Ok(output) => return Ok(output),
                Err(e) => {
                    self.record_failure(&tool_id, scenario_text, &e).await?;
                    excluded.insert(tool_id);
                    last_err = Some(e);
                }
            }
        }

        Err(last_err.unwrap_or_else(|| ForgeError::ToolInvocationError {
            tool: "resilient".to_string(),
            message: format!("no candidate tool found for scenario: {scenario_text}"),
        }))
    }

    async fn rank_candidates(
        &self,
        scenario_text: &str,
        tags: Option<&[String]>,
        excluded: &HashSet<ToolId>,
    ) -> ForgeResult<Vec<(ToolId, f32)>> {
        let hits = self
            .store
            .find_similar(
                scenario_text,
                LookupFilter {
                    kind: Some(ArtifactKind::Tool),
                    tags: tags.map(<[String]>::to_vec),
                    match_all_tags: false,
                },
                CANDIDATE_POOL,
                0.0,
            )
            .await?;

        let mut scored = Vec::with_capacity(hits.len());
        for hit in hits {
            let tool_id = ToolId::from(hit.artifact.artifact_id.0.clone());
            if excluded.contains(&tool_id) {
                continue;
            }
            let penalty = self.failure_penalty(&tool_id, scenario_text).await?;
            let score = hit.artifact.quality_score() * (1.0 - penalty);
            scored.push((tool_id, score));
        }
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        Ok(scored)
    }

    async fn failure_penalty(&self, tool_id: &ToolId, scenario_text: &str) -> ForgeResult<f32> {
        let hits = self
            .store
            .find_similar(
                scenario_text,
                LookupFilter {
                    kind: Some(ArtifactKind::Failure),
                    tags: Some(vec![format!("tool:{}", tool_id.as_str())]),
                    match_all_tags: true,
                },
                CANDIDATE_POOL,
                FAILURE_SIMILARITY_FLOOR,
            )
            .await?;
        Ok(hits.iter().map(|hit| FAILURE_PENALTY_WEIGHT * hit.score).sum())
    }

    async fn record_failure(&self, tool_id: &ToolId, scenario_text: &str, error: &ForgeError) -> ForgeResult<()> {
        tracing::warn!(tool = %tool_id, error = %error, "resilient dispatch: tool failed, excluding for remainder of call");
        let record = FailureRecord::new(
            tool_id.clone(),
            scenario_text.to_string(),
            error.to_string(),
            FailureSeverity::Medium,
        );
        let content = serde_json::to_string(&record)
            .map_err(|e| ForgeError::StorageError(format!("serialize failure record: {e}")))?;
        let now = chrono::Utc::now();
        let artifact_id = ArtifactId::new(format!("failure-{}-{}", tool_id.as_str(), now.timestamp_nanos_opt().unwrap_or_default()));
        let mut artifact = Artifact::new(
            artifact_id,
            ArtifactKind::Failure,
            format!("failure: {tool_id}"),
            "resilient dispatch failure",
            content,
            now,
        );
        artifact.add_tag(format!("tool:{}", tool_id.as_str()));
        artifact.metadata.set_target_tool_id(tool_id.as_str());
        self.store
            .store(artifact, forge_store::StoreOptions::default_auto_embed())
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::test_runtime;
    use forge_core::{CostTier, QualityTier, SpeedTier};
    use forge_types::{InvocationSpec, ToolDescriptor, ToolKind, VersionTriple};

    fn cat_descriptor(tool_id: &str) -> ToolDescriptor {
        ToolDescriptor {
            tool_id: ToolId::from(tool_id),
            tool_kind: ToolKind::Executable,
            invocation: InvocationSpec::Executable {
                interpreter: "cat".to_string(),
                path: String::new(),
            },
            tags: vec!["format-code".to_string()],
            priority: 0,
            speed_tier: SpeedTier::Standard,
            cost_tier: CostTier::Medium,
            quality_tier: QualityTier::Standard,
            routing_keywords: vec!["format".to_string()],
            track_usage: false,
            version: VersionTriple::initial(),
            lineage_parent: None,
        }
    }

    fn failing_descriptor(tool_id: &str) -> ToolDescriptor {
        ToolDescriptor {
            tool_id: ToolId::from(tool_id),
            tool_kind: ToolKind::Executable,
            invocation: InvocationSpec::Executable {
                interpreter: "false".to_string(),
                path: String::new(),
            },
            tags: vec!["format-code".to_string()],
            priority: 1,
            speed_tier: SpeedTier::Standard,
            cost_tier: CostTier::Medium,
            quality_tier: QualityTier::Standard,
            routing_keywords: vec!["format".to_string()],
            track_usage: false,
            version: VersionTriple::initial(),
            lineage_parent: None,
        }
    }

    #[tokio::test]
    async fn falls_back_past_a_failing_candidate() {
        let (runtime, root) = test_runtime().await;
        std::fs::create_dir_all(root.join("good_formatter")).unwrap();
        std::fs::create_dir_all(root.join("bad_formatter")).unwrap();
        runtime.registry.register(failing_descriptor("bad_formatter")).await.unwrap();
        runtime.registry.register(cat_descriptor("good_formatter")).await.unwrap();

        let output = runtime
            .call_tool_resilient("format this code please", "fn x() {}", serde_json::json!({}), None, 4)
            .await
            .unwrap();
        assert_eq!(output.text, "fn x() {}");
    }

    #[tokio::test]
    async fn exhausting_attempts_surfaces_last_error() {
        let (runtime, root) = test_runtime().await;
        std::fs::create_dir_all(root.join("bad_formatter")).unwrap();
        runtime.registry.register(failing_descriptor("bad_formatter")).await.unwrap();

        let result = runtime
            .call_tool_resilient("format this code please", "fn x() {}", serde_json::json!({}), None, 2)
            .await;
        assert!(result.is_err());
    }
}
