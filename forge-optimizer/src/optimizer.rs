//! The Cluster Optimizer: a resumable loop that promotes the fittest
//! variant within a similarity cluster, synthesizing new candidates
//! from the deltas of its runners-up.

use crate::checkpoint::ClusterCheckpoint;
use crate::fitness::{FitnessWeights, PerformanceMetrics};
use crate::validate::CandidateValidator;
use chrono::Utc;
use forge_controller::GenerationResult;
use forge_core::{ArtifactId, ClusterId, ForgeResult, ToolId};
use forge_runtime::Runtime;
use forge_store::{ArtifactStore, LookupFilter, ScoredArtifact, StoreOptions};
use forge_types::Artifact;
use std::sync::Arc;

/// How aggressively a synthesis pass mixes in runner-up variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Combine only the single best runner-up's delta.
    BestOfBreed,
    /// Combine up to two runners-up.
    Incremental,
    /// Combine every non-canonical variant's delta.
    Radical,
    /// Combine a moderate slice — the default.
    Hybrid,
}

impl Strategy {
    fn top_k(self, non_canonical_count: usize) -> usize {
        let k = match self {
            Strategy::BestOfBreed => 1,
            Strategy::Incremental => 2,
            Strategy::Radical => non_canonical_count,
            Strategy::Hybrid => (non_canonical_count / 2).max(1).min(3),
        };
        k.min(non_canonical_count)
    }

    fn from_name(name: &str) -> Option<Self> {
        match name {
            "best-of-breed" => Some(Strategy::BestOfBreed),
            "incremental" => Some(Strategy::Incremental),
            "radical" => Some(Strategy::Radical),
            "hybrid" => Some(Strategy::Hybrid),
            _ => None,
        }
    }
}

/// What woke the optimizer up for a given cluster. Carried through for
/// logging only — the optimization logic doesn't branch on it.
#[derive(Debug, Clone, Copy)]
pub enum OptimizationTrigger {
    /// A periodic schedule fired.
    Periodic,
    /// A resource envelope change was detected (more memory, a faster
    /// model became available).
    ResourceEnvelopeChanged,
    /// An operator asked for this cluster by name.
    Manual,
    /// A freshly stored artifact's fitness came in below the
    /// configured threshold.
    PostStore,
}

/// Tunables for one optimizer instance.
#[derive(Debug, Clone, Copy)]
pub struct ClusterConfig {
    /// Similarity floor for cluster membership.
    pub cluster_threshold: f32,
    /// Minimum fitness gain required to promote a candidate.
    pub improvement_threshold: f32,
    /// Similarity floor to the new canonical below which a variant is
    /// eligible for archival.
    pub archive_threshold: f32,
    /// Usage count floor below which a variant is eligible for
    /// archival (combined with `archive_threshold`).
    pub keep_threshold: u64,
    /// Fitness at or above which the loop stops regardless of
    /// remaining budget.
    pub target_fitness: f32,
    /// Iterations without improvement after which the loop stops.
    pub stagnation_rounds: u32,
    /// Hard ceiling on iterations for a single `run_cluster` call.
    pub iteration_budget: u32,
    /// Synthesis strategy.
    pub strategy: Strategy,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            cluster_threshold: 0.96,
            improvement_threshold: 0.05,
            archive_threshold: 0.90,
            keep_threshold: 3,
            target_fitness: 0.95,
            stagnation_rounds: 3,
            iteration_budget: 20,
            strategy: Strategy::Hybrid,
        }
    }
}

/// Drives one cluster through repeated synthesize/validate/promote/trim
/// iterations until a stop condition is reached.
pub struct ClusterOptimizer {
    store: Arc<dyn ArtifactStore>,
    runtime: Arc<Runtime>,
    validator: CandidateValidator,
    synthesis_tool: ToolId,
    workdir: std::path::PathBuf,
    config: ClusterConfig,
}

impl ClusterOptimizer {
    /// Build an optimizer against `store`/`runtime`, invoking
    /// `synthesis_tool` to combine variant deltas and validating each
    /// candidate through `validator` in scratch space under `workdir`.
    pub fn new(
        store: Arc<dyn ArtifactStore>,
        runtime: Arc<Runtime>,
        validator: CandidateValidator,
        synthesis_tool: ToolId,
        workdir: impl Into<std::path::PathBuf>,
        config: ClusterConfig,
    ) -> Self {
        Self { store, runtime, validator, synthesis_tool, workdir: workdir.into(), config }
    }

    /// Run `cluster_id`'s optimization loop from wherever its last
    /// checkpoint left off (or fresh, if none exists), stopping once no
    /// improvement lands for `stagnation_rounds` iterations, fitness
    /// reaches `target_fitness`, or `iteration_budget` is exhausted.
    pub async fn run_cluster(&self, cluster_id: ClusterId, canonical_id: ArtifactId, trigger: OptimizationTrigger) -> ForgeResult<ClusterCheckpoint> {
        let mut checkpoint = ClusterCheckpoint::load(&self.store, &cluster_id)
            .await?
            .unwrap_or_else(|| ClusterCheckpoint::fresh(cluster_id.clone(), default_strategy_queue()));
        tracing::info!(cluster_id = %cluster_id, ?trigger, resuming_at = checkpoint.attempts, "starting cluster optimization run");

        let mut canonical_id = canonical_id;
        let mut rounds_without_improvement = 0u32;

        while checkpoint.attempts < self.config.iteration_budget
            && rounds_without_improvement < self.config.stagnation_rounds
            && checkpoint.best_score < self.config.target_fitness
        {
            let Some(canonical) = self.store.get(&canonical_id).await? else {
                break;
            };
            let members = self.cluster_members(&canonical, &canonical_id).await?;
            if members.is_empty() {
                break;
            }

            let scored: Vec<(ScoredArtifact, f32)> = members
                .into_iter()
                .map(|m| {
                    let weights = FitnessWeights::for_kind(m.artifact.kind);
                    let metrics = PerformanceMetrics::from_artifact(&m.artifact);
                    let fitness = weights.score(&metrics);
                    (m, fitness)
                })
                .collect();

            let (current_best, current_fitness) = scored
                .iter()
                .max_by(|a, b| a.1.total_cmp(&b.1))
                .map(|(m, f)| (m.artifact.clone(), *f))
                .expect("cluster_members returned at least one member");
            canonical_id = current_best.artifact_id.clone();
            checkpoint.best_score = checkpoint.best_score.max(current_fitness);

            let runners_up: Vec<&Artifact> = scored
                .iter()
                .filter(|(m, _)| m.artifact.artifact_id != canonical_id)
                .map(|(m, _)| &m.artifact)
                .collect();

            let strategy = if checkpoint.pending_strategies.is_empty() {
                self.config.strategy
            } else {
                Strategy::from_name(&checkpoint.pending_strategies.remove(0)).unwrap_or(self.config.strategy)
            };

            let promoted = if runners_up.is_empty() {
                false
            } else {
                self.iterate(&mut checkpoint, &current_best, current_fitness, &runners_up, strategy).await?
            };

            if promoted {
                rounds_without_improvement = 0;
                checkpoint.last_improvement_at = Some(Utc::now());
            } else {
                rounds_without_improvement += 1;
            }
            checkpoint.attempts += 1;
            checkpoint.save(&self.store).await?;
        }

        tracing::info!(cluster_id = %cluster_id, attempts = checkpoint.attempts, best_score = checkpoint.best_score, "cluster optimization run stopped");
        Ok(checkpoint)
    }

    async fn cluster_members(&self, canonical: &Artifact, canonical_id: &ArtifactId) -> ForgeResult<Vec<ScoredArtifact>> {
        let mut hits = self
            .store
            .find_similar(&canonical.content, LookupFilter { kind: Some(canonical.kind), tags: None, match_all_tags: false }, 50, self.config.cluster_threshold)
            .await?;
        if !hits.iter().any(|h| &h.artifact.artifact_id == canonical_id) {
            hits.push(ScoredArtifact { artifact: canonical.clone(), score: 1.0 });
        }
        Ok(hits)
    }

    /// One iteration: synthesize a candidate from the canonical plus
    /// the strategy's slice of runner-up deltas, validate it, and
    /// promote it if it clears `improvement_threshold`. Returns whether
    /// a promotion happened.
    async fn iterate(&self, checkpoint: &mut ClusterCheckpoint, canonical: &Artifact, canonical_fitness: f32, runners_up: &[&Artifact], strategy: Strategy) -> ForgeResult<bool> {
        let k = strategy.top_k(runners_up.len());
        let deltas: Vec<&&Artifact> = runners_up.iter().take(k).collect();

        let deltas_text: Vec<String> = deltas.iter().map(|d| format!("--- variant {} ---\n{}", d.artifact_id, d.content)).collect();
        let prompt = format!(
            "CANONICAL ({}):\n{}\n\nVARIANT DELTAS:\n{}",
            canonical.artifact_id,
            canonical.content,
            deltas_text.join("\n\n")
        );

        let text = self.runtime.call_tool(&self.synthesis_tool, None, &prompt, serde_json::json!({}), None).await?.text;
        let generation = GenerationResult::parse(&text)?.ensure_path_setup();

        let workdir = self.workdir.join(format!("candidate-{}", checkpoint.attempts));
        std::fs::create_dir_all(&workdir).map_err(|e| forge_core::ForgeError::StorageError(e.to_string()))?;
        let Some(score) = self.validator.validate(&self.runtime, &generation.source, &canonical.description, &workdir).await? else {
            tracing::debug!(canonical = %canonical.artifact_id, "candidate failed validation, discarding");
            return Ok(false);
        };

        let candidate_metrics = PerformanceMetrics { success_rate: 1.0, test_coverage: score.overall(), ..PerformanceMetrics::default() };
        let weights = FitnessWeights::for_kind(canonical.kind);
        let candidate_fitness = weights.score(&candidate_metrics);

        if candidate_fitness < canonical_fitness + self.config.improvement_threshold {
            return Ok(false);
        }

        self.promote(canonical, &generation, candidate_metrics).await?;
        checkpoint.best_score = candidate_fitness;
        self.trim(canonical).await?;
        Ok(true)
    }

    async fn promote(&self, previous_canonical: &Artifact, generation: &GenerationResult, metrics: PerformanceMetrics) -> ForgeResult<()> {
        let candidate_id = ArtifactId::from(format!("{}-candidate-{}", previous_canonical.artifact_id, Utc::now().timestamp_nanos_opt().unwrap_or_default()));
        let mut candidate = Artifact::new(
            candidate_id,
            previous_canonical.kind,
            format!("{} (optimized)", previous_canonical.name),
            generation.specification.clone(),
            generation.source.clone(),
            Utc::now(),
        );
        candidate.set_tags(previous_canonical.tags().to_vec());
        metrics.write_to(&mut candidate);
        candidate.metadata.set_parent_id(&previous_canonical.artifact_id);
        self.store.store(candidate, StoreOptions::default_auto_embed()).await?;

        // The previous canonical is archived, not deleted: it stays
        // reachable by lineage even after a fitter variant takes over.
        let mut archived = previous_canonical.clone();
        archived.add_tag("archived");
        self.store.store(archived, StoreOptions { auto_embed: false, overwrite: true }).await?;
        Ok(())
    }

    async fn trim(&self, new_canonical: &Artifact) -> ForgeResult<()> {
        let members = self
            .store
            .find_similar(&new_canonical.content, LookupFilter { kind: Some(new_canonical.kind), tags: None, match_all_tags: false }, 50, 0.0)
            .await?;
        for member in members {
            if member.artifact.artifact_id == new_canonical.artifact_id {
                continue;
            }
            if member.artifact.metadata.get("test_coverage").and_then(|v| v.as_f64()).unwrap_or(0.0) > 0.9 {
                continue;
            }
            if member.score < self.config.archive_threshold && member.artifact.usage_count < self.config.keep_threshold {
                let mut archived = member.artifact;
                archived.add_tag("archived");
                self.store.store(archived, StoreOptions { auto_embed: false, overwrite: true }).await?;
            }
        }
        Ok(())
    }
}

fn default_strategy_queue() -> Vec<String> {
    vec!["best-of-breed".to_string(), "incremental".to_string(), "hybrid".to_string(), "radical".to_string()]
}
