//! The Generation/Repair Controller's state machine:
//! `IDLE -> DEDUPE -> (REUSE | PLAN -> GENERATE -> STATIC -> EXECUTE ->
//! EVALUATE -> STORE) -> DONE`, with a REPAIR loop bridging a STATIC
//! or EXECUTE failure back to GENERATE's output and a FAILED terminal
//! state once the repair budget is exhausted.

use crate::dedupe::{DedupeGate, DedupeOutcome};
use crate::evaluate::EvaluationScore;
use crate::generate::GenerationResult;
use crate::node::{self, NodeArtifacts, PostStoreMeasurements};
use crate::plan::Plan;
use crate::repair::{self, FixPattern, RepairAttempt};
use chrono::Utc;
use forge_core::{ArtifactId, ForgeError, ForgeResult, NodeId, ToolId};
use forge_runtime::ToolCall;
use forge_sandbox::{OutputContract, SandboxConfig};
use forge_store::{ArtifactStore, LookupFilter, StoreOptions};
use forge_types::{Artifact, ArtifactKind};
use forge_validate::{Mode, PipelineReport, ValidatorPipeline};
use std::path::PathBuf;
use std::sync::Arc;

/// Static wiring for one controller instance: which tools carry out
/// each language-model-backed stage, and where generated nodes live.
pub struct ControllerConfig {
    /// Produces the PLAN artifact.
    pub overseer_tool: ToolId,
    /// Produces the GENERATE artifact.
    pub generator_tool: ToolId,
    /// Produces a [`crate::repair::RepairAttempt`] during REPAIR.
    pub repair_tool: ToolId,
    /// Scores a passing node during EVALUATE.
    pub evaluator_tool: ToolId,
    /// Root directory generated nodes are written under.
    pub nodes_root: PathBuf,
}

/// Terminal result of one controller run.
#[derive(Debug, Clone)]
pub enum ControllerOutcome {
    /// DEDUPE found a close-enough existing artifact; it was reused
    /// and no generation happened.
    Reused(Artifact),
    /// The full pipeline succeeded; the node was stored.
    Stored {
        /// The run this node belongs to.
        node_id: NodeId,
        /// The stored Function artifact's id.
        artifact_id: ArtifactId,
        /// The final evaluation score.
        evaluation: EvaluationScore,
    },
}

/// The Generation/Repair Controller.
pub struct GenerationController {
    runtime: Arc<forge_runtime::Runtime>,
    store: Arc<dyn ArtifactStore>,
    validators: ValidatorPipeline,
    dedupe: Option<Arc<dyn DedupeGate>>,
    config: ControllerConfig,
}

impl GenerationController {
    /// Build a controller. `validators` should already have every
    /// Static Validator Pipeline check registered; `dedupe` is `None`
    /// until `forge-dedupe` is wired in, in which case DEDUPE always
    /// misses.
    pub fn new(
        runtime: Arc<forge_runtime::Runtime>,
        store: Arc<dyn ArtifactStore>,
        validators: ValidatorPipeline,
        dedupe: Option<Arc<dyn DedupeGate>>,
        config: ControllerConfig,
    ) -> Self {
        Self { runtime, store, validators, dedupe, config }
    }

    /// Run one full generation/repair cycle for `task_description`,
    /// tagged with `tags`, under `node_id`.
    pub async fn run(
        &self,
        task_description: &str,
        tags: Vec<String>,
        node_id: NodeId,
    ) -> ForgeResult<ControllerOutcome> {
        // DEDUPE
        if let Some(gate) = &self.dedupe {
            if let DedupeOutcome::Hit(artifact) = gate.check(task_description, &tags).await? {
                self.store.increment_usage(&artifact.artifact_id).await?;
                return Ok(ControllerOutcome::Reused(artifact));
            }
        }

        // PLAN
        let plan_text = self
            .runtime
            .call_tool(&self.config.overseer_tool, None, task_description, serde_json::json!({}), None)
            .await?
            .text;
        let plan = Plan::parse(&plan_text)?;
        let plan_artifact = Artifact::new(
            ArtifactId::from(format!("{node_id}-plan")),
            ArtifactKind::Plan,
            format!("plan:{node_id}"),
            task_description,
            plan.transcript(),
            Utc::now(),
        );
        self.store.store(plan_artifact, StoreOptions::default_auto_embed()).await?;

        let step_outputs = self.dispatch_plan_steps(&plan).await;

        // GENERATE
        let prompt = format!(
            "{task_description}\n\nPLAN:\n{}\n\nSTEP OUTPUTS:\n{}",
            plan.transcript(),
            step_outputs.join("\n")
        );
        let generation = self.generate(&prompt).await?;
        let mut current_source = generation.source.clone();

        // STATIC (full)
        let mut report = self.validators.run(&current_source, Mode::Full).await;
        current_source = report.final_source.clone();

        // EXECUTE, only attempted once STATIC passes
        let mut execute_ok = report.passed && self.execute(&node_id, &current_source, &plan).await?;

        // REPAIR
        let mut attempts_used = 0u32;
        let mut consecutive_fraud = 0u32;
        let mut fraud_warning: Option<String> = None;

        while (!report.passed || !execute_ok) && attempts_used < repair::MAX_REPAIR_ATTEMPTS {
            if let Some(patched) = self.consult_auto_fix_library(&report).await {
                current_source = patched;
                attempts_used += 1;
            } else {
                let attempt = self.repair(&current_source, &report, attempts_used, fraud_warning.take()).await?;
                let unsupported = repair::unsupported_claims(&attempt.new_source, &attempt.claimed_fixes);

                if !unsupported.is_empty() {
                    tracing::warn!(node_id = %node_id, attempt = attempts_used, claims = ?unsupported, validation_failure = true, "repair attempt made unsupported claims");
                    consecutive_fraud += 1;
                    fraud_warning = Some(repair::fraud_warning(&unsupported));
                    if consecutive_fraud >= repair::MAX_CONSECUTIVE_FRAUD {
                        attempts_used += 1;
                        consecutive_fraud = 0;
                    }
                    continue;
                }

                consecutive_fraud = 0;
                if let Some(signature) = FixPattern::error_signature(&report) {
                    if let Some(pattern) = FixPattern::from_repair(signature, &current_source, &attempt.new_source) {
                        self.record_fix_pattern(&pattern).await;
                    }
                }
                current_source = attempt.new_source;
                attempts_used += 1;
            }

            report = self.validators.run(&current_source, Mode::RetryFailed(report)).await;
            current_source = report.final_source.clone();
            execute_ok = report.passed && self.execute(&node_id, &current_source, &plan).await?;
        }

        if !report.passed || !execute_ok {
            self.store_bug_report(&node_id, task_description, &report).await;
            return Err(ForgeError::BudgetExhausted { attempts: attempts_used });
        }

        // EVALUATE
        let evaluation = self.evaluate(&current_source, task_description).await?;

        // STORE
        let artifact_id = self
            .store_node(&node_id, &current_source, &generation, &plan, &evaluation, tags)
            .await?;

        Ok(ControllerOutcome::Stored { node_id, artifact_id, evaluation })
    }

    /// Dispatch each of the plan's batches through
    /// `call_tools_parallel`, in batch order, feeding their combined
    /// text output into the GENERATE prompt. A step whose tool call
    /// fails is logged and dropped rather than aborting the run — the
    /// plan is advisory context for GENERATE, not a hard dependency.
    async fn dispatch_plan_steps(&self, plan: &Plan) -> Vec<String> {
        let mut outputs = Vec::with_capacity(plan.steps.len());
        for batch in plan.batches() {
            let calls: Vec<ToolCall> = batch
                .iter()
                .map(|step| ToolCall::new(ToolId::from(step.tool_id.as_str()), step.description.clone()))
                .collect();
            let results = self.runtime.call_tools_parallel(calls).await;
            for (step, result) in batch.iter().zip(results) {
                match result {
                    Ok(output) => outputs.push(format!("{}: {}", step.step_id, output.text)),
                    Err(e) => {
                        tracing::warn!(step_id = %step.step_id, error = %e, "plan step failed, continuing without its output");
                    }
                }
            }
        }
        outputs
    }

    async fn generate(&self, prompt: &str) -> ForgeResult<GenerationResult> {
        let text = self
            .runtime
            .call_tool(&self.config.generator_tool, None, prompt, serde_json::json!({}), None)
            .await?
            .text;
        Ok(GenerationResult::parse(&text)?.ensure_path_setup())
    }

    async fn execute(&self, node_id: &NodeId, source: &str, plan: &Plan) -> ForgeResult<bool> {
        let dir = node::node_dir(&self.config.nodes_root, node_id);
        std::fs::create_dir_all(&dir).map_err(|e| ForgeError::StorageError(e.to_string()))?;
        let entry = dir.join("main.py");
        std::fs::write(&entry, source).map_err(|e| ForgeError::StorageError(e.to_string()))?;

        let mut sandbox_config = SandboxConfig::new("python3", vec![entry.to_string_lossy().into_owned()]);
        sandbox_config.working_dir = Some(dir);
        sandbox_config.output_contract = OutputContract::Json;

        let input = serde_json::to_vec(&plan.test_input()).unwrap_or_default();
        let result = forge_sandbox::run(&sandbox_config, &input)
            .await
            .map_err(|e| ForgeError::ToolInvocationError { tool: "sandbox".to_string(), message: e.to_string() })?;
        Ok(result.success(&OutputContract::Json))
    }

    async fn repair(
        &self,
        current_source: &str,
        report: &PipelineReport,
        attempt_index: u32,
        fraud_warning: Option<String>,
    ) -> ForgeResult<RepairAttempt> {
        let failures: Vec<String> = report
            .per_validator
            .iter()
            .filter(|o| !o.passed)
            .map(|o| format!("{}: {}", o.category, o.output))
            .collect();
        let mut prompt = format!("SOURCE:\n{current_source}\n\nFAILURES:\n{}", failures.join("\n"));
        if let Some(warning) = fraud_warning {
            prompt = format!("{warning}\n\n{prompt}");
        }

        let kwargs = serde_json::json!({
            "min_tier": tier_name(repair::tier_for_attempt(attempt_index)),
            "temperature": repair::temperature_for_attempt(attempt_index),
        });
        let text = self
            .runtime
            .call_tool(&self.config.repair_tool, None, &prompt, kwargs, None)
            .await?
            .text;
        RepairAttempt::parse(&text)
    }

    async fn consult_auto_fix_library(&self, report: &PipelineReport) -> Option<String> {
        let signature = FixPattern::error_signature(report)?;
        let category = report.per_validator.iter().find(|o| !o.passed)?.category.to_string();
        let filter = LookupFilter { kind: Some(ArtifactKind::Pattern), tags: Some(vec![category]), match_all_tags: false };
        let candidates = self.store.find_by_tags(filter, 10).await.ok()?;
        for candidate in candidates {
            if let Ok(pattern) = serde_json::from_str::<FixPattern>(&candidate.content) {
                if pattern.error_signature == signature {
                    if let Some(fixed) = pattern.apply(&report.final_source) {
                        return Some(fixed);
                    }
                }
            }
        }
        None
    }

    async fn record_fix_pattern(&self, pattern: &FixPattern) {
        // One pattern per error signature: a later fix for the same
        // failure overwrites the earlier one rather than accumulating
        // duplicates the lookup would have to rank between.
        let mut artifact = Artifact::new(
            ArtifactId::from(format!("pattern-{}", pattern.error_signature)),
            ArtifactKind::Pattern,
            format!("fix:{}", pattern.error_signature),
            "auto-fix library entry",
            serde_json::to_string(pattern).unwrap_or_default(),
            Utc::now(),
        );
        let category = pattern.error_signature.split(':').next().unwrap_or("unknown");
        artifact.add_tag(category);
        if let Err(e) = self.store.store(artifact, StoreOptions { auto_embed: true, overwrite: true }).await {
            tracing::warn!(error = %e, "failed to record auto-fix pattern");
        }
    }

    async fn evaluate(&self, source: &str, task_description: &str) -> ForgeResult<EvaluationScore> {
        let prompt = format!("TASK:\n{task_description}\n\nSOURCE:\n{source}");
        let text = self
            .runtime
            .call_tool(&self.config.evaluator_tool, None, &prompt, serde_json::json!({}), None)
            .await?
            .text;
        EvaluationScore::parse(&text)
    }

    async fn store_node(
        &self,
        node_id: &NodeId,
        source: &str,
        generation: &GenerationResult,
        plan: &Plan,
        evaluation: &EvaluationScore,
        tags: Vec<String>,
    ) -> ForgeResult<ArtifactId> {
        let artifact_id = ArtifactId::from(format!("{node_id}-function"));
        let mut artifact = Artifact::new(
            artifact_id.clone(),
            ArtifactKind::Function,
            format!("function:{node_id}"),
            generation.specification.clone(),
            source,
            Utc::now(),
        );
        artifact.set_tags(tags);
        artifact.metadata.set_node_id(node_id.as_str());
        // No behavior-spec or load-test runner is wired into this
        // controller yet, so the bonus is computed against default
        // (all-false) measurements — equivalent to the bare EVALUATE
        // score, but going through the same path a future runner would.
        let scored = node::apply_quality_bonus(evaluation.overall(), &PostStoreMeasurements::default());
        artifact.set_quality_score(scored, Utc::now());
        self.store.store(artifact, StoreOptions::default_auto_embed()).await?;

        let mut eval_artifact = Artifact::new(
            ArtifactId::from(format!("{node_id}-evaluation")),
            ArtifactKind::Evaluation,
            format!("evaluation:{node_id}"),
            "EVALUATE stage score",
            serde_json::to_string(evaluation).unwrap_or_default(),
            Utc::now(),
        );
        eval_artifact.metadata.set_target_tool_id(node_id.as_str());
        self.store.store(eval_artifact, StoreOptions::default_auto_embed()).await?;

        let registry_entry = serde_json::json!({
            "node_id": node_id.as_str(),
            "function_artifact_id": artifact_id.0,
            "plan_artifact_id": format!("{node_id}-plan"),
            "evaluation_artifact_id": format!("{node_id}-evaluation"),
        });
        let artifacts = NodeArtifacts {
            source: source.to_string(),
            unit_test: generation.unit_test.clone(),
            behavior_spec: generation.behavior_spec.clone(),
            load_test_script: generation.load_test_script.clone(),
            plan_transcript: plan.transcript(),
            specification: generation.specification.clone(),
        };
        node::write_node(&self.config.nodes_root, node_id, &artifacts, &registry_entry);

        Ok(artifact_id)
    }

    async fn store_bug_report(&self, node_id: &NodeId, task_description: &str, report: &PipelineReport) {
        let artifact = Artifact::new(
            ArtifactId::from(format!("{node_id}-bug-report")),
            ArtifactKind::BugReport,
            format!("bug_report:{node_id}"),
            task_description,
            serde_json::to_string(report).unwrap_or_default(),
            Utc::now(),
        );
        if let Err(e) = self.store.store(artifact, StoreOptions::default_auto_embed()).await {
            tracing::warn!(node_id = %node_id, error = %e, "failed to store bug report after budget exhaustion");
        }
    }
}

fn tier_name(tier: forge_router::ModelTier) -> &'static str {
    match tier {
        forge_router::ModelTier::Fast => "fast",
        forge_router::ModelTier::General => "general",
        forge_router::ModelTier::Escalation => "escalation",
        forge_router::ModelTier::God => "god",
    }
}
