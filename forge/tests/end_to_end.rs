//! End-to-end scenarios wiring the engine's crates together the way a
//! real caller would: a Router over stub providers, a Runtime over a
//! Tool Registry, an Artifact Store, and a GenerationController on top.

use async_trait::async_trait;
use codeforge::prelude::*;
use forge_core::{CostTier, DurationMs, NodeId, QualityTier, SpeedTier};
use forge_router::{ProviderError, ProviderRequest, ProviderResponse, StopReason, TokenUsage};
use forge_types::{InvocationSpec, VersionTriple};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// A provider whose response depends on which tool role called it,
/// driven by a simple keyword match against the prompt.
struct ScriptedProvider {
    calls: AtomicUsize,
    responses: Vec<(&'static str, String)>,
}

impl ScriptedProvider {
    fn new(responses: Vec<(&'static str, String)>) -> Self {
        Self { calls: AtomicUsize::new(0), responses }
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let text = self
            .responses
            .iter()
            .find(|(keyword, _)| request.prompt.contains(keyword))
            .map(|(_, text)| text.clone())
            .unwrap_or_else(|| "{}".to_string());
        Ok(ProviderResponse { text, stop_reason: StopReason::EndTurn, usage: TokenUsage::default(), model: request.model, cost: None })
    }
}

fn router_over(responses: Vec<(&'static str, String)>) -> Arc<Router> {
    std::env::set_var("CODEFORGE_E2E_KEY", "x");
    let config = RouterConfig::from_toml_str(
        r#"
        [[backends]]
        name = "stub"
        credential_env_var = "CODEFORGE_E2E_KEY"

        [[backends.models]]
        model_id = "stub-model"
        tier = "fast"
        base_timeout = 30
        expected_latency_ms = 10
        "#,
    )
    .unwrap();
    let mut providers: HashMap<String, Arc<dyn Provider>> = HashMap::new();
    providers.insert("stub".to_string(), Arc::new(ScriptedProvider::new(responses)));
    Arc::new(Router::new(config, providers))
}

async fn register_lm_tool(registry: &ToolRegistry, id: &str, role: &str) {
    registry
        .register(ToolDescriptor {
            tool_id: ToolId::from(id),
            tool_kind: ToolKind::LanguageModel,
            invocation: InvocationSpec::LanguageModel { prompt_template: "{{prompt}}".to_string(), model_role: role.to_string() },
            tags: vec![],
            priority: 0,
            speed_tier: SpeedTier::Fast,
            cost_tier: CostTier::Low,
            quality_tier: QualityTier::Standard,
            routing_keywords: vec![],
            track_usage: true,
            version: VersionTriple::initial(),
            lineage_parent: None,
        })
        .await
        .unwrap();
}

fn runtime_with(store: Arc<dyn ArtifactStore>, registry: Arc<ToolRegistry>, router: Arc<Router>, journal: std::path::PathBuf, tools_root: std::path::PathBuf) -> Arc<Runtime> {
    let usage = Arc::new(forge_runtime::UsageTracker::new(journal, 50, DurationMs::from_secs(60), Arc::clone(&store)));
    Arc::new(Runtime::new(registry, store, router, usage, tools_root))
}

fn controller_config(nodes_root: std::path::PathBuf) -> ControllerConfig {
    ControllerConfig { overseer_tool: ToolId::from("overseer"), generator_tool: ToolId::from("generator"), repair_tool: ToolId::from("repair"), evaluator_tool: ToolId::from("evaluator"), nodes_root }
}

fn python_plan_response() -> &'static str {
    r#"{"steps":[]}"#
}

fn generation_response(body: &str) -> String {
    serde_json::json!({
        "source": body,
        "specification": "emits an ok marker as json",
    })
    .to_string()
}

fn evaluation_response() -> &'static str {
    r#"{"correctness":0.95,"quality":0.9,"speed":0.9}"#
}

fn repair_response(new_source: &str, claimed_fixes: &[&str]) -> String {
    serde_json::json!({ "new_source": new_source, "claimed_fixes": claimed_fixes }).to_string()
}

// Scenario 1: a task whose description exactly matches a pre-seeded
// artifact reuses it through the Dedup Gate rather than regenerating.
#[tokio::test]
async fn reuse_on_exact_duplicate() {
    let store: Arc<dyn ArtifactStore> = Arc::new(InMemoryArtifactStore::new(Arc::new(DeterministicHashEmbedder::new(32))));
    let mut seeded = Artifact::new(
        ArtifactId::from("translate-fn"),
        ArtifactKind::Function,
        "translate-fn",
        "translate hello to french",
        "translate hello to french",
        chrono::Utc::now(),
    );
    seeded.set_quality_score(0.9, chrono::Utc::now());
    store.store(seeded.clone(), StoreOptions::default_auto_embed()).await.unwrap();

    let registry = Arc::new(ToolRegistry::new(Arc::clone(&store)));
    register_lm_tool(&registry, "reviewer", "reviewer").await;
    let router = router_over(vec![("same_task", r#"{"same_task": true}"#.to_string())]);
    let tmp = tempfile::tempdir().unwrap();
    let runtime = runtime_with(Arc::clone(&store), registry, router, tmp.path().join("journal.jsonl"), tmp.path().join("tools"));

    let dedupe = Arc::new(SimilarityDedupeGate::new(Arc::clone(&store), Arc::clone(&runtime), ToolId::from("reviewer"), DedupeThresholds::default()));
    let controller = GenerationController::new(runtime, Arc::clone(&store), ValidatorPipeline::new(), Some(dedupe), controller_config(tmp.path().join("nodes")));

    let outcome = controller.run("translate hello to french", vec![], NodeId::from("node-1")).await.unwrap();
    match outcome {
        ControllerOutcome::Reused(artifact) => assert_eq!(artifact.artifact_id, ArtifactId::from("translate-fn")),
        ControllerOutcome::Stored { .. } => panic!("expected a reuse, got a fresh generation"),
    }

    let refreshed = store.get(&ArtifactId::from("translate-fn")).await.unwrap().unwrap();
    assert_eq!(refreshed.usage_count, 1);
}

// Scenario 2: a near-duplicate task description below the reuse
// threshold regenerates, leaving both artifacts in the store.
#[tokio::test]
async fn regenerate_on_mismatch() {
    let store: Arc<dyn ArtifactStore> = Arc::new(InMemoryArtifactStore::new(Arc::new(DeterministicHashEmbedder::new(32))));
    let seeded = Artifact::new(ArtifactId::from("translate-fn"), ArtifactKind::Function, "translate-fn", "translate hello to french", "translate hello to french", chrono::Utc::now());
    store.store(seeded, StoreOptions::default_auto_embed()).await.unwrap();

    let registry = Arc::new(ToolRegistry::new(Arc::clone(&store)));
    for (id, role) in [("reviewer", "reviewer"), ("overseer", "overseer"), ("generator", "generator"), ("evaluator", "evaluator")] {
        register_lm_tool(&registry, id, role).await;
    }
    let router = router_over(vec![
        ("TASK:\n", evaluation_response().to_string()),
        ("\n\nPLAN:\n", generation_response("import json\nprint(json.dumps({\"ok\": True}))")),
        ("", python_plan_response().to_string()),
    ]);
    let tmp = tempfile::tempdir().unwrap();
    let runtime = runtime_with(Arc::clone(&store), registry, router, tmp.path().join("journal.jsonl"), tmp.path().join("tools"));

    let dedupe = Arc::new(SimilarityDedupeGate::new(Arc::clone(&store), Arc::clone(&runtime), ToolId::from("reviewer"), DedupeThresholds::default()));
    let controller = GenerationController::new(runtime, Arc::clone(&store), ValidatorPipeline::new(), Some(dedupe), controller_config(tmp.path().join("nodes")));

    let outcome = controller.run("translate hello to spanish", vec!["translation".to_string()], NodeId::from("node-2")).await;
    match outcome {
        Ok(ControllerOutcome::Stored { .. }) => {}
        other => panic!("expected a fresh generation, got {other:?}"),
    }

    let stats = store.statistics().await.unwrap();
    assert!(stats.total >= 2, "both the seeded and the freshly generated artifact should coexist");
}

struct CustomMarkerValidator;

#[async_trait]
impl forge_validate::StaticValidator for CustomMarkerValidator {
    fn category(&self) -> forge_validate::ValidatorCategory {
        forge_validate::ValidatorCategory::Syntax
    }

    async fn validate(&self, source: &str) -> forge_validate::ValidatorOutcome {
        forge_validate::ValidatorOutcome {
            category: self.category(),
            passed: source.contains("FIXED"),
            output: if source.contains("FIXED") { "marker present".to_string() } else { "missing FIXED marker".to_string() },
            elapsed_ms: DurationMs::from_millis(0),
            fixed_source: None,
        }
    }
}

/// Drives a first repair attempt that claims to have added the marker
/// without actually doing so (fraud), then a second attempt that
/// genuinely adds it.
struct FraudThenFixProvider {
    repair_calls: AtomicUsize,
}

#[async_trait]
impl Provider for FraudThenFixProvider {
    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let text = if request.prompt.contains("TASK:\n") {
            evaluation_response().to_string()
        } else if request.prompt.contains("FAILURES:\n") {
            let attempt = self.repair_calls.fetch_add(1, Ordering::SeqCst);
            if attempt == 0 {
                repair_response("import json\nprint(json.dumps({\"ok\": True}))", &["added FIXED"])
            } else {
                repair_response("import json\nprint(json.dumps({\"ok\": True}))  # FIXED", &["added FIXED"])
            }
        } else if request.prompt.contains("\n\nPLAN:\n") {
            generation_response("import json\nprint(json.dumps({\"ok\": True}))")
        } else {
            python_plan_response().to_string()
        };
        Ok(ProviderResponse { text, stop_reason: StopReason::EndTurn, usage: TokenUsage::default(), model: request.model, cost: None })
    }
}

// Scenario 3: a repair attempt that claims a fix it didn't actually
// make is rejected and re-prompted with a fraud warning rather than
// accepted at face value.
#[tokio::test]
async fn fix_fraud_is_rejected_before_a_second_attempt_succeeds() {
    let store: Arc<dyn ArtifactStore> = Arc::new(InMemoryArtifactStore::new(Arc::new(DeterministicHashEmbedder::new(32))));
    let registry = Arc::new(ToolRegistry::new(Arc::clone(&store)));
    for (id, role) in [("overseer", "overseer"), ("generator", "generator"), ("repair", "repair"), ("evaluator", "evaluator")] {
        register_lm_tool(&registry, id, role).await;
    }

    std::env::set_var("CODEFORGE_E2E_FRAUD_KEY", "x");
    let config = RouterConfig::from_toml_str(
        r#"
        [[backends]]
        name = "stub"
        credential_env_var = "CODEFORGE_E2E_FRAUD_KEY"

        [[backends.models]]
        model_id = "stub-model"
        tier = "fast"
        base_timeout = 30
        expected_latency_ms = 10
        "#,
    )
    .unwrap();
    let mut providers: HashMap<String, Arc<dyn Provider>> = HashMap::new();
    providers.insert("stub".to_string(), Arc::new(FraudThenFixProvider { repair_calls: AtomicUsize::new(0) }));
    let router = Arc::new(Router::new(config, providers));

    let tmp = tempfile::tempdir().unwrap();
    let runtime = runtime_with(Arc::clone(&store), registry, router, tmp.path().join("journal.jsonl"), tmp.path().join("tools"));

    let mut validators = ValidatorPipeline::new();
    validators.add(Box::new(CustomMarkerValidator));
    let controller = GenerationController::new(runtime, Arc::clone(&store), validators, None, controller_config(tmp.path().join("nodes")));

    let outcome = controller.run("emit an ok marker as json, then add a FIXED marker", vec![], NodeId::from("node-fraud")).await.unwrap();
    match outcome {
        ControllerOutcome::Stored { evaluation, .. } => assert!(evaluation.overall() > 0.0),
        ControllerOutcome::Reused(_) => panic!("no dedupe gate was configured"),
    }
}

// Scenario 5: a plan whose steps share a parallel group dispatches
// concurrently rather than sequentially.
#[tokio::test]
async fn parallel_plan_steps_run_concurrently() {
    let store: Arc<dyn ArtifactStore> = Arc::new(InMemoryArtifactStore::new(Arc::new(DeterministicHashEmbedder::new(32))));
    let registry = Arc::new(ToolRegistry::new(Arc::clone(&store)));

    struct SlowProvider;
    #[async_trait]
    impl Provider for SlowProvider {
        async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
            tokio::time::sleep(std::time::Duration::from_millis(200)).await;
            Ok(ProviderResponse { text: "done".to_string(), stop_reason: StopReason::EndTurn, usage: TokenUsage::default(), model: request.model, cost: None })
        }
    }
    std::env::set_var("CODEFORGE_E2E_SLOW_KEY", "x");
    let config = RouterConfig::from_toml_str(
        r#"
        [[backends]]
        name = "slow"
        credential_env_var = "CODEFORGE_E2E_SLOW_KEY"

        [[backends.models]]
        model_id = "slow-model"
        tier = "fast"
        base_timeout = 30
        expected_latency_ms = 200
        "#,
    )
    .unwrap();
    let mut providers: HashMap<String, Arc<dyn Provider>> = HashMap::new();
    providers.insert("slow".to_string(), Arc::new(SlowProvider));
    let router = Arc::new(Router::new(config, providers));

    for id in ["step-a", "step-b", "step-c"] {
        register_lm_tool(&registry, id, "worker").await;
    }
    let tmp = tempfile::tempdir().unwrap();
    let runtime = runtime_with(Arc::clone(&store), registry, router, tmp.path().join("journal.jsonl"), tmp.path().join("tools"));

    let calls = vec![
        ToolCall::new(ToolId::from("step-a"), "go"),
        ToolCall::new(ToolId::from("step-b"), "go"),
        ToolCall::new(ToolId::from("step-c"), "go"),
    ];
    let started = std::time::Instant::now();
    let results = runtime.call_tools_parallel(calls).await;
    let elapsed = started.elapsed();

    assert_eq!(results.len(), 3);
    assert!(results.iter().all(|r| r.is_ok()));
    assert!(elapsed < std::time::Duration::from_millis(500), "three 200ms steps should overlap, took {elapsed:?}");
}
