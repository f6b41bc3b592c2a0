use async_trait::async_trait;
use forge_core::{NodeId, ToolId};
use forge_controller::{ControllerConfig, ControllerOutcome, GenerationController};
use forge_embed::DeterministicHashEmbedder;
use forge_router::{Provider, ProviderError, ProviderRequest, ProviderResponse, Router, RouterConfig};
use forge_store::{ArtifactStore, InMemoryArtifactStore};
use forge_tool::ToolRegistry;
use forge_types::{InvocationSpec, ToolDescriptor, ToolKind, VersionTriple};
use forge_validate::{validators, ValidatorPipeline};
use std::collections::HashMap;
use std::sync::Arc;

struct StubProvider;

#[async_trait]
impl Provider for StubProvider {
    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let text = if request.prompt.contains("TASK:\n") {
            r#"{"correctness":0.9,"quality":0.8,"speed":0.7}"#.to_string()
        } else if request.prompt.contains("FAILURES:\n") {
            r#"{"new_source":"import json\nprint(json.dumps({\"ok\": true}))","claimed_fixes":[]}"#.to_string()
        } else if request.prompt.contains("\n\nPLAN:\n") {
            r#"{"source":"import json\nprint(json.dumps({\"ok\": true}))","specification":"prints an ok marker as json"}"#.to_string()
        } else {
            r#"{"steps":[{"step_id":"s1","description":"emit the json marker","tool_id":"generator"}]}"#.to_string()
        };
        Ok(ProviderResponse {
            text,
            stop_reason: forge_router::StopReason::EndTurn,
            usage: forge_router::TokenUsage::default(),
            model: request.model,
            cost: None,
        })
    }
}

async fn harness() -> (GenerationController, Arc<dyn ArtifactStore>) {
    std::env::set_var("FORGE_CONTROLLER_TEST_KEY", "x");
    let store: Arc<dyn ArtifactStore> =
        Arc::new(InMemoryArtifactStore::new(Arc::new(DeterministicHashEmbedder::new(16))));
    let registry = Arc::new(ToolRegistry::new(Arc::clone(&store)));

    for (id, role) in [
        ("overseer", "overseer"),
        ("generator", "generator"),
        ("repairer", "repairer"),
        ("evaluator", "evaluator"),
    ] {
        registry
            .register(ToolDescriptor {
                tool_id: ToolId::from(id),
                tool_kind: ToolKind::LanguageModel,
                invocation: InvocationSpec::LanguageModel {
                    prompt_template: "{{prompt}}".to_string(),
                    model_role: role.to_string(),
                },
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
    }

    let config = RouterConfig::from_toml_str(
        r#"
        [[backends]]
        name = "stub"
        credential_env_var = "FORGE_CONTROLLER_TEST_KEY"

        [[backends.models]]
        model_id = "stub-model"
        tier = "fast"
        base_timeout = 30
        expected_latency_ms = 10
        "#,
    )
    .unwrap();
    let mut providers: HashMap<String, Arc<dyn forge_router::Provider>> = HashMap::new();
    providers.insert("stub".to_string(), Arc::new(StubProvider));
    let router = Arc::new(Router::new(config, providers));

    let usage = Arc::new(forge_runtime::UsageTracker::new(
        std::env::temp_dir().join("forge-controller-test-journal.jsonl"),
        50,
        forge_core::DurationMs::from_secs(60),
        Arc::clone(&store),
    ));
    let runtime = Arc::new(forge_runtime::Runtime::new(
        registry,
        Arc::clone(&store),
        router,
        usage,
        std::env::temp_dir().join("forge-controller-test-tools"),
    ));

    let mut pipeline = ValidatorPipeline::new();
    pipeline.add(Box::new(validators::SyntaxValidator));
    pipeline.add(Box::new(validators::UnusedImportValidator));
    pipeline.add(Box::new(validators::ImportOrderValidator));
    pipeline.add(Box::new(validators::ProjectLocalImportPathValidator));
    pipeline.add(Box::new(validators::OutputContractValidator));

    let nodes_root = std::env::temp_dir().join(format!("forge-controller-test-nodes-{}", std::process::id()));
    let controller = GenerationController::new(
        runtime,
        Arc::clone(&store),
        pipeline,
        None,
        ControllerConfig {
            overseer_tool: ToolId::from("overseer"),
            generator_tool: ToolId::from("generator"),
            repair_tool: ToolId::from("repairer"),
            evaluator_tool: ToolId::from("evaluator"),
            nodes_root,
        },
    );
    (controller, store)
}

#[tokio::test]
async fn successful_run_stores_a_function_and_evaluation_artifact() {
    let (controller, store) = harness().await;
    let outcome = controller
        .run("emit an ok marker as json", vec!["demo".to_string()], NodeId::from("node-success"))
        .await
        .unwrap();

    match outcome {
        ControllerOutcome::Stored { node_id, artifact_id, evaluation } => {
            assert_eq!(node_id.as_str(), "node-success");
            assert!(store.get(&artifact_id).await.unwrap().is_some());
            assert!(evaluation.overall() > 0.0);
        }
        ControllerOutcome::Reused(_) => panic!("expected a fresh generation, not a dedupe hit"),
    }
}
