use forge_core::{CostTier, DurationMs, QualityTier, SpeedTier, ToolId};
use forge_embed::DeterministicHashEmbedder;
use forge_router::{Router, RouterConfig};
use forge_runtime::{parallel::ToolCall, Runtime, UsageTracker};
use forge_store::{ArtifactStore, InMemoryArtifactStore};
use forge_tool::ToolRegistry;
use forge_types::{InvocationSpec, ToolDescriptor, ToolKind, VersionTriple};
use std::collections::HashMap;
use std::sync::Arc;
use tempfile::TempDir;

fn executable_descriptor(tool_id: &str, interpreter: &str) -> ToolDescriptor {
    ToolDescriptor {
        tool_id: ToolId::from(tool_id),
        tool_kind: ToolKind::Executable,
        invocation: InvocationSpec::Executable {
            interpreter: interpreter.to_string(),
            path: String::new(),
        },
        tags: vec!["echo".to_string()],
        priority: 0,
        speed_tier: SpeedTier::Standard,
        cost_tier: CostTier::Medium,
        quality_tier: QualityTier::Standard,
        routing_keywords: vec![],
        track_usage: true,
        version: VersionTriple::initial(),
        lineage_parent: None,
    }
}

async fn build_runtime() -> (Runtime, TempDir, TempDir) {
    let tools_dir = TempDir::new().unwrap();
    let journal_dir = TempDir::new().unwrap();

    let store: Arc<dyn ArtifactStore> =
        Arc::new(InMemoryArtifactStore::new(Arc::new(DeterministicHashEmbedder::new(32))));
    let registry = Arc::new(ToolRegistry::new(Arc::clone(&store)));
    let router = Arc::new(Router::new(RouterConfig::default(), HashMap::new()));
    let usage = Arc::new(UsageTracker::new(
        journal_dir.path().join("journal.jsonl"),
        50,
        DurationMs::from_secs(60),
        Arc::clone(&store),
    ));

    let runtime = Runtime::new(registry, store, router, usage, tools_dir.path());
    (runtime, tools_dir, journal_dir)
}

#[tokio::test]
async fn dispatches_executable_tool_and_counts_usage() {
    let (runtime, tools_dir, _journal_dir) = build_runtime().await;
    std::fs::create_dir_all(tools_dir.path().join("echo_tool")).unwrap();
    runtime.registry().register(executable_descriptor("echo_tool", "cat")).await.unwrap();

    let output = runtime
        .call_tool(&ToolId::from("echo_tool"), None, "integration test", serde_json::json!({}), None)
        .await
        .unwrap();
    assert_eq!(output.text, "integration test");
}

#[tokio::test]
async fn parallel_fan_out_preserves_order_despite_failure() {
    let (runtime, tools_dir, _journal_dir) = build_runtime().await;
    std::fs::create_dir_all(tools_dir.path().join("echo_tool")).unwrap();
    runtime.registry().register(executable_descriptor("echo_tool", "cat")).await.unwrap();

    let calls = vec![
        ToolCall::new(ToolId::from("echo_tool"), "one"),
        ToolCall::new(ToolId::from("absent"), "two"),
        ToolCall::new(ToolId::from("echo_tool"), "three"),
    ];
    let results = runtime.call_tools_parallel(calls).await;
    assert_eq!(results[0].as_ref().unwrap().text, "one");
    assert!(results[1].is_err());
    assert_eq!(results[2].as_ref().unwrap().text, "three");
}

#[tokio::test]
async fn resilient_dispatch_retries_past_a_failing_tool() {
    let (runtime, tools_dir, _journal_dir) = build_runtime().await;
    std::fs::create_dir_all(tools_dir.path().join("good")).unwrap();
    std::fs::create_dir_all(tools_dir.path().join("bad")).unwrap();
    runtime.registry().register(executable_descriptor("bad", "false")).await.unwrap();
    runtime.registry().register(executable_descriptor("good", "cat")).await.unwrap();

    let output = runtime
        .call_tool_resilient("echo a value back", "survives retry", serde_json::json!({}), None, 4)
        .await
        .unwrap();
    assert_eq!(output.text, "survives retry");
}
