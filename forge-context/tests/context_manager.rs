use async_trait::async_trait;
use chrono::Utc;
use forge_context::{ContextManager, ModelBudget};
use forge_core::SessionId;
use forge_embed::DeterministicHashEmbedder;
use forge_router::{Provider, ProviderError, ProviderRequest, ProviderResponse, Router, RouterConfig};
use forge_store::{ArtifactStore, InMemoryArtifactStore};
use std::collections::HashMap;
use std::sync::Arc;

struct StubSummarizer;

#[async_trait]
impl Provider for StubSummarizer {
    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        Ok(ProviderResponse {
            text: "summary: the user and assistant discussed widgets and agreed to ship on Friday".to_string(),
            stop_reason: forge_router::StopReason::EndTurn,
            usage: forge_router::TokenUsage::default(),
            model: request.model,
            cost: None,
        })
    }
}

fn router() -> Arc<Router> {
    std::env::set_var("FORGE_CONTEXT_TEST_KEY", "x");
    let config = RouterConfig::from_toml_str(
        r#"
        [[backends]]
        name = "stub"
        credential_env_var = "FORGE_CONTEXT_TEST_KEY"

        [[backends.models]]
        model_id = "stub-model"
        tier = "fast"
        base_timeout = 30
        expected_latency_ms = 10
        "#,
    )
    .unwrap();
    let mut providers: HashMap<String, Arc<dyn Provider>> = HashMap::new();
    providers.insert("stub".to_string(), Arc::new(StubSummarizer));
    Arc::new(Router::new(config, providers))
}

fn store() -> Arc<dyn ArtifactStore> {
    Arc::new(InMemoryArtifactStore::new(Arc::new(DeterministicHashEmbedder::new(16))))
}

#[tokio::test]
async fn small_history_fits_without_summarizing() {
    let mut manager = ContextManager::new(SessionId::from("s1"), router(), store(), "context-summarizer");
    manager.record_turn("hi", "hello there", Utc::now(), None);

    let budget = ModelBudget::new("stub-model", 10_000);
    let bundle = manager.prepare_context("how are you?", &budget).await.unwrap();

    assert!(!bundle.summarized);
    assert_eq!(bundle.messages.len(), 3);
    assert_eq!(bundle.messages.last().unwrap().text, "how are you?");
}

#[tokio::test]
async fn exceeding_budget_folds_old_turns_into_a_summary() {
    let mut manager = ContextManager::new(SessionId::from("s2"), router(), store(), "context-summarizer");
    for i in 0..20 {
        manager.record_turn(format!("question {i} about widgets, ").repeat(20), format!("answer {i} about widgets, ").repeat(20), Utc::now(), None);
    }

    let budget = ModelBudget::new("stub-model", 400);
    let bundle = manager.prepare_context("what did we decide?", &budget).await.unwrap();

    assert!(bundle.summarized);
    assert_eq!(bundle.messages[0].role, forge_context::Role::Summary);
    assert!(bundle.messages[0].text.contains("widgets"));
    assert_eq!(bundle.messages.last().unwrap().text, "what did we decide?");
}

#[tokio::test]
async fn related_excludes_the_current_session() {
    let store = store();
    let manager = ContextManager::new(SessionId::from("s3"), router(), Arc::clone(&store), "context-summarizer");
    manager.store_digest("earlier session about widgets", Utc::now()).await.unwrap();

    let other = ContextManager::new(SessionId::from("s4"), router(), Arc::clone(&store), "context-summarizer");
    other.store_digest("another session about widgets", Utc::now()).await.unwrap();

    let hits = other.related("tell me about widgets", 10).await.unwrap();
    assert!(hits.iter().any(|h| h.session_id == SessionId::from("s3")));
    assert!(hits.iter().all(|h| h.session_id != SessionId::from("s4")));
}
