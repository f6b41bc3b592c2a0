#![deny(missing_docs)]
//! # codeforge — umbrella crate
//!
//! Single import surface for the self-improving code-generation and
//! tool-orchestration engine. Re-exports every component crate, plus a
//! `prelude` for the happy path: wire a [`forge_runtime::Runtime`], a
//! [`forge_router::Router`], a [`forge_store::ArtifactStore`], and run a
//! [`forge_controller::GenerationController`].

pub use forge_context;
pub use forge_controller;
pub use forge_core;
pub use forge_dedupe;
pub use forge_embed;
pub use forge_optimizer;
#[cfg(feature = "provider-anthropic")]
pub use forge_provider_anthropic;
#[cfg(feature = "provider-ollama")]
pub use forge_provider_ollama;
#[cfg(feature = "provider-openai")]
pub use forge_provider_openai;
pub use forge_router;
pub use forge_runtime;
pub use forge_sandbox;
pub use forge_secret;
pub use forge_store;
pub use forge_tool;
pub use forge_types;
pub use forge_validate;

/// Happy-path imports for wiring a codeforge engine end to end.
pub mod prelude {
    pub use forge_context::{ContextBundle, ContextManager, ModelBudget};
    pub use forge_controller::{ControllerConfig, ControllerOutcome, GenerationController};
    pub use forge_core::{ArtifactId, ForgeError, ForgeResult, NodeId, SessionId, ToolId};
    pub use forge_dedupe::{DedupeThresholds, SimilarityDedupeGate};
    pub use forge_embed::DeterministicHashEmbedder;
    pub use forge_optimizer::{ClusterConfig, ClusterOptimizer, OptimizationTrigger};
    #[cfg(feature = "provider-anthropic")]
    pub use forge_provider_anthropic::Anthropic;
    #[cfg(feature = "provider-ollama")]
    pub use forge_provider_ollama::Ollama;
    #[cfg(feature = "provider-openai")]
    pub use forge_provider_openai::OpenAi;
    pub use forge_router::{ModelTier, Provider, Router, RouterConfig, RoutingConstraints};
    pub use forge_runtime::{Runtime, ToolCall};
    pub use forge_store::{ArtifactStore, FsArtifactStore, InMemoryArtifactStore};
    pub use forge_tool::ToolRegistry;
    pub use forge_types::{Artifact, ArtifactKind, ToolDescriptor, ToolKind};
    pub use forge_validate::{Mode, ValidatorPipeline};
}
