//! # forge-runtime — the Tool Invocation Runtime
//!
//! Uniform dispatch over every [`forge_types::ToolKind`], bounded parallel
//! fan-out, and a resilient-fallback path that ranks candidate tools by
//! quality score discounted by recent failure history.
//!
//! | Module | What it holds |
//! |--------|---------------|
//! | [`dispatch`] | `Runtime::call_tool`, one branch per `InvocationSpec` |
//! | [`parallel`] | `Runtime::call_tools_parallel`, bounded concurrent fan-out |
//! | [`resilient`] | `Runtime::call_tool_resilient`, rank/call/retry over the Artifact Store |
//! | [`usage`] | usage-counter tracking through the Smoothing Buffer |
//! | [`template`] | `{{placeholder}}` substitution for LANGUAGE_MODEL prompts |

#![deny(missing_docs)]

pub mod dispatch;
pub mod parallel;
pub mod resilient;
pub mod template;
pub mod usage;

pub use parallel::ToolCall;
pub use usage::UsageTracker;

use forge_core::DurationMs;
use forge_router::Router;
use forge_store::ArtifactStore;
use forge_tool::ToolRegistry;
use std::path::PathBuf;
use std::sync::Arc;

const DEFAULT_MAX_PARALLEL: usize = 8;

/// Outcome of one tool invocation.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    /// The tool's result text (LANGUAGE_MODEL completion text, captured
    /// stdout, or an HTTP response body).
    pub text: String,
    /// Wall-clock time the invocation took.
    pub elapsed: DurationMs,
}

/// The Tool Invocation Runtime: owns everything needed to dispatch,
/// fan out, and resiliently retry tool calls. Cheaply cloneable — every
/// field is an `Arc` or a `reqwest::Client`, itself internally `Arc`-backed.
#[derive(Clone)]
pub struct Runtime {
    registry: Arc<ToolRegistry>,
    store: Arc<dyn ArtifactStore>,
    router: Arc<Router>,
    usage: Arc<UsageTracker>,
    http: reqwest::Client,
    tools_root: PathBuf,
    max_parallel: usize,
}

impl Runtime {
    /// Build a runtime dispatching EXECUTABLE/WORKFLOW invocations against
    /// node directories under `tools_root`, LANGUAGE_MODEL invocations
    /// through `router`, with usage counters buffered through `usage`.
    pub fn new(
        registry: Arc<ToolRegistry>,
        store: Arc<dyn ArtifactStore>,
        router: Arc<Router>,
        usage: Arc<UsageTracker>,
        tools_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            registry,
            store,
            router,
            usage,
            http: reqwest::Client::new(),
            tools_root: tools_root.into(),
            max_parallel: DEFAULT_MAX_PARALLEL,
        }
    }

    /// Override the bounded worker count used by `call_tools_parallel`.
    pub fn with_max_parallel(mut self, max_parallel: usize) -> Self {
        self.max_parallel = max_parallel.max(1);
        self
    }

    /// The underlying Tool Registry, for callers that need direct access
    /// (descriptor registration, capability search) alongside dispatch.
    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }
}
