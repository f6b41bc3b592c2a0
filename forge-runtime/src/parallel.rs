//! Bounded concurrent fan-out over `call_tool`, grounded on the
//! spawn-and-join pattern used for concurrent agent dispatch.

use crate::{Runtime, ToolOutput};
use forge_core::{ForgeError, ForgeResult, SessionId, ToolId};
use std::sync::Arc;
use tokio::sync::Semaphore;

/// One call in a [`Runtime::call_tools_parallel`] batch.
#[derive(Debug, Clone)]
pub struct ToolCall {
    /// Tool to invoke.
    pub tool_id: ToolId,
    /// Session whose overlay, if any, should shadow the base descriptor.
    pub session: Option<SessionId>,
    /// Prompt/stdin payload.
    pub prompt: String,
    /// Template placeholders / REMOTE_API body / timeout override.
    pub kwargs: serde_json::Value,
    /// Call-level usage-tracking override.
    pub disable_tracking: Option<bool>,
}

impl ToolCall {
    /// A call with no kwargs, no session, and no tracking override.
    pub fn new(tool_id: ToolId, prompt: impl Into<String>) -> Self {
        Self {
            tool_id,
            session: None,
            prompt: prompt.into(),
            kwargs: serde_json::Value::Null,
            disable_tracking: None,
        }
    }
}

impl Runtime {
    /// Execute `calls` concurrently, bounded by this runtime's configured
    /// worker count. Results preserve input order; a failing call never
    /// cancels its siblings — its error is returned in-place.
    pub async fn call_tools_parallel(&self, calls: Vec<ToolCall>) -> Vec<ForgeResult<ToolOutput>> {
        let semaphore = Arc::new(Semaphore::new(self.max_parallel));
        let mut handles = Vec::with_capacity(calls.len());

        for call in calls {
            let semaphore = Arc::clone(&semaphore);
            let runtime = self.clone();
            handles.push(tokio::spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .expect("semaphore is never closed");
                runtime
                    .call_tool(
                        &call.tool_id,
                        call.session.as_ref(),
                        &call.prompt,
                        call.kwargs,
                        call.disable_tracking,
                    )
                    .await
            }));
        }

        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            match handle.await {
                Ok(result) => results.push(result),
                Err(join_error) => results.push(Err(ForgeError::ToolInvocationError {
                    tool: "unknown".to_string(),
                    message: format!("tool invocation task panicked: {join_error}"),
                })),
            }
        }
        results
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
            tags: vec![],
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

    #[tokio::test]
    async fn preserves_order_and_isolates_failures() {
        let (runtime, root) = test_runtime().await;
        std::fs::create_dir_all(root.join("ok_tool")).unwrap();
        runtime.registry.register(cat_descriptor("ok_tool")).await.unwrap();

        let calls = vec![
            ToolCall::new(ToolId::from("ok_tool"), "first"),
            ToolCall::new(ToolId::from("missing_tool"), "second"),
            ToolCall::new(ToolId::from("ok_tool"), "third"),
        ];
        let results = runtime.call_tools_parallel(calls).await;
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_ref().unwrap().text, "first");
        assert!(results[1].is_err());
        assert_eq!(results[2].as_ref().unwrap().text, "third");
    }
}
