//! Uniform `call_tool` dispatch, one branch per [`forge_types::InvocationSpec`].

use crate::{Runtime, ToolOutput};
use forge_core::{DurationMs, ForgeError, ForgeResult, SessionId, ToolId};
use forge_sandbox::{OutputContract, SandboxConfig};
use forge_router::{ModelTier, ProviderRequest, RoutingConstraints};
use forge_types::InvocationSpec;
use std::time::Instant;

impl Runtime {
    /// Dispatch one tool invocation by its descriptor's [`InvocationSpec`].
    ///
    /// `kwargs` fills LANGUAGE_MODEL template placeholders and REMOTE_API
    /// request bodies; for EXECUTABLE/WORKFLOW it is consulted only for an
    /// optional `timeout_ms` override. `disable_tracking` is the call-level
    /// usage flag (see [`crate::usage::UsageTracker::is_enabled`]).
    pub async fn call_tool(
        &self,
        tool_id: &ToolId,
        session: Option<&SessionId>,
        prompt: &str,
        kwargs: serde_json::Value,
        disable_tracking: Option<bool>,
    ) -> ForgeResult<ToolOutput> {
        let descriptor = self.registry.get(tool_id, session).await.ok_or_else(|| {
            ForgeError::ToolInvocationError {
                tool: tool_id.to_string(),
                message: "tool not registered".to_string(),
            }
        })?;

        tracing::debug!(tool = %tool_id, kind = ?descriptor.tool_kind, "dispatching tool invocation");
        let started = Instant::now();
        let text = match &descriptor.invocation {
            InvocationSpec::LanguageModel { prompt_template, model_role } => {
                let rendered = crate::template::render(prompt_template, prompt, &kwargs);
                let request = ProviderRequest {
                    model: String::new(),
                    system: None,
                    prompt: rendered,
                    max_tokens: None,
                    temperature: kwargs.get("temperature").and_then(serde_json::Value::as_f64),
                    extra: kwargs.clone(),
                };
                let constraints = RoutingConstraints {
                    min_tier: kwargs.get("min_tier").and_then(serde_json::Value::as_str).and_then(parse_model_tier),
                };
                let response = self
                    .router
                    .generate(model_role, constraints, request)
                    .await
                    .map_err(|e| ForgeError::TransientBackendError(e.to_string()))?;
                response.text
            }
            InvocationSpec::Executable { interpreter, path } => {
                self.run_sandboxed(tool_id, interpreter, path, prompt.as_bytes(), &kwargs)
                    .await?
            }
            InvocationSpec::Workflow { node_id } => {
                let input = serde_json::json!({ "prompt": prompt }).to_string();
                self.run_sandboxed(tool_id, "", &workflow_entry(node_id), input.as_bytes(), &kwargs)
                    .await?
            }
            InvocationSpec::RemoteApi { endpoint, operation } => {
                self.call_remote_api(tool_id, endpoint, operation, &kwargs).await?
            }
            InvocationSpec::Custom { kind_name, .. } => {
                return Err(ForgeError::ToolInvocationError {
                    tool: tool_id.to_string(),
                    message: format!("unsupported custom invocation kind: {kind_name}"),
                });
            }
            _ => unreachable!("InvocationSpec variants are exhaustively matched above"),
        };
        let elapsed = DurationMs::from(started.elapsed());

        if self.usage.is_enabled(descriptor.track_usage, disable_tracking) {
            self.usage.record(tool_id).await?;
        }

        Ok(ToolOutput { text, elapsed })
    }

    async fn run_sandboxed(
        &self,
        tool_id: &ToolId,
        interpreter: &str,
        path: &str,
        stdin: &[u8],
        kwargs: &serde_json::Value,
    ) -> ForgeResult<String> {
        let node_dir = self.tools_root.join(tool_id.as_str());
        let (command, args) = if interpreter.is_empty() {
            (node_dir.join(path).to_string_lossy().into_owned(), Vec::new())
        } else if path.is_empty() {
            (interpreter.to_string(), Vec::new())
        } else {
            (interpreter.to_string(), vec![node_dir.join(path).to_string_lossy().into_owned()])
        };

        let mut config = SandboxConfig::new(command, args);
        config.working_dir = Some(node_dir);
        if let Some(ms) = kwargs.get("timeout_ms").and_then(serde_json::Value::as_u64) {
            config.timeout = DurationMs::from_millis(ms);
        }

        let result = forge_sandbox::run(&config, stdin).await.map_err(|e| {
            ForgeError::ToolInvocationError {
                tool: tool_id.to_string(),
                message: e.to_string(),
            }
        })?;

        if !result.success(&OutputContract::Unconstrained) {
            return Err(ForgeError::ToolInvocationError {
                tool: tool_id.to_string(),
                message: format!(
                    "exit {:?} (timed_out={}, memory_exceeded={}): {}",
                    result.exit_code, result.timed_out, result.memory_exceeded, result.stderr
                ),
            });
        }
        Ok(result.stdout)
    }

    async fn call_remote_api(
        &self,
        tool_id: &ToolId,
        endpoint: &str,
        operation: &str,
        kwargs: &serde_json::Value,
    ) -> ForgeResult<String> {
        let url = format!("{}/{}", endpoint.trim_end_matches('/'), operation.trim_start_matches('/'));
        let response = self
            .http
            .post(&url)
            .json(kwargs)
            .send()
            .await
            .map_err(|e| ForgeError::TransientBackendError(e.to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ForgeError::TransientBackendError(e.to_string()))?;
        if !status.is_success() {
            return Err(ForgeError::ToolInvocationError {
                tool: tool_id.to_string(),
                message: format!("HTTP {status}: {body}"),
            });
        }
        Ok(body)
    }
}

/// Conventional entry-file name spawned for a WORKFLOW invocation's node
/// directory; workflow descriptors don't carry their own interpreter/path,
/// unlike EXECUTABLE ones, so this fixes the convention.
fn workflow_entry(_node_id: &str) -> String {
    "entry".to_string()
}

/// Parses a `min_tier` kwarg value into a [`ModelTier`], used by
/// callers escalating across the Router's tier ladder (the repair
/// loop). Unrecognized strings are treated as "no constraint" rather
/// than an error, since a malformed hint shouldn't block dispatch.
fn parse_model_tier(s: &str) -> Option<ModelTier> {
    match s {
        "fast" => Some(ModelTier::Fast),
        "general" => Some(ModelTier::General),
        "escalation" => Some(ModelTier::Escalation),
        "god" => Some(ModelTier::God),
        _ => None,
    }
}
