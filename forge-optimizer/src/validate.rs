//! Candidate validation: STATIC -> EXECUTE -> EVALUATE, the same three
//! checkpoints the Generation/Repair Controller runs a fresh generation
//! through, minus the REPAIR ladder — a synthesized candidate that
//! fails outright is simply discarded, not patched.

use forge_controller::EvaluationScore;
use forge_core::{ForgeError, ForgeResult, ToolId};
use forge_runtime::Runtime;
use forge_sandbox::{OutputContract, SandboxConfig};
use forge_validate::{Mode, ValidatorPipeline};

/// Runs a synthesized candidate's source through the Static Validator
/// Pipeline, a sandboxed execution, and an evaluator tool call.
pub struct CandidateValidator {
    validators: ValidatorPipeline,
    evaluator_tool: ToolId,
}

impl CandidateValidator {
    /// Build a validator against an already-populated pipeline and the
    /// tool that scores a passing candidate.
    pub fn new(validators: ValidatorPipeline, evaluator_tool: ToolId) -> Self {
        Self { validators, evaluator_tool }
    }

    /// Validate `source` against `task_description`. Returns `None` if
    /// STATIC or EXECUTE failed; `Some(score)` once the candidate ran
    /// clean and was scored.
    pub async fn validate(&self, runtime: &Runtime, source: &str, task_description: &str, workdir: &std::path::Path) -> ForgeResult<Option<EvaluationScore>> {
        let report = self.validators.run(source, Mode::Full).await;
        if !report.passed {
            return Ok(None);
        }

        let entry = workdir.join("main.py");
        std::fs::write(&entry, &report.final_source).map_err(|e| ForgeError::StorageError(e.to_string()))?;
        let mut sandbox_config = SandboxConfig::new("python3", vec![entry.to_string_lossy().into_owned()]);
        sandbox_config.working_dir = Some(workdir.to_path_buf());
        sandbox_config.output_contract = OutputContract::Json;
        let result = forge_sandbox::run(&sandbox_config, b"{}")
            .await
            .map_err(|e| ForgeError::ToolInvocationError { tool: "sandbox".to_string(), message: e.to_string() })?;
        if !result.success(&OutputContract::Json) {
            return Ok(None);
        }

        let prompt = format!("TASK:\n{task_description}\n\nSOURCE:\n{}", report.final_source);
        let text = runtime.call_tool(&self.evaluator_tool, None, &prompt, serde_json::json!({}), None).await?.text;
        Ok(Some(EvaluationScore::parse(&text)?))
    }
}
