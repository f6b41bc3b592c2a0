//! The PLAN stage's structured output: ordered steps, with independent
//! ones tagged for parallel dispatch via `call_tools_parallel`.

use forge_core::{ForgeError, ForgeResult};
use serde::{Deserialize, Serialize};

/// One step of a plan, referencing the tool that carries it out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanStep {
    /// Stable identifier within the plan.
    pub step_id: String,
    /// Human-readable description of what this step does.
    pub description: String,
    /// Tool this step invokes.
    pub tool_id: String,
    /// Steps sharing the same group are independent and may run
    /// concurrently; `None` means this step must run on its own.
    #[serde(default)]
    pub parallel_group: Option<String>,
}

/// The overseer's plan: an ordered decomposition of a generation task
/// into tool-backed steps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    /// Steps in the order the overseer intends them to run.
    pub steps: Vec<PlanStep>,
}

impl Plan {
    /// Parse the overseer tool's JSON response.
    pub fn parse(text: &str) -> ForgeResult<Self> {
        serde_json::from_str(text).map_err(|e| ForgeError::ValidationError(format!("malformed plan: {e}")))
    }

    /// Partition steps into dispatch batches: consecutive steps
    /// sharing a `parallel_group` become one batch; an ungrouped step
    /// is its own batch of one. Batches are yielded in plan order,
    /// so a later step can still depend on an earlier batch having run.
    pub fn batches(&self) -> Vec<Vec<&PlanStep>> {
        let mut batches: Vec<Vec<&PlanStep>> = Vec::new();
        for step in &self.steps {
            match (&step.parallel_group, batches.last_mut()) {
                (Some(group), Some(last)) if last.first().is_some_and(|s| s.parallel_group.as_deref() == Some(group)) => {
                    last.push(step);
                }
                _ => batches.push(vec![step]),
            }
        }
        batches
    }

    /// A synthetic test input for EXECUTE, derived from the step
    /// descriptions — the sandbox run has nothing else to go on before
    /// a real test harness exists.
    pub fn test_input(&self) -> serde_json::Value {
        serde_json::json!({
            "steps": self.steps.iter().map(|s| s.description.clone()).collect::<Vec<_>>(),
        })
    }

    /// Serialized transcript written alongside the node.
    pub fn transcript(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}
