//! The EVALUATE stage's structured output: an evaluator tool's score
//! over `{correctness, quality, speed}`.

use forge_core::{ForgeError, ForgeResult};
use serde::{Deserialize, Serialize};

/// Evaluator tool output, each field clamped into `[0, 1]` on parse.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EvaluationScore {
    /// Whether the generated code does what the task asked.
    pub correctness: f32,
    /// Code quality independent of correctness (style, structure).
    pub quality: f32,
    /// How fast the generated code runs relative to the task's needs.
    pub speed: f32,
}

impl EvaluationScore {
    /// Parse the evaluator tool's JSON response, clamping every field.
    pub fn parse(text: &str) -> ForgeResult<Self> {
        let mut score: Self = serde_json::from_str(text)
            .map_err(|e| ForgeError::ValidationError(format!("malformed evaluation: {e}")))?;
        score.correctness = score.correctness.clamp(0.0, 1.0);
        score.quality = score.quality.clamp(0.0, 1.0);
        score.speed = score.speed.clamp(0.0, 1.0);
        Ok(score)
    }

    /// Unweighted mean of the three dimensions, used as the artifact's
    /// initial quality score before any post-store bonus is applied.
    pub fn overall(&self) -> f32 {
        (self.correctness + self.quality + self.speed) / 3.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamps_out_of_range_fields() {
        let score = EvaluationScore::parse(r#"{"correctness":1.4,"quality":-0.2,"speed":0.5}"#).unwrap();
        assert_eq!(score.correctness, 1.0);
        assert_eq!(score.quality, 0.0);
        assert_eq!(score.speed, 0.5);
    }

    #[test]
    fn overall_is_the_mean() {
        let score = EvaluationScore { correctness: 1.0, quality: 0.5, speed: 0.0 };
        assert_eq!(score.overall(), 0.5);
    }
}
