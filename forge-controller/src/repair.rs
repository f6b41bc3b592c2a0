//! The REPAIR ladder: fix-fraud verification, tier escalation, and the
//! auto-fix pattern library.

use forge_core::{ForgeError, ForgeResult};
use forge_router::ModelTier;
use forge_validate::PipelineReport;
use serde::{Deserialize, Serialize};

/// Up to six attempts before the controller gives up and moves to FAILED.
pub const MAX_REPAIR_ATTEMPTS: u32 = 6;

/// After three consecutive fix-fraud rejections, the controller forces
/// escalation to the next tier regardless of the attempt count.
pub const MAX_CONSECUTIVE_FRAUD: u32 = 3;

const TIER_LADDER: [ModelTier; 4] = [ModelTier::Fast, ModelTier::General, ModelTier::Escalation, ModelTier::God];

/// The model tier for the `n`th repair attempt (0-indexed), escalating
/// roughly every two attempts and never running past the top rung.
pub fn tier_for_attempt(attempt_index: u32) -> ModelTier {
    let rung = (attempt_index / 2) as usize;
    TIER_LADDER[rung.min(TIER_LADDER.len() - 1)]
}

/// Sampling temperature for the `n`th repair attempt, rising with each
/// escalation so a stuck repair gets more exploratory rather than
/// repeating the same near-miss.
pub fn temperature_for_attempt(attempt_index: u32) -> f64 {
    (0.2 + 0.15 * attempt_index as f64).min(0.9)
}

/// What a repair attempt returns: the corrected source plus a list of
/// claims about what it changed, each checked against `new_source`
/// before the controller trusts it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepairAttempt {
    /// The corrected source.
    pub new_source: String,
    /// Plain-language descriptions of what this attempt changed.
    #[serde(default)]
    pub claimed_fixes: Vec<String>,
}

impl RepairAttempt {
    /// Parse the repair tool's JSON response.
    pub fn parse(text: &str) -> ForgeResult<Self> {
        serde_json::from_str(text).map_err(|e| ForgeError::ValidationError(format!("malformed repair attempt: {e}")))
    }
}

/// Claims from `claims` that aren't textually reflected in `new_source`.
/// An empty result means the attempt's fix-fraud check passed.
pub fn unsupported_claims(new_source: &str, claims: &[String]) -> Vec<String> {
    claims.iter().filter(|c| !claim_supported(new_source, c)).cloned().collect()
}

fn claim_supported(new_source: &str, claim: &str) -> bool {
    let lower = claim.to_lowercase();
    if let Some(rest) = lower.strip_prefix("removed import ") {
        let symbol = claim[claim.len() - rest.len()..].trim();
        return !new_source.contains(symbol);
    }
    if lower.starts_with("added") && lower.contains("setup") {
        return new_source.contains(forge_validate::PATH_SETUP_MARKER);
    }
    if let Some(rest) = lower.strip_prefix("added ") {
        let addition = claim[claim.len() - rest.len()..].trim();
        return new_source.contains(addition);
    }
    // Claim shape we don't recognize: nothing to check it against, so
    // don't block the attempt on a claim we can't evaluate.
    true
}

/// Augments the next repair prompt with a mandatory warning listing
/// claims a prior attempt made but didn't actually satisfy.
pub fn fraud_warning(unsupported: &[String]) -> String {
    format!(
        "WARNING: the previous attempt claimed the following fixes but the source did not reflect them: {}. \
         Do not claim a fix you have not actually made.",
        unsupported.join("; ")
    )
}

/// `{error_signature -> fix_pattern}`: a deterministic repair recorded
/// after a successful fix, so an identical failure next time can be
/// resolved without another model call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixPattern {
    /// Identifies the failure this pattern resolves.
    pub error_signature: String,
    /// The line this pattern replaces.
    pub find: String,
    /// What it's replaced with.
    pub replace: String,
}

impl FixPattern {
    /// The signature of the first failing validator in `report`, used
    /// both to record a new pattern and to look one up.
    pub fn error_signature(report: &PipelineReport) -> Option<String> {
        report
            .per_validator
            .iter()
            .find(|o| !o.passed)
            .map(|o| format!("{}:{}", o.category, o.output))
    }

    /// Derive a pattern from the first line a successful repair
    /// changed. Returns `None` if the repair didn't change any single
    /// line cleanly (e.g. it reformatted broadly) — nothing reusable
    /// to record in that case.
    pub fn from_repair(error_signature: String, before: &str, after: &str) -> Option<Self> {
        for (b, a) in before.lines().zip(after.lines()) {
            if b != a {
                return Some(Self { error_signature, find: b.to_string(), replace: a.to_string() });
            }
        }
        None
    }

    /// Apply this pattern to `source` if its `find` line is present.
    pub fn apply(&self, source: &str) -> Option<String> {
        source.contains(&self.find).then(|| source.replacen(&self.find, &self.replace, 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_escalates_every_two_attempts() {
        assert_eq!(tier_for_attempt(0), ModelTier::Fast);
        assert_eq!(tier_for_attempt(1), ModelTier::Fast);
        assert_eq!(tier_for_attempt(2), ModelTier::General);
        assert_eq!(tier_for_attempt(6), ModelTier::God);
        assert_eq!(tier_for_attempt(100), ModelTier::God);
    }

    #[test]
    fn removed_import_claim_requires_absence() {
        let claims = vec!["removed import HashMap".to_string()];
        assert!(unsupported_claims("fn main() {}", &claims).is_empty());
        assert_eq!(unsupported_claims("use HashMap;\nfn main() {}", &claims), claims);
    }

    #[test]
    fn added_setup_claim_requires_the_marker() {
        let claims = vec!["added path setup".to_string()];
        assert_eq!(unsupported_claims("fn main() {}", &claims), claims);
        assert!(unsupported_claims("setup_import_path()\nfn main() {}", &claims).is_empty());
    }

    #[test]
    fn added_z_claim_requires_z_present() {
        let claims = vec!["added a null check".to_string()];
        assert_eq!(unsupported_claims("fn main() {}", &claims), claims);
        assert!(unsupported_claims("fn main() { a null check }", &claims).is_empty());
    }

    #[test]
    fn fix_pattern_applies_its_recorded_line_swap() {
        let pattern = FixPattern { error_signature: "x".into(), find: "use zeta;".into(), replace: "use alpha;".into() };
        let fixed = pattern.apply("use zeta;\nfn main() {}").unwrap();
        assert_eq!(fixed, "use alpha;\nfn main() {}");
        assert!(pattern.apply("no match here").is_none());
    }
}
