//! The GENERATE stage's structured output and the path-setup repair
//! the controller applies before handing source to STATIC.

use forge_core::{ForgeError, ForgeResult};
use serde::{Deserialize, Serialize};

/// What the code-generation tool returns for one GENERATE call: the
/// complete source, its claimed import manifest, and the rest of the
/// node artifact set bundled in the same response (the generator is
/// expected to produce the accompanying test, behavior spec, load-test
/// script and specification alongside the source it describes).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResult {
    /// Complete generated source.
    pub source: String,
    /// Imports the generator claims the source needs.
    #[serde(default)]
    pub imports_manifest: Vec<String>,
    /// Unit test source, empty if the generator didn't produce one.
    #[serde(default)]
    pub unit_test: String,
    /// Feature-style behavior spec, empty if absent.
    #[serde(default)]
    pub behavior_spec: String,
    /// Load-test script, empty if absent.
    #[serde(default)]
    pub load_test_script: String,
    /// Detailed specification document, empty if absent.
    #[serde(default)]
    pub specification: String,
}

impl GenerationResult {
    /// Parse the generator tool's JSON response.
    pub fn parse(text: &str) -> ForgeResult<Self> {
        serde_json::from_str(text).map_err(|e| ForgeError::ValidationError(format!("malformed generation result: {e}")))
    }

    /// If the manifest (or the source itself) claims an in-repo helper
    /// import but the required path-setup statement is textually
    /// absent, insert it ahead of the source. Mirrors the check
    /// [`forge_validate::validators::ProjectLocalImportPathValidator`]
    /// enforces, so a generation that already gets this right never
    /// trips STATIC on it.
    pub fn ensure_path_setup(mut self) -> Self {
        let claims_local_helper = self
            .imports_manifest
            .iter()
            .any(|i| i.contains(forge_validate::LOCAL_HELPER_MARKER))
            || self.source.contains(forge_validate::LOCAL_HELPER_MARKER);

        if claims_local_helper && !self.source.contains(forge_validate::PATH_SETUP_MARKER) {
            self.source = format!("{}()\n{}", forge_validate::PATH_SETUP_MARKER, self.source);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inserts_missing_path_setup_for_claimed_helper_import() {
        let result = GenerationResult {
            source: "use local_helpers::fmt;\nfn main() {}".into(),
            imports_manifest: vec!["local_helpers::fmt".into()],
            ..GenerationResult::parse(r#"{"source":""}"#).unwrap()
        }
        .ensure_path_setup();
        assert!(result.source.starts_with("setup_import_path()"));
    }

    #[test]
    fn leaves_source_untouched_when_path_setup_already_present() {
        let source = "setup_import_path()\nuse local_helpers::fmt;\nfn main() {}";
        let result = GenerationResult {
            source: source.into(),
            imports_manifest: vec!["local_helpers::fmt".into()],
            ..GenerationResult::parse(r#"{"source":""}"#).unwrap()
        }
        .ensure_path_setup();
        assert_eq!(result.source, source);
    }

    #[test]
    fn leaves_source_untouched_without_a_local_helper_claim() {
        let source = "fn main() {}";
        let result = GenerationResult {
            source: source.into(),
            ..GenerationResult::parse(r#"{"source":""}"#).unwrap()
        }
        .ensure_path_setup();
        assert_eq!(result.source, source);
    }
}
