//! # forge-validate — the Static Validator Pipeline
//!
//! Ordered, pure-static, bounded-time checks that run on generated
//! source before anything touches the sandbox. Validators run in
//! registration order; [`Mode::Full`] runs all of them, [`Mode::RetryFailed`]
//! reuses cached passing outcomes from a prior [`PipelineReport`] and
//! only reruns the ones that failed.
//!
//! | Module | What it holds |
//! |--------|---------------|
//! | [`pipeline`] | [`pipeline::ValidatorPipeline`], [`pipeline::Mode`], [`pipeline::PipelineReport`] |
//! | [`validators`] | the five built-in validators named by the pipeline contract |

#![deny(missing_docs)]

pub mod pipeline;
pub mod validators;

pub use pipeline::{Mode, PipelineReport, PipelineSummary, ValidatorOutcome, ValidatorPipeline};
pub use validators::{LOCAL_HELPER_MARKER, PATH_SETUP_MARKER};

use async_trait::async_trait;
use forge_core::DurationMs;
use std::fmt;

/// Which contract a validator checks. Order here has no bearing on
/// pipeline order — that's purely registration order on
/// [`pipeline::ValidatorPipeline`].
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValidatorCategory {
    /// Source parses without error under the target language's grammar.
    Syntax,
    /// No unused imports and no obviously undefined names.
    UndefinedNameOrUnusedImport,
    /// Imports are grouped and sorted per project convention.
    ImportOrder,
    /// A path-setup statement textually precedes any in-repo helper import.
    ProjectLocalImportPath,
    /// The entry point emits serialized JSON to stdout.
    OutputContract,
}

impl fmt::Display for ValidatorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Syntax => "syntax",
            Self::UndefinedNameOrUnusedImport => "undefined_name_or_unused_import",
            Self::ImportOrder => "import_order",
            Self::ProjectLocalImportPath => "project_local_import_path",
            Self::OutputContract => "output_contract",
        };
        f.write_str(s)
    }
}

/// A single pure-static, bounded-time check against a source string.
///
/// Implementations MUST NOT execute the source; the Sandbox Runner
/// owns execution. A validator that needs to propose a fix returns
/// the corrected source in [`ValidatorOutcome::fixed_source`] instead
/// of mutating its input — the pipeline decides whether to thread the
/// fix forward.
#[async_trait]
pub trait StaticValidator: Send + Sync {
    /// The contract this validator checks, used both for reporting and
    /// for matching against a prior report's failures in `RetryFailed` mode.
    fn category(&self) -> ValidatorCategory;

    /// Run the check. Callers are expected to bound this with a timeout
    /// (see [`pipeline::ValidatorPipeline::run`]); a validator that blocks
    /// past it is treated as a failure, not an error.
    async fn validate(&self, source: &str) -> ValidatorOutcome;
}

/// Helper for implementations to build a passing outcome without an
/// elapsed measurement of their own — the pipeline stamps `elapsed_ms`.
pub(crate) fn outcome(
    category: ValidatorCategory,
    passed: bool,
    output: impl Into<String>,
    fixed_source: Option<String>,
) -> ValidatorOutcome {
    ValidatorOutcome {
        passed,
        output: output.into(),
        category,
        elapsed_ms: DurationMs::ZERO,
        fixed_source,
    }
}
