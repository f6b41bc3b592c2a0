//! Unified error taxonomy shared across every component.

use thiserror::Error;

/// The top-level error kind for any fallible operation in the system.
///
/// Each variant corresponds to a propagation policy decided in one place:
/// transient errors are retried locally, validation/fix-fraud errors drive
/// the repair state machine rather than surfacing, and the rest surface to
/// the caller unchanged. See [`ForgeError::into_result`] for the
/// user-visible shape every failure path is reduced to.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ForgeError {
    /// Network or timeout failure talking to a model backend. Retried
    /// locally with the fallback chain; only surfaces once every
    /// configured backend has been exhausted.
    #[error("transient backend error: {0}")]
    TransientBackendError(String),

    /// A tool subprocess exited non-zero or produced malformed output.
    /// Recorded as a failure and excluded from the resilient retry
    /// (the runtime tries a different tool, not the same one again).
    #[error("tool invocation error in {tool}: {message}")]
    ToolInvocationError {
        /// Name of the tool that failed.
        tool: String,
        /// What went wrong.
        message: String,
    },

    /// A static validator reported failure. Fed into the REPAIR state,
    /// never surfaced directly to the caller.
    #[error("validation error: {0}")]
    ValidationError(String),

    /// A repair attempt claimed fixes unsupported by the diff it
    /// produced. The attempt is discarded and does not count against
    /// the repair budget; a warning is folded into the next prompt.
    #[error("fix-fraud detected: {0}")]
    FixFraudError(String),

    /// The repair ladder ran to its end without producing a passing
    /// artifact. Surfaces to the caller; a `BUG_REPORT` artifact is
    /// stored before this error is returned.
    #[error("repair budget exhausted after {attempts} attempts")]
    BudgetExhausted {
        /// Number of repair attempts made before giving up.
        attempts: u32,
    },

    /// Refusal to delete or overwrite a protected artifact, tool, or
    /// configuration entry. Surfaces unchanged with an explanation.
    #[error("refused: {resource} is protected: {reason}")]
    ProtectedResourceError {
        /// Identifier of the resource the caller tried to modify.
        resource: String,
        /// Why the refusal happened.
        reason: String,
    },

    /// I/O or consistency failure in the Artifact Store. Aborts the
    /// enclosing operation without mutating on-disk state. Surfaces
    /// unchanged.
    #[error("storage error: {0}")]
    StorageError(String),

    /// Catch-all for errors from dependencies that don't map onto a
    /// taxonomy kind above.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl ForgeError {
    /// The taxonomy kind as a stable lowercase-snake-case string, used
    /// as the `error_kind` field of [`FailureResult`].
    pub fn kind(&self) -> &'static str {
        match self {
            Self::TransientBackendError(_) => "transient_backend_error",
            Self::ToolInvocationError { .. } => "tool_invocation_error",
            Self::ValidationError(_) => "validation_error",
            Self::FixFraudError(_) => "fix_fraud_error",
            Self::BudgetExhausted { .. } => "budget_exhausted",
            Self::ProtectedResourceError { .. } => "protected_resource_error",
            Self::StorageError(_) => "storage_error",
            Self::Other(_) => "other",
        }
    }

    /// A short, actionable hint for the caller, when one applies.
    /// Returns `None` for kinds where no remediation beyond "try again
    /// later" or "read the message" exists.
    pub fn remedial_hint(&self) -> Option<&'static str> {
        match self {
            Self::TransientBackendError(_) => {
                Some("the request was retried against fallback backends and still failed")
            }
            Self::BudgetExhausted { .. } => {
                Some("a BUG_REPORT artifact was stored; inspect it for the failing attempts")
            }
            Self::ProtectedResourceError { .. } => {
                Some("remove protection explicitly before retrying, if that is truly intended")
            }
            _ => None,
        }
    }

    /// Reduce this error to the structured, user-visible failure shape
    /// every failure path in the system produces: `{ok: false,
    /// error_kind, message, remedial_hint?}`.
    pub fn into_result(self) -> FailureResult {
        let error_kind = self.kind().to_string();
        let remedial_hint = self.remedial_hint().map(str::to_string);
        FailureResult {
            ok: false,
            error_kind,
            message: self.to_string(),
            remedial_hint,
        }
    }
}

/// The structured failure shape returned to callers. Every failure path
/// produces one of these; there are no silent failures and no panics on
/// a single bad tool descriptor or an unavailable embedding backend.
#[non_exhaustive]
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct FailureResult {
    /// Always `false`. Present so the JSON shape is self-describing
    /// without inspecting which fields are set.
    pub ok: bool,
    /// Stable taxonomy kind, see [`ForgeError::kind`].
    pub error_kind: String,
    /// Human-readable message.
    pub message: String,
    /// Optional actionable hint.
    pub remedial_hint: Option<String>,
}

/// Convenience alias used throughout the workspace.
pub type ForgeResult<T> = Result<T, ForgeError>;
