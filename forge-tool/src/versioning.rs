//! Classifies a tool descriptor mutation into a version bump.

use forge_types::{InvocationSpec, ToolDescriptor, VersionBump};

/// The outcome of classifying a proposed mutation against the current
/// descriptor. A major bump is distinguished from the others because
/// it requires the caller to explicitly confirm before it's applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationClass {
    /// Content-preserving: same invocation shape and kind, only
    /// cosmetic fields (priority, tiers) differ.
    Patch,
    /// Additive: new tags/routing keywords, or an invocation field
    /// changed without altering its kind or core behavior.
    Minor,
    /// Breaking: the invocation's kind itself changed (e.g.
    /// `Executable` → `RemoteApi`), or its path/endpoint/role changed.
    /// Requires explicit confirmation from the caller.
    MajorRequiresConfirmation,
}

/// Compare `new_invocation` against `old`'s current invocation and
/// classify the resulting mutation.
pub fn classify(old: &ToolDescriptor, new_invocation: &InvocationSpec) -> MutationClass {
    use InvocationSpec::*;
    let breaking = match (&old.invocation, new_invocation) {
        (LanguageModel { model_role: a, .. }, LanguageModel { model_role: b, .. }) => a != b,
        (Executable { path: a, .. }, Executable { path: b, .. }) => a != b,
        (Workflow { node_id: a }, Workflow { node_id: b }) => a != b,
        (RemoteApi { endpoint: a, .. }, RemoteApi { endpoint: b, .. }) => a != b,
        (Custom { kind_name: a, .. }, Custom { kind_name: b, .. }) => a != b,
        _ => true, // invocation kind itself changed
    };
    if breaking {
        return MutationClass::MajorRequiresConfirmation;
    }

    let prompt_changed = matches!(
        (&old.invocation, new_invocation),
        (LanguageModel { prompt_template: a, .. }, LanguageModel { prompt_template: b, .. }) if a != b
    );
    let operation_changed = matches!(
        (&old.invocation, new_invocation),
        (RemoteApi { operation: a, .. }, RemoteApi { operation: b, .. }) if a != b
    );
    let interpreter_changed = matches!(
        (&old.invocation, new_invocation),
        (Executable { interpreter: a, .. }, Executable { interpreter: b, .. }) if a != b
    );
    if prompt_changed || operation_changed || interpreter_changed {
        return MutationClass::Minor;
    }

    MutationClass::Patch
}

impl From<MutationClass> for Option<VersionBump> {
    /// `None` for a class requiring confirmation — the caller must
    /// re-invoke the bump after confirming.
    fn from(class: MutationClass) -> Self {
        match class {
            MutationClass::Patch => Some(VersionBump::Patch),
            MutationClass::Minor => Some(VersionBump::Minor),
            MutationClass::MajorRequiresConfirmation => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forge_core::{CostTier, QualityTier, SpeedTier, ToolId};
    use forge_types::{ToolKind, VersionTriple};

    fn descriptor(invocation: InvocationSpec) -> ToolDescriptor {
        ToolDescriptor {
            tool_id: ToolId::from("t1"),
            tool_kind: ToolKind::Executable,
            invocation,
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

    #[test]
    fn identical_invocation_is_patch() {
        let old = descriptor(InvocationSpec::Executable {
            interpreter: "python3".into(),
            path: "run.py".into(),
        });
        let new = InvocationSpec::Executable {
            interpreter: "python3".into(),
            path: "run.py".into(),
        };
        assert_eq!(classify(&old, &new), MutationClass::Patch);
    }

    #[test]
    fn changed_interpreter_is_minor() {
        let old = descriptor(InvocationSpec::Executable {
            interpreter: "python3".into(),
            path: "run.py".into(),
        });
        let new = InvocationSpec::Executable {
            interpreter: "python3.12".into(),
            path: "run.py".into(),
        };
        assert_eq!(classify(&old, &new), MutationClass::Minor);
    }

    #[test]
    fn changed_path_is_major() {
        let old = descriptor(InvocationSpec::Executable {
            interpreter: "python3".into(),
            path: "run.py".into(),
        });
        let new = InvocationSpec::Executable {
            interpreter: "python3".into(),
            path: "run_v2.py".into(),
        };
        assert_eq!(classify(&old, &new), MutationClass::MajorRequiresConfirmation);
    }

    #[test]
    fn changed_invocation_kind_is_major() {
        let old = descriptor(InvocationSpec::Executable {
            interpreter: "python3".into(),
            path: "run.py".into(),
        });
        let new = InvocationSpec::RemoteApi {
            endpoint: "https://example.com".into(),
            operation: "run".into(),
        };
        assert_eq!(classify(&old, &new), MutationClass::MajorRequiresConfirmation);
    }
}
