//! Output contracts: the declared shape a sandboxed process's stdout
//! must satisfy for its run to count as successful.

/// A contract stdout is checked against once the process exits.
#[non_exhaustive]
pub enum OutputContract {
    /// No shape requirement; any stdout (including empty) passes.
    Unconstrained,
    /// Stdout must parse as a single JSON value.
    Json,
    /// Stdout must parse as newline-delimited JSON, one value per line.
    /// Blank lines are ignored.
    JsonLines,
    /// Stdout must be non-empty once trimmed.
    NonEmpty,
}

impl OutputContract {
    /// Check `stdout` against this contract.
    pub fn is_satisfied_by(&self, stdout: &str) -> bool {
        match self {
            OutputContract::Unconstrained => true,
            OutputContract::Json => serde_json::from_str::<serde_json::Value>(stdout).is_ok(),
            OutputContract::JsonLines => stdout
                .lines()
                .filter(|l| !l.trim().is_empty())
                .all(|l| serde_json::from_str::<serde_json::Value>(l).is_ok()),
            OutputContract::NonEmpty => !stdout.trim().is_empty(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_contract_rejects_malformed_output() {
        assert!(OutputContract::Json.is_satisfied_by("{\"ok\":true}"));
        assert!(!OutputContract::Json.is_satisfied_by("not json"));
    }

    #[test]
    fn json_lines_contract_ignores_blank_lines() {
        let stdout = "{\"a\":1}\n\n{\"b\":2}\n";
        assert!(OutputContract::JsonLines.is_satisfied_by(stdout));
    }

    #[test]
    fn unconstrained_accepts_empty_output() {
        assert!(OutputContract::Unconstrained.is_satisfied_by(""));
    }

    #[test]
    fn non_empty_rejects_whitespace_only_output() {
        assert!(!OutputContract::NonEmpty.is_satisfied_by("   \n"));
    }
}
