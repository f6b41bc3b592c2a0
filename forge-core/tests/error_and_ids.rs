use forge_core::{ArtifactId, DurationMs, ForgeError};

fn _assert_send_sync<T: Send + Sync>() {}

#[test]
fn forge_error_is_send_sync() {
    _assert_send_sync::<ForgeError>();
}

#[test]
fn typed_ids_round_trip_through_string() {
    let id = ArtifactId::from("art-123".to_string());
    assert_eq!(id.as_str(), "art-123");
    assert_eq!(id.to_string(), "art-123");
}

#[test]
fn duration_ms_serializes_as_plain_integer() {
    let d = DurationMs::from_millis(2500);
    assert_eq!(serde_json::to_string(&d).unwrap(), "2500");
    assert_eq!(d.to_std(), std::time::Duration::from_millis(2500));
}

#[test]
fn error_kind_and_failure_result_shape() {
    let err = ForgeError::BudgetExhausted { attempts: 6 };
    assert_eq!(err.kind(), "budget_exhausted");
    let result = err.into_result();
    assert!(!result.ok);
    assert_eq!(result.error_kind, "budget_exhausted");
    assert!(result.remedial_hint.is_some());
}

#[test]
fn tool_invocation_error_has_no_remedial_hint_by_default() {
    let err = ForgeError::ToolInvocationError {
        tool: "lint".into(),
        message: "exit code 2".into(),
    };
    let result = err.into_result();
    assert_eq!(result.error_kind, "tool_invocation_error");
    assert!(result.remedial_hint.is_none());
    assert!(result.message.contains("lint"));
}
