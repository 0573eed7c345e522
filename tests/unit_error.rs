use taskboard::error::{exit_codes, Error, JsonError};

#[test]
fn exit_codes_map_correctly() {
    let user = Error::Validation("task text cannot be blank".to_string());
    assert_eq!(user.exit_code(), exit_codes::USER_ERROR);

    let auth = Error::InvalidCredentials;
    assert_eq!(auth.exit_code(), exit_codes::AUTH_ERROR);

    let op = Error::Persistence("connection refused".to_string());
    assert_eq!(op.exit_code(), exit_codes::OPERATION_FAILED);
}

#[test]
fn json_error_includes_code_and_details() {
    let err = Error::TaskNotFound(42);
    let json = JsonError::from(&err);
    assert_eq!(json.code, exit_codes::USER_ERROR);
    assert_eq!(json.kind, "not_found");
    assert!(json.message.contains("Task not found"));
    assert_eq!(json.details, Some(serde_json::json!({ "task_id": 42 })));
}

#[test]
fn duplicate_email_is_an_auth_error() {
    let err = Error::DuplicateEmail("ann@example.com".to_string());
    assert_eq!(err.kind(), "duplicate_email");
    assert_eq!(err.exit_code(), exit_codes::AUTH_ERROR);
}
