use study_core::errors::{ErrorInfo, StudyError};

fn sample_info(code: &str, message: &str) -> ErrorInfo {
    ErrorInfo::new(code, message)
        .with_context("phase", "block1")
        .with_context("reason", "example")
}

#[test]
fn session_error_surface() {
    let err = StudyError::Session(sample_info("session-invalid-phase", "not in block1"));
    assert_eq!(err.code(), "session-invalid-phase");
    assert!(err.info().context.contains_key("phase"));
}

#[test]
fn config_error_surface() {
    let err = StudyError::Config(sample_info("config-no-categories", "empty"));
    assert_eq!(err.info().code, "config-no-categories");
    assert!(err.info().context.contains_key("reason"));
}

#[test]
fn display_includes_context_and_hint() {
    let err = StudyError::Codec(
        ErrorInfo::new("codec-base64", "payload is not base64")
            .with_context("len", "3")
            .with_hint("check URL decoding"),
    );
    let rendered = err.to_string();
    assert!(rendered.starts_with("codec error: payload is not base64 (code: codec-base64)"));
    assert!(rendered.contains("len=3"));
    assert!(rendered.ends_with("hint: check URL decoding"));
}

#[test]
fn errors_serialize_with_family_tag() {
    let err = StudyError::Storage(ErrorInfo::new("storage-write", "disk full"));
    let json = serde_json::to_value(&err).unwrap();
    assert_eq!(json["family"], "Storage");
    assert_eq!(json["detail"]["code"], "storage-write");
    let back: StudyError = serde_json::from_value(json).unwrap();
    assert_eq!(back, err);
}
