use scarlet_core::errors::{ErrorInfo, HarnessError};

fn sample_info(code: &str, message: &str) -> ErrorInfo {
    ErrorInfo::new(code, message)
        .with_context("dataset", "set1")
        .with_context("revision", "pr-42")
}

#[test]
fn unknown_dataset_surface() {
    let err = HarnessError::UnknownDataset(sample_info("dataset-unknown", "not registered"));
    assert_eq!(err.info().code, "dataset-unknown");
    assert!(err.info().context.contains_key("dataset"));
    assert!(err.is_fatal());
    assert_eq!(err.family(), "unknown-dataset");
}

#[test]
fn existing_revision_surface() {
    let err = HarnessError::ExistingRevision(sample_info("store-exists", "already stored"));
    assert!(err.info().context.contains_key("revision"));
    assert!(err.is_fatal());
}

#[test]
fn deblend_surface() {
    let err = HarnessError::Deblend(sample_info("deblend-exit", "non-zero exit"));
    assert!(err.is_fatal());
    assert_eq!(err.family(), "deblend");
}

#[test]
fn plotting_is_not_fatal() {
    let err = HarnessError::Plotting(sample_info("plot-failed", "renderer crashed"));
    assert!(!err.is_fatal());
}

#[test]
fn display_includes_context_and_hint() {
    let err = HarnessError::Storage(
        ErrorInfo::new("store-write", "failed to write artifact")
            .with_context("path", "/tmp/x")
            .with_hint("check permissions"),
    );
    let text = err.to_string();
    assert!(text.starts_with("storage error: failed to write artifact (code: store-write)"));
    assert!(text.contains("path=/tmp/x"));
    assert!(text.contains("hint: check permissions"));
}

#[test]
fn errors_serialize_with_family_tag() {
    let err = HarnessError::Config(ErrorInfo::new("config-filters", "no filters"));
    let json = serde_json::to_value(&err).expect("serialize");
    assert_eq!(json["family"], "Config");
    assert_eq!(json["detail"]["code"], "config-filters");
    let decoded: HarnessError = serde_json::from_value(json).expect("deserialize");
    assert_eq!(decoded, err);
}
