use proptest::prelude::*;
use scarlet_core::{ArtifactKind, BehaviorProfile, DatasetId, HarnessError, RevisionLabel};

#[test]
fn dataset_ids_parse_registered_names() {
    for id in DatasetId::ALL {
        let parsed: DatasetId = id.as_str().parse().expect("registered");
        assert_eq!(parsed, id);
    }
    assert_eq!(DatasetId::from_index(2).expect("set2"), DatasetId::Set2);
}

#[test]
fn unregistered_dataset_is_unknown() {
    for name in ["set0", "set4", "SET1", "", "set 1"] {
        let err = name.parse::<DatasetId>().expect_err("unregistered");
        assert!(matches!(err, HarnessError::UnknownDataset(_)), "{name}");
    }
    assert!(matches!(
        DatasetId::from_index(7),
        Err(HarnessError::UnknownDataset(_))
    ));
}

#[test]
fn dataset_serializes_lowercase() {
    let json = serde_json::to_string(&DatasetId::Set3).expect("serialize");
    assert_eq!(json, "\"set3\"");
}

#[test]
fn revision_labels_reject_unusable_keys() {
    for label in ["", "   ", ".", "..", "feature/x", "a\\b"] {
        let err = RevisionLabel::new(label).expect_err("invalid");
        assert!(matches!(err, HarnessError::InvalidRevision(_)), "{label:?}");
    }
    assert_eq!(RevisionLabel::new("pr-42").expect("valid").as_str(), "pr-42");
}

#[test]
fn revision_label_deserialization_validates() {
    let ok: RevisionLabel = serde_json::from_str("\"master\"").expect("valid");
    assert_eq!(ok.to_string(), "master");
    assert!(serde_json::from_str::<RevisionLabel>("\"\"").is_err());
}

#[test]
fn forcing_residuals_keeps_plot_flag() {
    let profile = BehaviorProfile {
        runs_residual_stage: false,
        save_records: true,
        save_residuals: false,
        plot_residuals: false,
    };
    let forced = profile.forcing_residuals();
    assert!(forced.runs_residual_stage);
    assert!(forced.save_residuals);
    assert!(forced.save_records);
    assert!(!forced.plot_residuals);
}

#[test]
fn artifact_kinds_have_distinct_files() {
    assert_ne!(
        ArtifactKind::Measurement.file_name(),
        ArtifactKind::Residual.file_name()
    );
}

proptest! {
    #[test]
    fn plain_labels_are_accepted(label in "[A-Za-z0-9][A-Za-z0-9_.-]{0,40}") {
        prop_assume!(label != "." && label != "..");
        let parsed = RevisionLabel::new(label.clone()).expect("valid label");
        prop_assert_eq!(parsed.as_str(), label.as_str());
    }

    #[test]
    fn labels_with_separators_are_rejected(head in "[a-z]{1,8}", tail in "[a-z]{1,8}") {
        let label = format!("{head}/{tail}");
        prop_assert!(RevisionLabel::new(label).is_err());
    }
}
