use std::fs;

use scarlet_core::{
    ArtifactKind, DatasetId, HarnessError, ResidualArtifact, RevisionLabel, RunProvenance,
    SchemaVersion,
};
use scarlet_exp::{commit_all, RevisionStore};
use tempfile::tempdir;

fn label(text: &str) -> RevisionLabel {
    RevisionLabel::new(text).expect("label")
}

#[test]
fn layout_places_artifacts_under_dataset_and_revision() {
    let store = RevisionStore::new("/data/results");
    let path = store.location(DatasetId::Set2, &label("pr-42"), ArtifactKind::Residual);
    assert_eq!(
        path,
        std::path::Path::new("/data/results/set2/pr-42/residuals.json")
    );
}

#[test]
fn reserve_refuses_existing_artifact_without_overwrite() {
    let tmp = tempdir().expect("tempdir");
    let store = RevisionStore::new(tmp.path());
    let revision = label("pr-42");

    let handle = store
        .reserve(DatasetId::Set1, &revision, ArtifactKind::Measurement, false)
        .expect("first reservation");
    assert!(!handle.replaces());
    handle.write(b"first").expect("write");

    let err = store
        .reserve(DatasetId::Set1, &revision, ArtifactKind::Measurement, false)
        .expect_err("second reservation");
    assert!(matches!(err, HarnessError::ExistingRevision(_)));
    assert_eq!(err.info().code, "store-exists");
    assert!(err.info().hint.as_deref().unwrap_or_default().contains("--overwrite"));
    assert_eq!(fs::read(handle.location()).expect("read"), b"first");

    // Other kinds and datasets are independent.
    store
        .reserve(DatasetId::Set1, &revision, ArtifactKind::Residual, false)
        .expect("residual kind");
    store
        .reserve(DatasetId::Set2, &revision, ArtifactKind::Measurement, false)
        .expect("other dataset");
}

#[test]
fn overwrite_reservation_keeps_old_artifact_until_written() {
    let tmp = tempdir().expect("tempdir");
    let store = RevisionStore::new(tmp.path());
    let revision = label("master");
    store
        .reserve(DatasetId::Set3, &revision, ArtifactKind::Residual, false)
        .and_then(|handle| handle.write(b"{\"old\":true}"))
        .expect("seed");

    let handle = store
        .reserve(DatasetId::Set3, &revision, ArtifactKind::Residual, true)
        .expect("overwrite reservation");
    assert!(handle.replaces());
    assert_eq!(fs::read(handle.location()).expect("read"), b"{\"old\":true}");

    handle.write(b"{\"new\":true}").expect("replace");
    assert_eq!(fs::read(handle.location()).expect("read"), b"{\"new\":true}");
    let leftovers: Vec<_> = fs::read_dir(handle.location().parent().expect("parent"))
        .expect("list")
        .collect();
    assert_eq!(leftovers.len(), 1, "temporary files must not be left behind");
}

#[test]
fn staged_artifacts_stay_invisible_until_committed() {
    let tmp = tempdir().expect("tempdir");
    let store = RevisionStore::new(tmp.path());
    let revision = label("pr-42");
    let handle = store
        .reserve(DatasetId::Set2, &revision, ArtifactKind::Measurement, false)
        .expect("reserve");

    let staged = handle.stage(b"staged").expect("stage");
    assert!(!store.exists(DatasetId::Set2, &revision, ArtifactKind::Measurement));
    let written = commit_all(vec![staged]).expect("commit");
    assert_eq!(written, vec![handle.location().to_path_buf()]);
    assert_eq!(fs::read(handle.location()).expect("read"), b"staged");
}

#[test]
fn failed_commit_rolls_back_earlier_artifacts() {
    let tmp = tempdir().expect("tempdir");
    let store = RevisionStore::new(tmp.path());
    let replaced = label("pr-1");
    let fresh = label("pr-2");

    store
        .reserve(DatasetId::Set1, &replaced, ArtifactKind::Measurement, false)
        .and_then(|handle| handle.write(b"old"))
        .expect("seed");
    let blocked = store.location(DatasetId::Set1, &fresh, ArtifactKind::Residual);
    fs::create_dir_all(blocked.join("occupied")).expect("block residual path");

    let first = store
        .reserve(DatasetId::Set1, &replaced, ArtifactKind::Measurement, true)
        .expect("reserve replaced");
    let second = store
        .reserve(DatasetId::Set1, &fresh, ArtifactKind::Measurement, false)
        .expect("reserve fresh");
    let third = store
        .reserve(DatasetId::Set1, &fresh, ArtifactKind::Residual, true)
        .expect("reserve blocked");
    let staged = vec![
        first.stage(b"new").expect("stage"),
        second.stage(b"new").expect("stage"),
        third.stage(b"{}").expect("stage"),
    ];

    let err = commit_all(staged).expect_err("blocked commit");
    assert!(matches!(err, HarnessError::Storage(_)));
    assert_eq!(err.info().code, "store-persist");
    assert_eq!(fs::read(first.location()).expect("read"), b"old");
    assert!(!second.location().exists());
    assert!(blocked.is_dir());
}

#[test]
fn revision_index_deduplicates_and_keeps_order() {
    let tmp = tempdir().expect("tempdir");
    let store = RevisionStore::new(tmp.path());
    assert!(store.revisions(DatasetId::Set1).expect("empty").is_empty());

    assert!(store.record_revision(DatasetId::Set1, &label("b")).expect("b"));
    assert!(store.record_revision(DatasetId::Set1, &label("a")).expect("a"));
    assert!(!store.record_revision(DatasetId::Set1, &label("b")).expect("dup"));
    assert_eq!(
        store.revisions(DatasetId::Set1).expect("index"),
        vec![label("b"), label("a")]
    );
    assert!(store.revisions(DatasetId::Set2).expect("other").is_empty());
}

#[test]
fn loading_missing_artifact_is_a_storage_error() {
    let tmp = tempdir().expect("tempdir");
    let store = RevisionStore::new(tmp.path());
    let err = store
        .load_measurements(DatasetId::Set1, &label("ghost"))
        .expect_err("missing");
    assert!(matches!(err, HarnessError::Storage(_)));
    assert_eq!(err.info().code, "store-read");
}

#[test]
fn artifacts_from_a_newer_major_schema_are_rejected() {
    let tmp = tempdir().expect("tempdir");
    let store = RevisionStore::new(tmp.path());
    let revision = label("future");
    let artifact = ResidualArtifact {
        provenance: RunProvenance {
            schema_version: SchemaVersion::new(2, 0, 0),
            revision: "future".to_string(),
            ..RunProvenance::default()
        },
        blends: Vec::new(),
    };
    store
        .reserve(DatasetId::Set3, &revision, ArtifactKind::Residual, false)
        .and_then(|handle| handle.write(&serde_json::to_vec(&artifact).expect("encode")))
        .expect("write");

    let err = store
        .load_residuals(DatasetId::Set3, &revision)
        .expect_err("newer schema");
    assert_eq!(err.info().code, "schema-unsupported");
    assert_eq!(err.info().context.get("found").map(String::as_str), Some("2.0.0"));
}
