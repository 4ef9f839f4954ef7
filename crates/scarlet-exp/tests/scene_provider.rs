mod common;

use std::fs;
use std::path::Path;

use scarlet_core::{DatasetId, HarnessError, SceneProvider};
use scarlet_exp::DirectorySceneProvider;
use tempfile::tempdir;

fn write_blend(dir: &Path, file: &str, id: &str) {
    let blend = common::sample_blend(id);
    fs::create_dir_all(dir).expect("dataset dir");
    fs::write(dir.join(file), serde_json::to_vec(&blend).expect("encode")).expect("write");
}

#[test]
fn loads_blends_sorted_and_fills_missing_ids() {
    let tmp = tempdir().expect("tempdir");
    let dir = tmp.path().join("set2");
    write_blend(&dir, "b-002.json", "");
    write_blend(&dir, "a-001.json", "a-001");
    fs::write(dir.join("README.txt"), "not a blend").expect("write");

    let provider = DirectorySceneProvider::new(tmp.path());
    let scene = provider.load_scene(DatasetId::Set2).expect("scene");
    assert_eq!(scene.dataset, DatasetId::Set2);
    let ids: Vec<_> = scene.blends.iter().map(|b| b.id.as_str()).collect();
    assert_eq!(ids, ["a-001", "b-002"]);
    assert_eq!(
        provider.blend_ids(DatasetId::Set2).expect("ids"),
        vec!["a-001".to_string(), "b-002".to_string()]
    );
}

#[test]
fn empty_or_missing_dataset_is_a_scene_error() {
    let tmp = tempdir().expect("tempdir");
    let provider = DirectorySceneProvider::new(tmp.path());
    let err = provider.load_scene(DatasetId::Set1).expect_err("missing dir");
    assert!(matches!(err, HarnessError::Scene(_)));
    assert_eq!(err.info().code, "scene-dir");

    fs::create_dir_all(tmp.path().join("set1")).expect("dir");
    let err = provider.load_scene(DatasetId::Set1).expect_err("empty dir");
    assert_eq!(err.info().code, "scene-empty");
}

#[test]
fn mismatched_blend_id_is_rejected() {
    let tmp = tempdir().expect("tempdir");
    write_blend(&tmp.path().join("set3"), "a.json", "b");
    let err = DirectorySceneProvider::new(tmp.path())
        .load_scene(DatasetId::Set3)
        .expect_err("id mismatch");
    assert_eq!(err.info().code, "scene-blend-id");
}

#[test]
fn malformed_cube_is_rejected() {
    let tmp = tempdir().expect("tempdir");
    let dir = tmp.path().join("set1");
    let mut blend = common::sample_blend("a");
    blend.variance.pop();
    fs::create_dir_all(&dir).expect("dir");
    fs::write(dir.join("a.json"), serde_json::to_vec(&blend).expect("encode")).expect("write");

    let err = DirectorySceneProvider::new(tmp.path())
        .load_scene(DatasetId::Set1)
        .expect_err("bad shape");
    assert_eq!(err.info().code, "scene-shape");
    assert_eq!(err.info().context.get("field").map(String::as_str), Some("variance"));
}

#[test]
fn dataset_dir_override_ignores_root() {
    let tmp = tempdir().expect("tempdir");
    let custom = tmp.path().join("custom");
    write_blend(&custom, "x.json", "x");
    let provider = DirectorySceneProvider::new("/nonexistent").with_dataset_dir(&custom);
    assert_eq!(provider.dataset_path(DatasetId::Set1), custom);
    let scene = provider.load_scene(DatasetId::Set1).expect("scene");
    assert_eq!(scene.blends.len(), 1);
}
