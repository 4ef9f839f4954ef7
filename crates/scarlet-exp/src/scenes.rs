use std::fs;
use std::path::{Path, PathBuf};

use scarlet_core::{BlendData, DatasetId, ErrorInfo, HarnessError, SceneData, SceneProvider};
use tracing::debug;

use crate::codec::from_json_slice;

/// Loads blends stored as `<root>/<dataset>/<blend_id>.json`.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectorySceneProvider {
    root: PathBuf,
    dataset_dir: Option<PathBuf>,
}

impl DirectorySceneProvider {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            dataset_dir: None,
        }
    }

    /// Reads blends from `dir` directly instead of `<root>/<dataset>`.
    pub fn with_dataset_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dataset_dir = Some(dir.into());
        self
    }

    /// Directory the blends of `dataset` are read from.
    pub fn dataset_path(&self, dataset: DatasetId) -> PathBuf {
        self.dataset_dir
            .clone()
            .unwrap_or_else(|| self.root.join(dataset.as_str()))
    }

    /// Blend identifiers of a dataset, sorted.
    pub fn blend_ids(&self, dataset: DatasetId) -> Result<Vec<String>, HarnessError> {
        Ok(blend_files(&self.dataset_path(dataset))?
            .into_iter()
            .map(|(id, _)| id)
            .collect())
    }
}

impl SceneProvider for DirectorySceneProvider {
    fn load_scene(&self, dataset: DatasetId) -> Result<SceneData, HarnessError> {
        let dir = self.dataset_path(dataset);
        let files = blend_files(&dir)?;
        if files.is_empty() {
            return Err(HarnessError::Scene(
                ErrorInfo::new("scene-empty", "dataset directory contains no blends")
                    .with_context("dataset", dataset.as_str())
                    .with_context("path", dir.display().to_string()),
            ));
        }
        let mut blends = Vec::with_capacity(files.len());
        for (id, path) in files {
            blends.push(load_blend(&id, &path)?);
        }
        debug!(
            dataset = dataset.as_str(),
            blends = blends.len(),
            path = %dir.display(),
            "loaded scene"
        );
        Ok(SceneData { dataset, blends })
    }
}

fn blend_files(dir: &Path) -> Result<Vec<(String, PathBuf)>, HarnessError> {
    let entries = fs::read_dir(dir).map_err(|err| {
        HarnessError::Scene(
            ErrorInfo::new("scene-dir", "failed to list dataset directory")
                .with_context("path", dir.display().to_string())
                .with_hint(err.to_string()),
        )
    })?;
    let mut files = Vec::new();
    for entry in entries {
        let path = entry
            .map_err(|err| {
                HarnessError::Scene(
                    ErrorInfo::new("scene-entry", "failed to read directory entry")
                        .with_context("path", dir.display().to_string())
                        .with_hint(err.to_string()),
                )
            })?
            .path();
        if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
            files.push((stem.to_string(), path.clone()));
        }
    }
    files.sort();
    Ok(files)
}

fn load_blend(id: &str, path: &Path) -> Result<BlendData, HarnessError> {
    let bytes = fs::read(path).map_err(|err| {
        HarnessError::Scene(
            ErrorInfo::new("scene-read", "failed to read blend")
                .with_context("path", path.display().to_string())
                .with_hint(err.to_string()),
        )
    })?;
    let mut blend: BlendData = from_json_slice(&bytes).map_err(|err| {
        HarnessError::Scene(
            err.info()
                .clone()
                .with_context("path", path.display().to_string()),
        )
    })?;
    if blend.id.is_empty() {
        blend.id = id.to_string();
    } else if blend.id != id {
        return Err(HarnessError::Scene(
            ErrorInfo::new("scene-blend-id", "blend id does not match its file name")
                .with_context("path", path.display().to_string())
                .with_context("id", blend.id.clone()),
        ));
    }
    blend.validate()?;
    Ok(blend)
}
