use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use scarlet_core::{
    ArtifactKind, DatasetId, ErrorInfo, HarnessError, ResidualArtifact, RevisionLabel,
    RunProvenance, SchemaVersion,
};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::codec::from_json_slice;
use crate::records::MeasurementRecord;

/// Ordered list of revisions recorded for one dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
struct RevisionIndex {
    #[serde(default)]
    revisions: Vec<RevisionLabel>,
}

/// Filesystem store for artifacts keyed by dataset, revision and kind.
///
/// Layout under the root:
///
/// ```text
/// <root>/<dataset>/<revision>/measurements.csv
/// <root>/<dataset>/<revision>/residuals.json
/// <root>/revisions/<dataset>.json
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RevisionStore {
    root: PathBuf,
}

/// Permission to write one artifact, obtained through [`RevisionStore::reserve`].
#[derive(Debug, Clone, PartialEq)]
pub struct WriteHandle {
    dataset: DatasetId,
    revision: RevisionLabel,
    kind: ArtifactKind,
    location: PathBuf,
    replaces: bool,
}

impl RevisionStore {
    /// Store rooted at `root`; nothing is created until a reservation.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Artifact root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of an artifact, whether or not it exists.
    pub fn location(
        &self,
        dataset: DatasetId,
        revision: &RevisionLabel,
        kind: ArtifactKind,
    ) -> PathBuf {
        self.root
            .join(dataset.as_str())
            .join(revision.as_str())
            .join(kind.file_name())
    }

    /// Whether the artifact is present on disk.
    pub fn exists(&self, dataset: DatasetId, revision: &RevisionLabel, kind: ArtifactKind) -> bool {
        self.location(dataset, revision, kind).exists()
    }

    /// Checks the overwrite policy for one artifact and prepares its location.
    ///
    /// An existing artifact is left untouched here; with `overwrite` it is
    /// replaced atomically by [`WriteHandle::write`] or [`commit_all`].
    pub fn reserve(
        &self,
        dataset: DatasetId,
        revision: &RevisionLabel,
        kind: ArtifactKind,
        overwrite: bool,
    ) -> Result<WriteHandle, HarnessError> {
        let location = self.location(dataset, revision, kind);
        let replaces = location.exists();
        if replaces && !overwrite {
            return Err(HarnessError::ExistingRevision(
                ErrorInfo::new(
                    "store-exists",
                    format!(
                        "revision {revision} has already been analyzed for {dataset}"
                    ),
                )
                .with_context("dataset", dataset.as_str())
                .with_context("revision", revision.as_str())
                .with_context("kind", kind.as_str())
                .with_context("path", location.display().to_string())
                .with_hint("pass --overwrite to replace the stored results"),
            ));
        }
        if let Some(parent) = location.parent() {
            create_dir(parent)?;
        }
        debug!(
            dataset = dataset.as_str(),
            revision = revision.as_str(),
            kind = kind.as_str(),
            replaces,
            "reserved artifact location"
        );
        Ok(WriteHandle {
            dataset,
            revision: revision.clone(),
            kind,
            location,
            replaces,
        })
    }

    /// Appends a revision to the dataset's index. Returns `false` if it was
    /// already recorded.
    pub fn record_revision(
        &self,
        dataset: DatasetId,
        revision: &RevisionLabel,
    ) -> Result<bool, HarnessError> {
        let mut index = self.load_index(dataset)?;
        if index.revisions.contains(revision) {
            return Ok(false);
        }
        index.revisions.push(revision.clone());
        let bytes = serde_json::to_vec_pretty(&index).map_err(|err| {
            HarnessError::Serde(ErrorInfo::new("store-index-encode", err.to_string()))
        })?;
        let path = self.index_path(dataset);
        if let Some(parent) = path.parent() {
            create_dir(parent)?;
        }
        atomic_write(&path, &bytes)?;
        info!(
            dataset = dataset.as_str(),
            revision = revision.as_str(),
            "recorded revision"
        );
        Ok(true)
    }

    /// Revisions of a dataset in the order they were first recorded.
    pub fn revisions(&self, dataset: DatasetId) -> Result<Vec<RevisionLabel>, HarnessError> {
        Ok(self.load_index(dataset)?.revisions)
    }

    /// Reads a stored measurement record back.
    pub fn load_measurements(
        &self,
        dataset: DatasetId,
        revision: &RevisionLabel,
    ) -> Result<MeasurementRecord, HarnessError> {
        let bytes = self.read_artifact(dataset, revision, ArtifactKind::Measurement)?;
        let record = MeasurementRecord::from_csv_slice(&bytes)?;
        check_schema(&record.provenance)?;
        Ok(record)
    }

    /// Reads a stored residual artifact back.
    pub fn load_residuals(
        &self,
        dataset: DatasetId,
        revision: &RevisionLabel,
    ) -> Result<ResidualArtifact, HarnessError> {
        let bytes = self.read_artifact(dataset, revision, ArtifactKind::Residual)?;
        let artifact: ResidualArtifact = from_json_slice(&bytes)?;
        check_schema(&artifact.provenance)?;
        Ok(artifact)
    }

    fn read_artifact(
        &self,
        dataset: DatasetId,
        revision: &RevisionLabel,
        kind: ArtifactKind,
    ) -> Result<Vec<u8>, HarnessError> {
        let path = self.location(dataset, revision, kind);
        fs::read(&path).map_err(|err| {
            HarnessError::Storage(
                ErrorInfo::new("store-read", "failed to read artifact")
                    .with_context("dataset", dataset.as_str())
                    .with_context("revision", revision.as_str())
                    .with_context("path", path.display().to_string())
                    .with_hint(err.to_string()),
            )
        })
    }

    fn index_path(&self, dataset: DatasetId) -> PathBuf {
        self.root
            .join("revisions")
            .join(format!("{}.json", dataset.as_str()))
    }

    fn load_index(&self, dataset: DatasetId) -> Result<RevisionIndex, HarnessError> {
        let path = self.index_path(dataset);
        if !path.exists() {
            return Ok(RevisionIndex::default());
        }
        let bytes = fs::read(&path).map_err(|err| {
            HarnessError::Storage(
                ErrorInfo::new("store-index-read", "failed to read revision index")
                    .with_context("path", path.display().to_string())
                    .with_hint(err.to_string()),
            )
        })?;
        from_json_slice(&bytes)
    }
}

impl WriteHandle {
    /// Dataset the artifact belongs to.
    pub fn dataset(&self) -> DatasetId {
        self.dataset
    }

    /// Revision the artifact belongs to.
    pub fn revision(&self) -> &RevisionLabel {
        &self.revision
    }

    /// Kind of artifact this handle may write.
    pub fn kind(&self) -> ArtifactKind {
        self.kind
    }

    /// Final path of the artifact.
    pub fn location(&self) -> &Path {
        &self.location
    }

    /// Whether an artifact existed at reservation time.
    pub fn replaces(&self) -> bool {
        self.replaces
    }

    /// Writes the full artifact. Readers see either the previous artifact or
    /// the new one, never a partial file.
    pub fn write(&self, bytes: &[u8]) -> Result<(), HarnessError> {
        commit_all(vec![self.stage(bytes)?]).map(|_| ())
    }

    /// Writes `bytes` to a temporary file next to the artifact without
    /// touching the artifact itself. Nothing becomes visible until the staged
    /// file is committed with [`commit_all`].
    pub fn stage(&self, bytes: &[u8]) -> Result<StagedArtifact, HarnessError> {
        let dir = self.location.parent().unwrap_or_else(|| Path::new("."));
        let location = &self.location;
        let mut tmp = NamedTempFile::new_in(dir).map_err(|err| {
            storage_error(location, "store-temp", "failed to create temporary file", &err)
        })?;
        tmp.write_all(bytes)
            .and_then(|_| tmp.as_file().sync_all())
            .map_err(|err| storage_error(location, "store-write", "failed to write artifact", &err))?;
        let previous = if location.is_file() {
            Some(fs::read(location).map_err(|err| {
                storage_error(location, "store-read", "failed to read artifact", &err)
            })?)
        } else {
            None
        };
        Ok(StagedArtifact {
            handle: self.clone(),
            tmp,
            previous,
        })
    }
}

/// Artifact bytes written to a temporary file, waiting to replace the
/// artifact at its reserved location.
#[derive(Debug)]
pub struct StagedArtifact {
    handle: WriteHandle,
    tmp: NamedTempFile,
    previous: Option<Vec<u8>>,
}

impl StagedArtifact {
    /// Handle the artifact was staged through.
    pub fn handle(&self) -> &WriteHandle {
        &self.handle
    }
}

/// Moves every staged artifact into place, in order. If one fails, the
/// artifacts committed before it are restored to their previous contents (or
/// removed when they did not exist), so either all of them land or none do.
///
/// Returns the committed paths.
pub fn commit_all(staged: Vec<StagedArtifact>) -> Result<Vec<PathBuf>, HarnessError> {
    let mut committed: Vec<(WriteHandle, Option<Vec<u8>>)> = Vec::with_capacity(staged.len());
    for artifact in staged {
        let StagedArtifact {
            handle,
            tmp,
            previous,
        } = artifact;
        if let Err(err) = tmp.persist(&handle.location) {
            let failure = HarnessError::Storage(
                ErrorInfo::new("store-persist", "failed to move artifact into place")
                    .with_context("kind", handle.kind.as_str())
                    .with_context("path", handle.location.display().to_string())
                    .with_hint(err.to_string()),
            );
            for (done, previous) in committed.iter().rev() {
                roll_back(done, previous.as_deref());
            }
            return Err(failure);
        }
        info!(
            dataset = handle.dataset.as_str(),
            revision = handle.revision.as_str(),
            kind = handle.kind.as_str(),
            path = %handle.location.display(),
            replaced = handle.replaces,
            "wrote artifact"
        );
        committed.push((handle, previous));
    }
    Ok(committed
        .into_iter()
        .map(|(handle, _)| handle.location)
        .collect())
}

fn roll_back(handle: &WriteHandle, previous: Option<&[u8]>) {
    let restored = match previous {
        Some(bytes) => atomic_write(&handle.location, bytes),
        None => fs::remove_file(&handle.location).map_err(|err| {
            storage_error(&handle.location, "store-remove", "failed to remove artifact", &err)
        }),
    };
    match restored {
        Ok(()) => warn!(
            kind = handle.kind.as_str(),
            path = %handle.location.display(),
            "rolled back artifact after a failed commit"
        ),
        Err(err) => warn!(
            kind = handle.kind.as_str(),
            error = %err,
            "could not roll back artifact"
        ),
    }
}

fn check_schema(provenance: &RunProvenance) -> Result<(), HarnessError> {
    if SchemaVersion::CURRENT.reads(&provenance.schema_version) {
        return Ok(());
    }
    Err(HarnessError::Serde(
        ErrorInfo::new("schema-unsupported", "artifact schema is not readable by this build")
            .with_context("found", provenance.schema_version.to_string())
            .with_context("supported", SchemaVersion::CURRENT.to_string())
            .with_context("revision", provenance.revision.clone()),
    ))
}

fn create_dir(path: &Path) -> Result<(), HarnessError> {
    fs::create_dir_all(path).map_err(|err| {
        HarnessError::Storage(
            ErrorInfo::new("store-create", "failed to create artifact directory")
                .with_context("path", path.display().to_string())
                .with_hint(err.to_string()),
        )
    })
}

fn storage_error(path: &Path, code: &str, message: &str, err: &dyn ToString) -> HarnessError {
    HarnessError::Storage(
        ErrorInfo::new(code, message)
            .with_context("path", path.display().to_string())
            .with_hint(err.to_string()),
    )
}

fn atomic_write(path: &Path, bytes: &[u8]) -> Result<(), HarnessError> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir).map_err(|err| {
        storage_error(path, "store-temp", "failed to create temporary file", &err)
    })?;
    tmp.write_all(bytes)
        .and_then(|_| tmp.as_file().sync_all())
        .map_err(|err| storage_error(path, "store-write", "failed to write artifact", &err))?;
    tmp.persist(path).map_err(|err| {
        storage_error(path, "store-persist", "failed to move artifact into place", &err)
    })?;
    Ok(())
}
