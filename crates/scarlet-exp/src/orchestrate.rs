use std::path::PathBuf;

use scarlet_core::{
    ArtifactKind, BehaviorProfile, DatasetId, Deblender, ErrorInfo, HarnessError,
    ResidualArtifact, ResidualPlotter, RevisionLabel, SceneProvider,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::measure::MeasurementStage;
use crate::records::MeasurementRecord;
use crate::registry::DatasetRegistry;
use crate::residual::{encode_residuals, ResidualStage};
use crate::store::{commit_all, RevisionStore};

/// One requested regression run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRequest {
    pub dataset: String,
    pub revision: String,
    #[serde(default)]
    pub overwrite: bool,
    /// Run and save residuals even when the dataset profile does not.
    #[serde(default)]
    pub force_residuals: bool,
}

impl RunRequest {
    pub fn new(dataset: impl Into<String>, revision: impl Into<String>, overwrite: bool) -> Self {
        Self {
            dataset: dataset.into(),
            revision: revision.into(),
            overwrite,
            force_residuals: false,
        }
    }

    pub fn forcing_residuals(mut self) -> Self {
        self.force_residuals = true;
        self
    }
}

/// Everything a successful run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutcome {
    pub dataset: DatasetId,
    pub revision: RevisionLabel,
    pub profile: BehaviorProfile,
    pub record: MeasurementRecord,
    pub residuals: Option<ResidualArtifact>,
    /// Paths written during the run.
    pub written: Vec<PathBuf>,
    /// Non-fatal errors reported by the stages.
    pub warnings: Vec<HarnessError>,
}

/// Resolves a request into a profile and drives both stages over a single
/// deblend of the scene.
#[derive(Debug)]
pub struct Orchestrator<S, D, P> {
    store: RevisionStore,
    scenes: S,
    measurement: MeasurementStage<D>,
    residuals: ResidualStage<P>,
}

impl<S, D, P> Orchestrator<S, D, P>
where
    S: SceneProvider,
    D: Deblender,
    P: ResidualPlotter,
{
    pub fn new(
        store: RevisionStore,
        scenes: S,
        measurement: MeasurementStage<D>,
        residuals: ResidualStage<P>,
    ) -> Self {
        Self {
            store,
            scenes,
            measurement,
            residuals,
        }
    }

    pub fn store(&self) -> &RevisionStore {
        &self.store
    }

    /// Runs the request start to finish. Unknown datasets, invalid labels and
    /// existing artifacts are rejected before the scene is loaded. Artifacts
    /// are written only after both stages succeed, and a failed write rolls
    /// back the ones already committed.
    pub fn execute(&self, request: &RunRequest) -> Result<RunOutcome, HarnessError> {
        let (dataset, mut profile) = DatasetRegistry::resolve(&request.dataset)?;
        if request.force_residuals {
            profile = profile.forcing_residuals();
        }
        let revision = RevisionLabel::new(request.revision.clone())?;
        info!(
            dataset = dataset.as_str(),
            revision = revision.as_str(),
            overwrite = request.overwrite,
            residuals = profile.runs_residual_stage,
            "starting regression run"
        );

        let measurement_handle =
            self.store
                .reserve(dataset, &revision, ArtifactKind::Measurement, request.overwrite)?;
        let residual_handle = if profile.runs_residual_stage && profile.save_residuals {
            Some(self.store.reserve(
                dataset,
                &revision,
                ArtifactKind::Residual,
                request.overwrite,
            )?)
        } else {
            None
        };

        let scene = self.scenes.load_scene(dataset)?;
        let measured = self.measurement.run(&scene, &revision)?;
        let residuals = self.residuals.compute(
            &scene,
            &measured.model,
            &profile,
            &measured.record.provenance,
        )?;

        // Both stages succeeded; only now does anything reach the store.
        let mut staged = Vec::new();
        if profile.save_records {
            staged.push(measurement_handle.stage(&measured.record.to_csv_bytes()?)?);
        }
        if let Some(artifact) = residuals.as_ref().filter(|_| profile.save_residuals) {
            let handle = residual_handle.as_ref().ok_or_else(|| {
                HarnessError::Storage(
                    ErrorInfo::new("residual-unreserved", "residual artifact was not reserved")
                        .with_context("dataset", dataset.as_str())
                        .with_context("revision", revision.as_str()),
                )
            })?;
            staged.push(handle.stage(&encode_residuals(artifact)?)?);
        }
        let written = commit_all(staged)?;
        if !written.is_empty() {
            self.store.record_revision(dataset, &revision)?;
        }

        let warnings = residuals
            .as_ref()
            .map(|artifact| self.residuals.plot(artifact, &profile))
            .unwrap_or_default();
        info!(
            dataset = dataset.as_str(),
            revision = revision.as_str(),
            rows = measured.record.rows.len(),
            artifacts = written.len(),
            warnings = warnings.len(),
            "regression run complete"
        );

        Ok(RunOutcome {
            dataset,
            revision,
            profile,
            record: measured.record,
            residuals,
            written,
            warnings,
        })
    }
}
