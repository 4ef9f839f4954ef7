#![deny(missing_docs)]
#![doc = "Core types and collaborator traits for the scarlet regression harness."]

pub mod errors;
pub mod model;
pub mod provenance;
pub mod scene;
mod types;

pub use errors::{ErrorInfo, HarnessError};
pub use model::{
    BlendModel, BlendResidual, FitDiagnostics, ModelOutput, ResidualArtifact, ResidualStats,
    SourceModel,
};
pub use provenance::{RunProvenance, SchemaVersion};
pub use scene::{BlendData, MatchedSource, SceneData};
pub use types::{ArtifactKind, BehaviorProfile, DatasetId, RevisionLabel};

/// Supplies scene pixels and truth catalogs for a dataset.
pub trait SceneProvider {
    /// Loads every blend of the dataset.
    fn load_scene(&self, dataset: DatasetId) -> Result<SceneData, HarnessError>;
}

/// The deblending algorithm under test.
pub trait Deblender {
    /// Deblends every blend of the scene in one invocation.
    ///
    /// Implementations report failures as [`HarnessError::Deblend`].
    fn deblend(&self, scene: &SceneData) -> Result<ModelOutput, HarnessError>;
}

/// Renders residuals for visual inspection.
pub trait ResidualPlotter {
    /// Renders or forwards a residual artifact. Failures are reported as
    /// [`HarnessError::Plotting`] and never abort a run.
    fn plot(&self, residuals: &ResidualArtifact) -> Result<(), HarnessError>;
}

impl<T: SceneProvider + ?Sized> SceneProvider for &T {
    fn load_scene(&self, dataset: DatasetId) -> Result<SceneData, HarnessError> {
        (**self).load_scene(dataset)
    }
}

impl<T: Deblender + ?Sized> Deblender for &T {
    fn deblend(&self, scene: &SceneData) -> Result<ModelOutput, HarnessError> {
        (**self).deblend(scene)
    }
}

impl<T: ResidualPlotter + ?Sized> ResidualPlotter for &T {
    fn plot(&self, residuals: &ResidualArtifact) -> Result<(), HarnessError> {
        (**self).plot(residuals)
    }
}

impl<T: SceneProvider + ?Sized> SceneProvider for Box<T> {
    fn load_scene(&self, dataset: DatasetId) -> Result<SceneData, HarnessError> {
        (**self).load_scene(dataset)
    }
}

impl<T: Deblender + ?Sized> Deblender for Box<T> {
    fn deblend(&self, scene: &SceneData) -> Result<ModelOutput, HarnessError> {
        (**self).deblend(scene)
    }
}

impl<T: ResidualPlotter + ?Sized> ResidualPlotter for Box<T> {
    fn plot(&self, residuals: &ResidualArtifact) -> Result<(), HarnessError> {
        (**self).plot(residuals)
    }
}
