//! Deblender output and residual payloads.

use serde::{Deserialize, Serialize};

use crate::provenance::RunProvenance;

/// Flux of one deblended source, one entry per filter band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceModel {
    /// Integrated flux per band.
    pub flux: Vec<f64>,
}

/// Timing and loss history reported for one blend fit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct FitDiagnostics {
    /// Milliseconds spent initializing sources.
    pub init_ms: f64,
    /// Milliseconds spent fitting the blend.
    pub fit_ms: f64,
    /// Loss value per iteration, first entry is the initial loss.
    pub loss: Vec<f64>,
}

/// Deblended model for one blend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlendModel {
    /// Identifier of the blend this model describes.
    pub blend_id: String,
    /// Rendered model cube, same layout as the observed images.
    pub model: Vec<f64>,
    /// One entry per detected center; `None` when initialization skipped it.
    pub sources: Vec<Option<SourceModel>>,
    /// Fit timing and loss history.
    pub fit: FitDiagnostics,
}

/// Result of a single deblender invocation over a whole scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelOutput {
    /// Identifier tagging this invocation.
    pub run_id: String,
    /// Per-blend models.
    pub blends: Vec<BlendModel>,
}

impl ModelOutput {
    /// Looks up the model for a blend.
    pub fn blend(&self, id: &str) -> Option<&BlendModel> {
        self.blends.iter().find(|blend| blend.blend_id == id)
    }
}

/// Summary statistics of one residual cube.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct ResidualStats {
    /// Root mean square of the residual over all pixels.
    pub rms: f64,
    /// Largest absolute residual.
    pub max_abs: f64,
    /// Mean of residual²/variance over weighted pixels.
    pub chi2_per_pixel: f64,
}

/// Residual cube of one blend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlendResidual {
    /// Identifier of the blend.
    pub blend_id: String,
    /// Cube shape as `[bands, height, width]`.
    pub shape: [usize; 3],
    /// Observed minus model, band-major.
    pub pixels: Vec<f64>,
    /// Summary statistics.
    pub stats: ResidualStats,
}

/// Residuals of one dataset under one revision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResidualArtifact {
    /// Run provenance; `run_id` matches the model output it was computed from.
    pub provenance: RunProvenance,
    /// Per-blend residuals in scene order.
    pub blends: Vec<BlendResidual>,
}
