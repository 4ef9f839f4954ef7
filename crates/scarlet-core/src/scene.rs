//! Scene payloads handed to the deblender.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::errors::{ErrorInfo, HarnessError};
use crate::types::DatasetId;

/// Truth catalog entry for a source that was matched to a detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchedSource {
    /// Pixel row of the detection.
    pub y: i64,
    /// Pixel column of the detection.
    pub x: i64,
    /// True magnitude keyed by filter band.
    pub magnitudes: BTreeMap<String, f64>,
}

/// A single blend: a multi-band cutout with its detections and truth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlendData {
    /// Identifier of the blend inside its dataset. Defaults to the file stem
    /// when loaded from disk.
    #[serde(default)]
    pub id: String,
    /// Filter band names, one per image plane.
    pub filters: Vec<String>,
    /// Cube shape as `[bands, height, width]`.
    pub shape: [usize; 3],
    /// Observed pixels in band-major order.
    pub images: Vec<f64>,
    /// Per-pixel variance, same layout as `images`.
    pub variance: Vec<f64>,
    /// Pixels excluded from the fit when `true`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub footprint: Option<Vec<bool>>,
    /// Detected source centers as `[y, x]`.
    pub centers: Vec<[i64; 2]>,
    /// Truth catalog for matched detections.
    #[serde(default)]
    pub matched: Vec<MatchedSource>,
}

impl BlendData {
    /// Number of pixels in the cube.
    pub fn pixel_count(&self) -> usize {
        self.shape.iter().product()
    }

    /// Whether a pixel contributes to the likelihood.
    pub fn is_weighted(&self, idx: usize) -> bool {
        let masked = self
            .footprint
            .as_ref()
            .and_then(|mask| mask.get(idx).copied())
            .unwrap_or(false);
        !masked && self.variance.get(idx).is_some_and(|v| *v > 0.0)
    }

    /// Checks that every per-pixel array matches the declared shape.
    pub fn validate(&self) -> Result<(), HarnessError> {
        let expected = self.pixel_count();
        let mismatch = |field: &str, found: usize| {
            HarnessError::Scene(
                ErrorInfo::new("scene-shape", "blend array does not match its shape")
                    .with_context("blend", self.id.clone())
                    .with_context("field", field)
                    .with_context("expected", expected.to_string())
                    .with_context("found", found.to_string()),
            )
        };
        if self.filters.len() != self.shape[0] {
            return Err(mismatch("filters", self.filters.len()));
        }
        if self.images.len() != expected {
            return Err(mismatch("images", self.images.len()));
        }
        if self.variance.len() != expected {
            return Err(mismatch("variance", self.variance.len()));
        }
        if let Some(mask) = &self.footprint {
            if mask.len() != expected {
                return Err(mismatch("footprint", mask.len()));
            }
        }
        Ok(())
    }
}

/// All blends of one dataset, in load order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneData {
    /// Dataset the blends belong to.
    pub dataset: DatasetId,
    /// Blends sorted by identifier.
    pub blends: Vec<BlendData>,
}

impl SceneData {
    /// Looks up a blend by identifier.
    pub fn blend(&self, id: &str) -> Option<&BlendData> {
        self.blends.iter().find(|blend| blend.id == id)
    }
}
