use std::collections::BTreeMap;
use std::f64::consts::PI;

use chrono::{SecondsFormat, Utc};
use scarlet_core::{
    BlendData, BlendModel, Deblender, ErrorInfo, HarnessError, ModelOutput, RevisionLabel,
    RunProvenance, SceneData,
};
use tracing::{info, warn};

use crate::codec::content_hash;
use crate::records::{MeasurementRecord, RecordRow};

/// Zero point used to turn model flux into a magnitude.
const MAG_ZERO_POINT: f64 = 27.0;

/// Blend-level fit diagnostics appended after the per-band diff columns.
pub const DIAGNOSTIC_COLUMNS: [&str; 5] = ["init time", "runtime", "iterations", "logL", "init logL"];

/// Output of a measurement run. `model` is handed on to the residual stage.
#[derive(Debug, Clone, PartialEq)]
pub struct Measured {
    pub record: MeasurementRecord,
    pub model: ModelOutput,
}

/// Deblends a scene once and measures flux errors and fit diagnostics.
#[derive(Debug, Clone)]
pub struct MeasurementStage<D> {
    deblender: D,
    filters: Vec<String>,
}

impl<D: Deblender> MeasurementStage<D> {
    pub fn new(deblender: D, filters: Vec<String>) -> Self {
        Self { deblender, filters }
    }

    pub fn filters(&self) -> &[String] {
        &self.filters
    }

    /// Record columns: `"<band> diff"` per filter, then [`DIAGNOSTIC_COLUMNS`].
    pub fn columns(&self) -> Vec<String> {
        self.filters
            .iter()
            .map(|band| format!("{band} diff"))
            .chain(DIAGNOSTIC_COLUMNS.iter().map(|c| c.to_string()))
            .collect()
    }

    /// Runs the deblender and builds the measurement record. Nothing is
    /// written here; the caller persists the record once every stage of the
    /// run has succeeded.
    pub fn run(
        &self,
        scene: &SceneData,
        revision: &RevisionLabel,
    ) -> Result<Measured, HarnessError> {
        info!(
            dataset = scene.dataset.as_str(),
            revision = revision.as_str(),
            blends = scene.blends.len(),
            "deblending scene"
        );
        let model = self.deblender.deblend(scene)?;
        if model.run_id.trim().is_empty() {
            return Err(HarnessError::Deblend(ErrorInfo::new(
                "deblend-run-id",
                "deblender output has no run id",
            )));
        }

        let mut rows = Vec::new();
        for (idx, blend) in scene.blends.iter().enumerate() {
            let blend_model = model.blend(&blend.id).ok_or_else(|| {
                HarnessError::Deblend(
                    ErrorInfo::new("deblend-missing-blend", "deblender output lacks a blend")
                        .with_context("blend", blend.id.clone())
                        .with_context("run_id", model.run_id.clone()),
                )
            })?;
            info!(
                blend = blend.id.as_str(),
                "measuring blend {} of {}",
                idx + 1,
                scene.blends.len()
            );
            rows.extend(measure_blend(blend, blend_model, &self.filters)?);
        }

        let record = MeasurementRecord {
            provenance: provenance(scene, revision, &model.run_id)?,
            columns: self.columns(),
            rows,
        };
        Ok(Measured { record, model })
    }
}

fn provenance(
    scene: &SceneData,
    revision: &RevisionLabel,
    run_id: &str,
) -> Result<RunProvenance, HarnessError> {
    let mut tool_versions = BTreeMap::new();
    tool_versions.insert(
        env!("CARGO_PKG_NAME").to_string(),
        env!("CARGO_PKG_VERSION").to_string(),
    );
    Ok(RunProvenance {
        schema_version: Default::default(),
        dataset: scene.dataset.as_str().to_string(),
        revision: revision.to_string(),
        run_id: run_id.to_string(),
        scene_hash: content_hash(scene)?,
        created_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        tool_versions,
    })
}

/// Gaussian log-likelihood normalization of a blend:
/// `N/2·ln(2π) + Σ ln(variance)/2` over pixels that carry weight.
pub fn log_norm(blend: &BlendData) -> f64 {
    let log_sigma: f64 = (0..blend.variance.len())
        .filter(|&idx| blend.is_weighted(idx))
        .map(|idx| blend.variance[idx].ln())
        .sum();
    blend.pixel_count() as f64 / 2.0 * (2.0 * PI).ln() + log_sigma / 2.0
}

fn measure_blend(
    blend: &BlendData,
    model: &BlendModel,
    filters: &[String],
) -> Result<Vec<RecordRow>, HarnessError> {
    let band_index = filters
        .iter()
        .map(|band| {
            blend.filters.iter().position(|f| f == band).ok_or_else(|| {
                HarnessError::Scene(
                    ErrorInfo::new("scene-band", "blend lacks a configured filter band")
                        .with_context("blend", blend.id.clone())
                        .with_context("band", band.clone()),
                )
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    if model.sources.len() != blend.centers.len() {
        return Err(HarnessError::Deblend(
            ErrorInfo::new("deblend-source-count", "one source entry per center is required")
                .with_context("blend", blend.id.clone())
                .with_context("centers", blend.centers.len().to_string())
                .with_context("sources", model.sources.len().to_string()),
        ));
    }
    let (first_loss, last_loss) = match (model.fit.loss.first(), model.fit.loss.last()) {
        (Some(first), Some(last)) => (*first, *last),
        _ => {
            return Err(HarnessError::Deblend(
                ErrorInfo::new("deblend-loss", "fit reported no loss history")
                    .with_context("blend", blend.id.clone()),
            ))
        }
    };

    let norm = log_norm(blend);
    let fitted = model.sources.iter().flatten().count().max(1);
    let diagnostics = [
        model.fit.init_ms,
        model.fit.fit_ms / fitted as f64,
        model.fit.loss.len() as f64,
        last_loss - norm,
        first_loss - norm,
    ];

    let mut rows = Vec::with_capacity(blend.matched.len());
    for (k, truth) in blend.matched.iter().enumerate() {
        let source = blend
            .centers
            .iter()
            .position(|&[y, x]| y == truth.y && x == truth.x)
            .and_then(|idx| model.sources[idx].as_ref());
        if source.is_none() {
            warn!(
                blend = blend.id.as_str(),
                y = truth.y,
                x = truth.x,
                "matched source has no deblended model"
            );
        }
        let mut values: Vec<f64> = filters
            .iter()
            .zip(&band_index)
            .map(|(band, &b)| {
                let true_mag = truth.magnitudes.get(band).copied().unwrap_or(f64::NAN);
                let flux = source
                    .and_then(|s| s.flux.get(b).copied())
                    .unwrap_or(f64::NAN);
                true_mag - (MAG_ZERO_POINT - 2.5 * flux.log10())
            })
            .collect();
        values.extend_from_slice(&diagnostics);
        rows.push(RecordRow {
            blend_id: blend.id.clone(),
            source: k,
            values,
        });
    }
    Ok(rows)
}
