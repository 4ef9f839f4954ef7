use scarlet_core::{
    BehaviorProfile, BlendData, BlendResidual, ErrorInfo, HarnessError, ModelOutput,
    ResidualArtifact, ResidualPlotter, ResidualStats, RunProvenance, SceneData,
};
use tracing::{info, warn};

/// Computes observed minus model residuals from an existing model output.
#[derive(Debug, Clone)]
pub struct ResidualStage<P> {
    plotter: P,
}

impl<P: ResidualPlotter> ResidualStage<P> {
    pub fn new(plotter: P) -> Self {
        Self { plotter }
    }

    /// Builds residuals for every blend, or `None` when the profile does not
    /// run the stage. A model that does not describe the scene is a
    /// [`HarnessError::Deblend`]. Nothing is written here.
    pub fn compute(
        &self,
        scene: &SceneData,
        model: &ModelOutput,
        profile: &BehaviorProfile,
        provenance: &RunProvenance,
    ) -> Result<Option<ResidualArtifact>, HarnessError> {
        if !profile.runs_residual_stage {
            return Ok(None);
        }
        let blends = scene
            .blends
            .iter()
            .map(|blend| residual_for(blend, model))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Some(ResidualArtifact {
            provenance: RunProvenance {
                run_id: model.run_id.clone(),
                ..provenance.clone()
            },
            blends,
        }))
    }

    /// Hands stored residuals to the plotter when the profile asks for it.
    /// Plotting failures come back as warnings and never fail the run.
    pub fn plot(&self, artifact: &ResidualArtifact, profile: &BehaviorProfile) -> Vec<HarnessError> {
        if !profile.plot_residuals {
            return Vec::new();
        }
        match self.plotter.plot(artifact) {
            Ok(()) => {
                info!(
                    dataset = artifact.provenance.dataset.as_str(),
                    blends = artifact.blends.len(),
                    "plotted residuals"
                );
                Vec::new()
            }
            Err(err) => {
                warn!(error = %err, "residual plotting failed; residual data kept");
                vec![err]
            }
        }
    }
}

/// JSON bytes of a residual artifact as stored on disk.
pub fn encode_residuals(artifact: &ResidualArtifact) -> Result<Vec<u8>, HarnessError> {
    serde_json::to_vec(artifact)
        .map_err(|err| HarnessError::Serde(ErrorInfo::new("residual-encode", err.to_string())))
}

fn residual_for(blend: &BlendData, model: &ModelOutput) -> Result<BlendResidual, HarnessError> {
    let blend_model = model.blend(&blend.id).ok_or_else(|| {
        HarnessError::Deblend(
            ErrorInfo::new("deblend-missing-blend", "deblender output lacks a blend")
                .with_context("blend", blend.id.clone())
                .with_context("run_id", model.run_id.clone()),
        )
    })?;
    if blend_model.model.len() != blend.images.len() {
        return Err(HarnessError::Deblend(
            ErrorInfo::new("deblend-model-shape", "model cube does not match the observation")
                .with_context("blend", blend.id.clone())
                .with_context("expected", blend.images.len().to_string())
                .with_context("found", blend_model.model.len().to_string()),
        ));
    }
    let pixels: Vec<f64> = blend
        .images
        .iter()
        .zip(&blend_model.model)
        .map(|(observed, model)| observed - model)
        .collect();
    let stats = residual_stats(blend, &pixels);
    Ok(BlendResidual {
        blend_id: blend.id.clone(),
        shape: blend.shape,
        pixels,
        stats,
    })
}

/// Summary statistics of a residual cube laid out like `blend.images`.
pub fn residual_stats(blend: &BlendData, residual: &[f64]) -> ResidualStats {
    if residual.is_empty() {
        return ResidualStats::default();
    }
    let sum_sq: f64 = residual.iter().map(|r| r * r).sum();
    let max_abs = residual.iter().fold(0.0_f64, |acc, r| acc.max(r.abs()));
    let (chi2, weighted) = residual
        .iter()
        .enumerate()
        .filter(|(idx, _)| blend.is_weighted(*idx))
        .fold((0.0, 0usize), |(chi2, n), (idx, r)| {
            (chi2 + r * r / blend.variance[idx], n + 1)
        });
    ResidualStats {
        rms: (sum_sq / residual.len() as f64).sqrt(),
        max_abs,
        chi2_per_pixel: if weighted == 0 { 0.0 } else { chi2 / weighted as f64 },
    }
}
