#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;

use scarlet_core::{
    BlendData, BlendModel, DatasetId, Deblender, ErrorInfo, FitDiagnostics, HarnessError,
    MatchedSource, ModelOutput, ResidualArtifact, ResidualPlotter, SceneData, SceneProvider,
    SourceModel,
};

pub fn filters() -> Vec<String> {
    vec!["g".to_string(), "r".to_string()]
}

/// Two-band 2x2 blend with two detections, the first matched to truth.
pub fn sample_blend(id: &str) -> BlendData {
    BlendData {
        id: id.to_string(),
        filters: filters(),
        shape: [2, 2, 2],
        images: vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0],
        variance: vec![1.0; 8],
        footprint: None,
        centers: vec![[0, 0], [1, 1]],
        matched: vec![MatchedSource {
            y: 0,
            x: 0,
            magnitudes: [("g".to_string(), 20.0), ("r".to_string(), 21.0)]
                .into_iter()
                .collect::<BTreeMap<_, _>>(),
        }],
    }
}

pub fn sample_scene(dataset: DatasetId) -> SceneData {
    SceneData {
        dataset,
        blends: vec![sample_blend("blend-a"), sample_blend("blend-b")],
    }
}

/// In-memory scene provider that counts loads.
#[derive(Default)]
pub struct MemoryScenes {
    pub loads: Cell<usize>,
}

impl SceneProvider for MemoryScenes {
    fn load_scene(&self, dataset: DatasetId) -> Result<SceneData, HarnessError> {
        self.loads.set(self.loads.get() + 1);
        Ok(sample_scene(dataset))
    }
}

/// Deterministic deblender: model = 0.9 * observed, g flux 1000, r flux 100.
/// Every call gets a fresh run id.
pub struct StubDeblender {
    pub calls: Cell<usize>,
    pub g_flux: f64,
}

impl Default for StubDeblender {
    fn default() -> Self {
        Self {
            calls: Cell::new(0),
            g_flux: 1000.0,
        }
    }
}

impl StubDeblender {
    pub fn with_g_flux(g_flux: f64) -> Self {
        Self {
            g_flux,
            ..Self::default()
        }
    }
}

impl Deblender for StubDeblender {
    fn deblend(&self, scene: &SceneData) -> Result<ModelOutput, HarnessError> {
        let call = self.calls.get() + 1;
        self.calls.set(call);
        let blends = scene
            .blends
            .iter()
            .map(|blend| BlendModel {
                blend_id: blend.id.clone(),
                model: blend.images.iter().map(|v| v * 0.9).collect(),
                sources: blend
                    .centers
                    .iter()
                    .map(|_| {
                        Some(SourceModel {
                            flux: vec![self.g_flux, 100.0],
                        })
                    })
                    .collect(),
                fit: FitDiagnostics {
                    init_ms: 5.0,
                    fit_ms: 40.0,
                    loss: vec![-10.0, -20.0, -30.0],
                },
            })
            .collect();
        Ok(ModelOutput {
            run_id: format!("run-{call}"),
            blends,
        })
    }
}

pub struct FailingDeblender;

impl Deblender for FailingDeblender {
    fn deblend(&self, _scene: &SceneData) -> Result<ModelOutput, HarnessError> {
        Err(HarnessError::Deblend(ErrorInfo::new(
            "deblend-diverged",
            "fit diverged",
        )))
    }
}

/// Records the run id of every plotted artifact.
#[derive(Default)]
pub struct RecordingPlotter {
    pub plotted: RefCell<Vec<String>>,
}

impl ResidualPlotter for RecordingPlotter {
    fn plot(&self, residuals: &ResidualArtifact) -> Result<(), HarnessError> {
        self.plotted
            .borrow_mut()
            .push(residuals.provenance.run_id.clone());
        Ok(())
    }
}

pub struct FailingPlotter;

impl ResidualPlotter for FailingPlotter {
    fn plot(&self, _residuals: &ResidualArtifact) -> Result<(), HarnessError> {
        Err(HarnessError::Plotting(ErrorInfo::new(
            "plot-backend",
            "no display available",
        )))
    }
}
