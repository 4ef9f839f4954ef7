//! Regression runs of a deblender under a named revision: dataset dispatch,
//! revision-scoped storage and the measurement/residual pipeline.

mod codec;
mod config;
mod measure;
mod metrics;
mod orchestrate;
mod process;
mod records;
mod registry;
mod residual;
mod scenes;
mod store;

pub use codec::{content_hash, from_json_slice, from_yaml_slice, to_canonical_json_bytes};
pub use config::{CommandSpec, HarnessConfig};
pub use measure::{log_norm, MeasurementStage, Measured, DIAGNOSTIC_COLUMNS};
pub use metrics::{
    compare_revisions, metric, summarize, Comparison, MetricSpec, Regression, RevisionSummary,
    Summary, Tolerance, METRICS,
};
pub use orchestrate::{Orchestrator, RunOutcome, RunRequest};
pub use process::{CommandDeblender, CommandPlotter, LogPlotter};
pub use records::{MeasurementRecord, RecordRow};
pub use registry::DatasetRegistry;
pub use residual::{encode_residuals, residual_stats, ResidualStage};
pub use scenes::DirectorySceneProvider;
pub use store::{commit_all, RevisionStore, StagedArtifact, WriteHandle};
