use std::path::PathBuf;

use clap::{ArgGroup, Args};
use scarlet_core::{DatasetId, HarnessError, ResidualPlotter};
use scarlet_exp::{
    CommandDeblender, CommandPlotter, CommandSpec, DirectorySceneProvider, LogPlotter,
    MeasurementStage, Orchestrator, ResidualStage, RevisionStore, RunRequest,
};
use serde_json::json;
use tracing::warn;

use super::HarnessArgs;

#[derive(Args, Debug)]
#[command(group(ArgGroup::new("revision").required(true).args(["pr", "branch"])))]
pub struct RunArgs {
    /// Dataset number; `--set 3` runs `set3`.
    #[arg(long = "set", value_name = "N")]
    pub set: u32,
    /// Pull request under test, used verbatim as the revision label.
    #[arg(long, value_name = "LABEL")]
    pub pr: Option<String>,
    /// Branch under test, used verbatim as the revision label.
    #[arg(long, value_name = "LABEL")]
    pub branch: Option<String>,
    /// Replace results already stored for this revision.
    #[arg(long)]
    pub overwrite: bool,
    /// Compute and save residuals even for metrics-only datasets.
    #[arg(long)]
    pub force_residuals: bool,
    /// Directory holding `<dataset>/<blend>.json` scene files.
    #[arg(long, env = "SCARLET_TEST_DATA_PATH", value_name = "DIR")]
    pub data_path: Option<PathBuf>,
    /// Deblender program of the revision under test.
    #[arg(long, env = "SCARLET_TEST_DEBLENDER", value_name = "PROGRAM")]
    pub deblender: Option<PathBuf>,
    /// Residual renderer; residual summaries are logged when unset.
    #[arg(long, env = "SCARLET_TEST_PLOTTER", value_name = "PROGRAM")]
    pub plotter: Option<PathBuf>,
    /// Maximum fit iterations handed to the deblender.
    #[arg(long, env = "SCARLET_TEST_MAX_ITER")]
    pub max_iter: Option<u32>,
    /// Relative convergence threshold handed to the deblender.
    #[arg(long, env = "SCARLET_TEST_E_REL")]
    pub e_rel: Option<f64>,
    #[command(flatten)]
    pub harness: HarnessArgs,
}

impl RunArgs {
    fn revision(&self) -> &str {
        self.pr
            .as_deref()
            .or(self.branch.as_deref())
            .unwrap_or_default()
    }
}

pub fn run(args: &RunArgs) -> Result<(), HarnessError> {
    let dataset = DatasetId::from_index(args.set)?;
    let mut config = args.harness.load()?;
    if let Some(path) = &args.data_path {
        config.data_root = path.clone();
    }
    if let Some(program) = &args.deblender {
        config.deblender = Some(CommandSpec::new(program));
    }
    if let Some(program) = &args.plotter {
        config.plotter = Some(CommandSpec::new(program));
    }
    if let Some(max_iter) = args.max_iter {
        config.max_iter = max_iter;
    }
    if let Some(e_rel) = args.e_rel {
        config.e_rel = e_rel;
    }
    config.validate()?;

    let deblender = CommandDeblender::new(
        config.deblender_command()?.clone(),
        config.max_iter,
        config.e_rel,
    );
    let plotter: Box<dyn ResidualPlotter> = match &config.plotter {
        Some(command) => Box::new(CommandPlotter::new(command.clone())),
        None => Box::new(LogPlotter),
    };
    let orchestrator = Orchestrator::new(
        RevisionStore::new(&config.artifact_root),
        DirectorySceneProvider::new(&config.data_root),
        MeasurementStage::new(deblender, config.filters.clone()),
        ResidualStage::new(plotter),
    );

    let mut request = RunRequest::new(dataset.as_str(), args.revision(), args.overwrite);
    if args.force_residuals {
        request = request.forcing_residuals();
    }
    let outcome = orchestrator.execute(&request)?;
    for warning in &outcome.warnings {
        warn!(family = warning.family(), "{warning}");
    }

    let summary = json!({
        "dataset": outcome.dataset,
        "revision": outcome.revision,
        "run_id": outcome.record.provenance.run_id,
        "rows": outcome.record.rows.len(),
        "residual_blends": outcome.residuals.as_ref().map(|r| r.blends.len()),
        "written": outcome.written,
        "warnings": outcome.warnings.iter().map(ToString::to_string).collect::<Vec<_>>(),
    });
    println!("{summary:#}");
    Ok(())
}
