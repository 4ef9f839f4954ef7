use clap::Args;
use scarlet_core::{DatasetId, ErrorInfo, HarnessError, RevisionLabel};
use scarlet_exp::{compare_revisions, RevisionStore};
use tracing::warn;

use super::HarnessArgs;

#[derive(Args, Debug)]
pub struct CompareArgs {
    /// Dataset number.
    #[arg(long = "set", value_name = "N")]
    pub set: u32,
    /// Metric column to compare, e.g. `runtime` or `g diff`.
    #[arg(long)]
    pub metric: String,
    /// Revisions in comparison order; all recorded revisions when omitted.
    #[arg(long = "revision", value_name = "LABEL")]
    pub revisions: Vec<String>,
    #[command(flatten)]
    pub harness: HarnessArgs,
}

pub fn run(args: &CompareArgs) -> Result<(), HarnessError> {
    let dataset = DatasetId::from_index(args.set)?;
    let config = args.harness.load()?;
    let revisions = args
        .revisions
        .iter()
        .map(|label| RevisionLabel::new(label.clone()))
        .collect::<Result<Vec<_>, _>>()?;
    let comparison = compare_revisions(
        &RevisionStore::new(&config.artifact_root),
        dataset,
        &args.metric,
        &revisions,
        &config.tolerance,
    )?;
    if let Some(regression) = comparison.regression.as_ref().filter(|r| r.regressed) {
        warn!(
            metric = comparison.metric.name,
            baseline = regression.baseline.as_str(),
            candidate = regression.candidate.as_str(),
            before = regression.baseline_median,
            after = regression.candidate_median,
            "metric regressed"
        );
    }
    let json = serde_json::to_string_pretty(&comparison).map_err(|err| {
        HarnessError::Serde(ErrorInfo::new("compare-encode", err.to_string()))
    })?;
    println!("{json}");
    Ok(())
}
