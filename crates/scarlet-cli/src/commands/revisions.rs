use clap::Args;
use scarlet_core::{DatasetId, HarnessError};
use scarlet_exp::RevisionStore;

use super::HarnessArgs;

#[derive(Args, Debug)]
pub struct RevisionsArgs {
    /// Dataset number.
    #[arg(long = "set", value_name = "N")]
    pub set: u32,
    #[command(flatten)]
    pub harness: HarnessArgs,
}

pub fn run(args: &RevisionsArgs) -> Result<(), HarnessError> {
    let dataset = DatasetId::from_index(args.set)?;
    let config = args.harness.load()?;
    for revision in RevisionStore::new(&config.artifact_root).revisions(dataset)? {
        println!("{revision}");
    }
    Ok(())
}
