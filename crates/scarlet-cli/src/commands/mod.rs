pub mod compare;
pub mod revisions;
pub mod run;

use std::path::PathBuf;

use clap::Args;
use scarlet_core::HarnessError;
use scarlet_exp::HarnessConfig;

/// Options shared by every subcommand that touches the artifact store.
#[derive(Args, Debug, Clone, Default)]
pub struct HarnessArgs {
    /// YAML harness configuration; built-in defaults apply when absent.
    #[arg(long, env = "SCARLET_TEST_CONFIG", value_name = "YAML")]
    pub config: Option<PathBuf>,
    /// Root directory of stored measurement and residual artifacts.
    #[arg(long, env = "SCARLET_TEST_ARTIFACT_ROOT", value_name = "DIR")]
    pub artifact_root: Option<PathBuf>,
}

impl HarnessArgs {
    /// Loads the configuration file and applies command line overrides.
    pub fn load(&self) -> Result<HarnessConfig, HarnessError> {
        let mut config = match &self.config {
            Some(path) => HarnessConfig::load(path)?,
            None => HarnessConfig::default(),
        };
        if let Some(root) = &self.artifact_root {
            config.artifact_root = root.clone();
        }
        Ok(config)
    }
}
