use std::fs;
use std::path::{Path, PathBuf};

use scarlet_core::{ErrorInfo, HarnessError};
use serde::{Deserialize, Serialize};

use crate::codec::from_yaml_slice;
use crate::metrics::Tolerance;

/// External program invocation: the program and its fixed arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSpec {
    pub program: PathBuf,
    #[serde(default)]
    pub args: Vec<String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }
}

/// Harness settings, usually read from a YAML file and overridden from the CLI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HarnessConfig {
    #[serde(default = "HarnessConfig::default_data_root")]
    pub data_root: PathBuf,
    #[serde(default = "HarnessConfig::default_artifact_root")]
    pub artifact_root: PathBuf,
    #[serde(default = "HarnessConfig::default_filters")]
    pub filters: Vec<String>,
    #[serde(default = "HarnessConfig::default_max_iter")]
    pub max_iter: u32,
    #[serde(default = "HarnessConfig::default_e_rel")]
    pub e_rel: f64,
    #[serde(default)]
    pub deblender: Option<CommandSpec>,
    #[serde(default)]
    pub plotter: Option<CommandSpec>,
    #[serde(default)]
    pub tolerance: Tolerance,
}

impl HarnessConfig {
    fn default_data_root() -> PathBuf {
        PathBuf::from("data/blends")
    }

    fn default_artifact_root() -> PathBuf {
        PathBuf::from("data/results")
    }

    fn default_filters() -> Vec<String> {
        ["g", "r", "i", "z", "y"].map(String::from).to_vec()
    }

    const fn default_max_iter() -> u32 {
        200
    }

    const fn default_e_rel() -> f64 {
        1e-3
    }

    /// Reads and validates a YAML configuration file.
    pub fn load(path: &Path) -> Result<Self, HarnessError> {
        let bytes = fs::read(path).map_err(|err| {
            HarnessError::Config(
                ErrorInfo::new("config-read", "failed to read configuration")
                    .with_context("path", path.display().to_string())
                    .with_hint(err.to_string()),
            )
        })?;
        let config: HarnessConfig = from_yaml_slice(&bytes).map_err(|err| {
            HarnessError::Config(
                err.info()
                    .clone()
                    .with_context("path", path.display().to_string()),
            )
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), HarnessError> {
        if self.filters.is_empty() || self.filters.iter().any(|f| f.trim().is_empty()) {
            return Err(HarnessError::Config(ErrorInfo::new(
                "config-filters",
                "at least one non-empty filter band is required",
            )));
        }
        if self.max_iter == 0 {
            return Err(HarnessError::Config(ErrorInfo::new(
                "config-max-iter",
                "max_iter must be positive",
            )));
        }
        if !(self.e_rel > 0.0 && self.e_rel.is_finite()) {
            return Err(HarnessError::Config(
                ErrorInfo::new("config-e-rel", "e_rel must be a positive finite number")
                    .with_context("e_rel", self.e_rel.to_string()),
            ));
        }
        self.tolerance.validate()
    }

    /// Deblender command, required for runs.
    pub fn deblender_command(&self) -> Result<&CommandSpec, HarnessError> {
        self.deblender.as_ref().ok_or_else(|| {
            HarnessError::Config(
                ErrorInfo::new("config-deblender", "no deblender command configured")
                    .with_hint("set `deblender.program` in the config or pass --deblender"),
            )
        })
    }
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            data_root: Self::default_data_root(),
            artifact_root: Self::default_artifact_root(),
            filters: Self::default_filters(),
            max_iter: Self::default_max_iter(),
            e_rel: Self::default_e_rel(),
            deblender: None,
            plotter: None,
            tolerance: Tolerance::default(),
        }
    }
}
