use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::{ErrorInfo, HarnessError};

/// Registered regression datasets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetId {
    /// Metrics-only regression set.
    Set1,
    /// Metrics-only regression set.
    Set2,
    /// Visual inspection set; residuals are saved and plotted.
    Set3,
}

impl DatasetId {
    /// Every registered dataset in declaration order.
    pub const ALL: [DatasetId; 3] = [DatasetId::Set1, DatasetId::Set2, DatasetId::Set3];

    /// Canonical string form used in storage paths.
    pub fn as_str(&self) -> &'static str {
        match self {
            DatasetId::Set1 => "set1",
            DatasetId::Set2 => "set2",
            DatasetId::Set3 => "set3",
        }
    }

    /// Maps the numeric CLI form (`--set 2`) to a dataset.
    pub fn from_index(index: u32) -> Result<Self, HarnessError> {
        format!("set{index}").parse()
    }
}

impl fmt::Display for DatasetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DatasetId {
    type Err = HarnessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DatasetId::ALL
            .into_iter()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| {
                HarnessError::UnknownDataset(
                    ErrorInfo::new("dataset-unknown", "dataset is not registered")
                        .with_context("dataset", s)
                        .with_hint("expected one of set1, set2, set3"),
                )
            })
    }
}

/// Opaque label naming the revision under test (branch or pull request).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RevisionLabel(String);

impl RevisionLabel {
    /// Validates a label. Labels become directory names, so separators and
    /// relative components are rejected along with empty strings.
    pub fn new(label: impl Into<String>) -> Result<Self, HarnessError> {
        let label = label.into();
        let reason = if label.trim().is_empty() {
            Some("revision label is empty")
        } else if label == "." || label == ".." {
            Some("revision label is a relative path component")
        } else if label.contains(['/', '\\', '\0']) {
            Some("revision label contains a path separator")
        } else {
            None
        };
        match reason {
            Some(message) => Err(HarnessError::InvalidRevision(
                ErrorInfo::new("revision-invalid", message).with_context("revision", label),
            )),
            None => Ok(Self(label)),
        }
    }

    /// Borrowed label text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RevisionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for RevisionLabel {
    type Error = HarnessError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        RevisionLabel::new(value)
    }
}

impl From<RevisionLabel> for String {
    fn from(label: RevisionLabel) -> Self {
        label.0
    }
}

/// Kinds of artifacts persisted per dataset and revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    /// Per-source quality metrics.
    Measurement,
    /// Observed minus model residual images.
    Residual,
}

impl ArtifactKind {
    /// File name of the artifact inside the revision directory.
    pub fn file_name(&self) -> &'static str {
        match self {
            ArtifactKind::Measurement => "measurements.csv",
            ArtifactKind::Residual => "residuals.json",
        }
    }

    /// Lowercase name used in logs and error context.
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::Measurement => "measurement",
            ArtifactKind::Residual => "residual",
        }
    }
}

/// Which steps run for a dataset and which artifacts they produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BehaviorProfile {
    /// Whether the residual stage runs after measurement.
    pub runs_residual_stage: bool,
    /// Whether measurement records are persisted.
    pub save_records: bool,
    /// Whether residual artifacts are persisted.
    pub save_residuals: bool,
    /// Whether residuals are forwarded to the plotting collaborator.
    pub plot_residuals: bool,
}

impl BehaviorProfile {
    /// Same profile with residual production explicitly requested.
    pub const fn forcing_residuals(self) -> Self {
        Self {
            runs_residual_stage: true,
            save_residuals: true,
            ..self
        }
    }
}
