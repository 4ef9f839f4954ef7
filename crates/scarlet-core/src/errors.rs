//! Structured error types shared across the harness crates.

use std::collections::BTreeMap;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Payload carried by every [`HarnessError`] variant.
///
/// `code` is a short kebab-case identifier (`store-exists`, `scene-shape`)
/// that tests and scripts match on; `message` is for people.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Kebab-case identifier of the failure site.
    pub code: String,
    /// One-line description.
    pub message: String,
    /// Dataset, revision, path and similar details, sorted by key.
    #[serde(default)]
    pub context: BTreeMap<String, String>,
    /// What the operator can do about it, or the tail of a child's stderr.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ErrorInfo {
    /// Payload with no context and no hint.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            context: BTreeMap::new(),
            hint: None,
        }
    }

    /// Records one detail; a repeated key keeps the last value.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Replaces the hint.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

/// Canonical error type for the regression harness.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "family", content = "detail")]
pub enum HarnessError {
    /// Dataset identifier is not part of the registry.
    #[error("unknown dataset: {0}")]
    UnknownDataset(ErrorInfo),
    /// Revision label is empty or cannot be used as a storage key.
    #[error("invalid revision: {0}")]
    InvalidRevision(ErrorInfo),
    /// Artifact already stored for the revision and overwrite was not requested.
    #[error("existing revision: {0}")]
    ExistingRevision(ErrorInfo),
    /// The deblending collaborator failed or produced unusable output.
    #[error("deblend failure: {0}")]
    Deblend(ErrorInfo),
    /// The plotting collaborator failed. Never fatal to a run.
    #[error("plotting error: {0}")]
    Plotting(ErrorInfo),
    /// Scene data could not be loaded.
    #[error("scene error: {0}")]
    Scene(ErrorInfo),
    /// Artifact storage failures.
    #[error("storage error: {0}")]
    Storage(ErrorInfo),
    /// Invalid or unreadable configuration.
    #[error("config error: {0}")]
    Config(ErrorInfo),
    /// Serialization and schema errors.
    #[error("serde error: {0}")]
    Serde(ErrorInfo),
}

impl Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code: {})", self.message, self.code)?;
        let mut details = self.context.iter();
        if let Some((key, value)) = details.next() {
            write!(f, " | context: [{key}={value}")?;
            for (key, value) in details {
                write!(f, ", {key}={value}")?;
            }
            f.write_str("]")?;
        }
        match &self.hint {
            Some(hint) => write!(f, " | hint: {hint}"),
            None => Ok(()),
        }
    }
}

impl HarnessError {
    /// Returns a reference to the payload describing the error.
    pub fn info(&self) -> &ErrorInfo {
        match self {
            HarnessError::UnknownDataset(info)
            | HarnessError::InvalidRevision(info)
            | HarnessError::ExistingRevision(info)
            | HarnessError::Deblend(info)
            | HarnessError::Plotting(info)
            | HarnessError::Scene(info)
            | HarnessError::Storage(info)
            | HarnessError::Config(info)
            | HarnessError::Serde(info) => info,
        }
    }

    /// Whether the error aborts an orchestrated run.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, HarnessError::Plotting(_))
    }

    /// Short family name, stable across releases.
    pub fn family(&self) -> &'static str {
        match self {
            HarnessError::UnknownDataset(_) => "unknown-dataset",
            HarnessError::InvalidRevision(_) => "invalid-revision",
            HarnessError::ExistingRevision(_) => "existing-revision",
            HarnessError::Deblend(_) => "deblend",
            HarnessError::Plotting(_) => "plotting",
            HarnessError::Scene(_) => "scene",
            HarnessError::Storage(_) => "storage",
            HarnessError::Config(_) => "config",
            HarnessError::Serde(_) => "serde",
        }
    }
}
