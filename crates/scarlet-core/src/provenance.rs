//! Provenance stamped on every stored artifact.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Layout version of stored measurement and residual artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SchemaVersion {
    /// Bumped when older readers can no longer parse the artifact.
    pub major: u32,
    /// Bumped for added optional fields.
    pub minor: u32,
    /// Bumped for fixes that do not change the layout.
    pub patch: u32,
}

impl SchemaVersion {
    /// Version written by this build.
    pub const CURRENT: SchemaVersion = SchemaVersion::new(1, 0, 0);

    /// Builds a version from its parts.
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Whether an artifact written under `other` can be read by this version.
    pub fn reads(&self, other: &SchemaVersion) -> bool {
        self.major == other.major
    }
}

impl Default for SchemaVersion {
    fn default() -> Self {
        Self::CURRENT
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Where an artifact came from: dataset, revision, the deblender run that
/// produced it and the scene it was computed on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RunProvenance {
    /// Artifacts written before versioning read as the current schema.
    #[serde(default)]
    pub schema_version: SchemaVersion,
    /// Dataset name, e.g. `set3`.
    pub dataset: String,
    /// Revision label the deblender was built from.
    pub revision: String,
    /// Identifier the deblender reported for this invocation.
    pub run_id: String,
    /// SHA-256 of the canonical scene JSON.
    pub scene_hash: String,
    /// RFC 3339 UTC timestamp.
    pub created_at: String,
    /// Crate name to version of the tools involved.
    #[serde(default)]
    pub tool_versions: BTreeMap<String, String>,
}
