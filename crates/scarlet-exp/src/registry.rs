use scarlet_core::{BehaviorProfile, DatasetId, HarnessError};

const METRICS_ONLY: BehaviorProfile = BehaviorProfile {
    runs_residual_stage: false,
    save_records: true,
    save_residuals: false,
    plot_residuals: false,
};

const RESIDUAL_INSPECTION: BehaviorProfile = BehaviorProfile {
    runs_residual_stage: true,
    save_records: false,
    save_residuals: true,
    plot_residuals: true,
};

const PROFILES: [(DatasetId, BehaviorProfile); 3] = [
    (DatasetId::Set1, METRICS_ONLY),
    (DatasetId::Set2, METRICS_ONLY),
    (DatasetId::Set3, RESIDUAL_INSPECTION),
];

/// Static lookup from dataset identifier to its behavior profile.
#[derive(Debug, Clone, Copy, Default)]
pub struct DatasetRegistry;

impl DatasetRegistry {
    /// Profile of a registered dataset.
    pub fn profile(dataset: DatasetId) -> BehaviorProfile {
        // Table rows follow `DatasetId` declaration order.
        PROFILES[dataset as usize].1
    }

    /// Parses a dataset name and returns its identifier with the profile.
    ///
    /// Fails with [`HarnessError::UnknownDataset`] for unregistered names.
    pub fn resolve(dataset: &str) -> Result<(DatasetId, BehaviorProfile), HarnessError> {
        let id: DatasetId = dataset.parse()?;
        Ok((id, Self::profile(id)))
    }

    /// Every registered dataset with its profile.
    pub fn entries() -> impl Iterator<Item = (DatasetId, BehaviorProfile)> {
        PROFILES.into_iter()
    }
}
