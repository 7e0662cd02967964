use serde::{Deserialize, Serialize};

use remocap_core::diagnose::{Aggregation, Threshold};
use remocap_core::neighbors::DEFAULT_NEIGHBOR_CUTOFF;

use crate::cluster::ClusterKind;
use crate::RepairError;

/// Settings of a repair run.
///
/// Every field is optional when deserialized, missing ones take the default value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepairConfig {
    /// Per-pair tolerance and broken-frame score limit, in capture units.
    pub threshold: Threshold,
    /// How per-pair differences are folded into the frame score.
    pub aggregation: Aggregation,
    /// Distance in frames beyond which the closest neighbor makes a repair low confidence.
    pub neighbor_cutoff: usize,
    /// Clusters to check and repair, in processing order.
    pub clusters: Vec<ClusterKind>,
    /// Evaluate frames on the rayon thread pool.
    pub parallel: bool,
}

impl Default for RepairConfig {
    fn default() -> Self {
        Self {
            threshold: Threshold::default(),
            aggregation: Aggregation::default(),
            neighbor_cutoff: DEFAULT_NEIGHBOR_CUTOFF,
            clusters: ClusterKind::ALL.to_vec(),
            parallel: true,
        }
    }
}

impl RepairConfig {
    /// Check that the configuration can drive a run.
    ///
    /// The threshold is checked when it is built, so only the cluster list is left.
    ///
    /// # Errors
    ///
    /// Fails with [`RepairError::InvalidConfig`] if the cluster list is empty or holds a cluster twice.
    pub fn validate(&self) -> Result<(), RepairError> {
        if self.clusters.is_empty() {
            return Err(RepairError::InvalidConfig(
                "at least one cluster is required".to_string(),
            ));
        }

        for (i, kind) in self.clusters.iter().enumerate() {
            if self.clusters[..i].contains(kind) {
                return Err(RepairError::InvalidConfig(format!(
                    "cluster {kind} is listed twice"
                )));
            }
        }

        Ok(())
    }
}
