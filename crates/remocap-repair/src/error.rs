use remocap_core::marker::DistancePair;
use remocap_core::GeometryError;

use crate::cluster::ClusterKind;

/// Error types for the repair pipeline.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RepairError {
    /// Invalid marker geometry input.
    #[error(transparent)]
    Geometry(#[from] GeometryError),

    /// The broken frame has no trusted pair, or no rule exists for the trusted pair.
    #[error("Unsupported repair topology for {cluster} at frame {frame}: {}", describe_basis(.basis))]
    UnsupportedRepairTopology {
        /// Cluster being repaired.
        cluster: ClusterKind,
        /// Frame being repaired.
        frame: usize,
        /// Trusted pair selected as basis, if any.
        basis: Option<DistancePair>,
    },

    /// Every repair step was spent and some pairs are still out of tolerance.
    #[error("Repair of {cluster} at frame {frame} did not converge after {steps} steps")]
    DidNotConverge {
        /// Cluster being repaired.
        cluster: ClusterKind,
        /// Frame being repaired.
        frame: usize,
        /// Number of repair steps taken.
        steps: usize,
    },

    /// The configuration cannot be used.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The scan report was not produced by this pipeline for this capture.
    #[error("Scan report does not match the pipeline: {0}")]
    ScanMismatch(String),
}

fn describe_basis(basis: &Option<DistancePair>) -> String {
    match basis {
        Some(pair) => format!("no rule for trusted pair {pair}"),
        None => "no trusted pair left".to_string(),
    }
}
