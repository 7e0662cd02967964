use std::fmt;

use serde::{Deserialize, Serialize};

use remocap_core::diagnose::{diagnose, Aggregation, Threshold};
use remocap_core::marker::{DistancePair, MarkerRole, Side};
use remocap_core::neighbors::FrameContext;
use remocap_core::reference::ReferenceGeometry;
use remocap_core::snapshot::MarkerSnapshot;
use remocap_core::GeometryError;

use crate::RepairError;

const HEAD_ROLES: [MarkerRole; 5] = [
    MarkerRole::Lfhd,
    MarkerRole::Lbhd,
    MarkerRole::Rfhd,
    MarkerRole::Rbhd,
    MarkerRole::Pt24,
];

const LEFT_HAND_ROLES: [MarkerRole; 3] = [
    MarkerRole::finger(Side::Left),
    MarkerRole::wrist_a(Side::Left),
    MarkerRole::wrist_b(Side::Left),
];

const RIGHT_HAND_ROLES: [MarkerRole; 3] = [
    MarkerRole::finger(Side::Right),
    MarkerRole::wrist_a(Side::Right),
    MarkerRole::wrist_b(Side::Right),
];

const LEFT_HAND_ORDER: [DistancePair; 3] = [
    DistancePair::finger_wrist_a(Side::Left),
    DistancePair::finger_wrist_b(Side::Left),
    DistancePair::wrist_wrist(Side::Left),
];

const RIGHT_HAND_ORDER: [DistancePair; 3] = [
    DistancePair::finger_wrist_a(Side::Right),
    DistancePair::finger_wrist_b(Side::Right),
    DistancePair::wrist_wrist(Side::Right),
];

/// The rigid clusters the pipeline knows how to check and repair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClusterKind {
    /// The four head markers and their centroid.
    Head,
    /// Finger and wrist markers of the left hand.
    LeftHand,
    /// Finger and wrist markers of the right hand.
    RightHand,
}

impl ClusterKind {
    /// All cluster kinds.
    pub const ALL: [ClusterKind; 3] = [ClusterKind::Head, ClusterKind::LeftHand, ClusterKind::RightHand];

    /// Markers read from and written back to the capture.
    pub fn roles(self) -> &'static [MarkerRole] {
        match self {
            ClusterKind::Head => &HEAD_ROLES,
            ClusterKind::LeftHand => &LEFT_HAND_ROLES,
            ClusterKind::RightHand => &RIGHT_HAND_ROLES,
        }
    }

    /// Tracked pairs in priority order.
    pub fn order(self) -> &'static [DistancePair] {
        match self {
            ClusterKind::Head => &DistancePair::HEAD_ORDER,
            ClusterKind::LeftHand => &LEFT_HAND_ORDER,
            ClusterKind::RightHand => &RIGHT_HAND_ORDER,
        }
    }

    /// Body side of a hand cluster.
    pub fn side(self) -> Option<Side> {
        match self {
            ClusterKind::Head => None,
            ClusterKind::LeftHand => Some(Side::Left),
            ClusterKind::RightHand => Some(Side::Right),
        }
    }

    /// Cluster name.
    pub fn name(self) -> &'static str {
        match self {
            ClusterKind::Head => "head",
            ClusterKind::LeftHand => "left_hand",
            ClusterKind::RightHand => "right_hand",
        }
    }
}

impl fmt::Display for ClusterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for ClusterKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ClusterKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| format!("unknown cluster {s}, expected head, left_hand or right_hand"))
    }
}

/// How the moved markers of a step were placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepairMethod {
    /// Anchored on the trusted pair with the calibration offsets.
    RigidOffset,
    /// Anchored on the trusted pair with offsets interpolated from neighbor frames.
    NeighborInterpolation,
}

/// A single reconstruction step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepairStep {
    /// Trusted pair used as anchor.
    pub basis: DistancePair,
    /// Markers that were placed again.
    pub moved: Vec<MarkerRole>,
    /// How they were placed.
    pub method: RepairMethod,
}

/// Trust in a reconstructed frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    /// Built with a full neighbor context.
    High,
    /// Built with a thin, distant or missing neighbor context.
    Low,
}

impl Confidence {
    /// Confidence granted by a neighbor context.
    pub fn from_context(context: Option<&FrameContext<'_>>) -> Self {
        match context {
            Some(context) if !context.quality.is_degraded() => Confidence::High,
            _ => Confidence::Low,
        }
    }
}

/// Corrected markers of a frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconstruction {
    /// Corrected positions of the cluster markers.
    pub markers: MarkerSnapshot,
    /// Steps taken, in order. Empty if the frame was already within tolerance.
    pub steps: Vec<RepairStep>,
    /// Trust in the result.
    pub confidence: Confidence,
}

/// A rigid set of markers that can be rebuilt from one of its trusted edges.
pub trait RigidCluster: Send + Sync {
    /// Which cluster this is.
    fn kind(&self) -> ClusterKind;

    /// Reference geometry measured on the calibration sample.
    fn reference(&self) -> &ReferenceGeometry;

    /// Rebuild the untrusted markers from the trusted `basis` pair.
    ///
    /// Returns `Ok(None)` if the cluster has no rule for this basis.
    fn apply_basis(
        &self,
        basis: DistancePair,
        markers: &mut MarkerSnapshot,
        threshold: Threshold,
        context: Option<&FrameContext<'_>>,
    ) -> Result<Option<RepairStep>, GeometryError>;

    /// Update derived markers once every pair is within tolerance.
    fn finalize(&self, _markers: &mut MarkerSnapshot) -> Result<(), GeometryError> {
        Ok(())
    }
}

/// Repair a broken frame of a rigid cluster.
///
/// The frame is evaluated, and while some tracked pair is out of tolerance
/// the first pair of the cluster order that is still within tolerance is
/// trusted and the other markers are rebuilt from it. At most one step per
/// tracked pair is taken.
///
/// # Arguments
///
/// * `cluster` - The cluster to repair.
/// * `frame` - Frame index, used for reporting.
/// * `snapshot` - Marker positions of the broken frame.
/// * `threshold` - Per-pair tolerance.
/// * `context` - Usable neighbor frames, if any.
///
/// # Errors
///
/// * [`RepairError::UnsupportedRepairTopology`] if no pair can be trusted or
///   the trusted pair has no rule.
/// * [`RepairError::DidNotConverge`] if pairs are still out of tolerance after the last step.
/// * [`RepairError::Geometry`] if a tracked marker is missing.
pub fn reconstruct<C: RigidCluster + ?Sized>(
    cluster: &C,
    frame: usize,
    snapshot: &MarkerSnapshot,
    threshold: Threshold,
    context: Option<&FrameContext<'_>>,
) -> Result<Reconstruction, RepairError> {
    let reference = cluster.reference();
    let order = reference.order();
    let kind = cluster.kind();
    let max_steps = order.len();

    let mut markers = snapshot.clone();
    let mut steps = Vec::new();

    loop {
        let evaluation = diagnose(&markers, reference, threshold, Aggregation::default())?;

        if evaluation.all_good() {
            cluster.finalize(&mut markers)?;
            return Ok(Reconstruction {
                markers,
                steps,
                confidence: Confidence::from_context(context),
            });
        }

        if steps.len() == max_steps {
            return Err(RepairError::DidNotConverge {
                cluster: kind,
                frame,
                steps: steps.len(),
            });
        }

        let basis = evaluation
            .first_good(order)
            .ok_or(RepairError::UnsupportedRepairTopology {
                cluster: kind,
                frame,
                basis: None,
            })?;

        let step = cluster
            .apply_basis(basis, &mut markers, threshold, context)?
            .ok_or(RepairError::UnsupportedRepairTopology {
                cluster: kind,
                frame,
                basis: Some(basis),
            })?;

        log::debug!(
            "{} frame {}: {} within tolerance, rebuilt {:?} ({:?}), still off: {:?}",
            kind,
            frame,
            basis,
            step.moved,
            step.method,
            evaluation.bad_pairs(order),
        );

        steps.push(step);
    }
}
