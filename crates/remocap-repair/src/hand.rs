use remocap_core::diagnose::Threshold;
use remocap_core::marker::{DistancePair, MarkerRole, Side};
use remocap_core::neighbors::{FrameContext, Neighbor};
use remocap_core::point::{euclidean_distance, Point3};
use remocap_core::reference::ReferenceGeometry;
use remocap_core::snapshot::MarkerSnapshot;
use remocap_core::GeometryError;

use crate::cluster::{ClusterKind, RepairMethod, RepairStep, RigidCluster};

/// A hand cluster: the finger marker and the two wrist markers of one side.
///
/// The only rule rebuilds wrist marker A when the finger to wrist B edge is
/// trusted. The wrist A offset from wrist B is first interpolated from the
/// closest usable frames, which follows the hand orientation; the
/// calibration offset is the fallback.
#[derive(Debug, Clone)]
pub struct HandCluster {
    side: Side,
    reference: ReferenceGeometry,
}

impl HandCluster {
    /// Create the cluster of one hand from the calibration sample.
    ///
    /// # Errors
    ///
    /// Fails with [`GeometryError::MissingMarker`] if a marker of the hand is missing from the calibration.
    pub fn new(side: Side, calibration: &MarkerSnapshot) -> Result<Self, GeometryError> {
        let kind = match side {
            Side::Left => ClusterKind::LeftHand,
            Side::Right => ClusterKind::RightHand,
        };
        Ok(Self {
            side,
            reference: ReferenceGeometry::new(calibration, kind.order())?,
        })
    }

    /// Body side of the hand.
    pub fn side(&self) -> Side {
        self.side
    }

    /// Check that a candidate wrist A is within tolerance of both edges it belongs to.
    fn accepts(&self, finger: &Point3, wrist_a: &Point3, wrist_b: &Point3, threshold: Threshold) -> bool {
        let within = |pair: DistancePair, live: f64| {
            self.reference
                .distance(pair)
                .is_some_and(|reference| (live - reference).abs() < threshold.value())
        };
        within(
            DistancePair::finger_wrist_a(self.side),
            euclidean_distance(finger, wrist_a),
        ) && within(
            DistancePair::wrist_wrist(self.side),
            euclidean_distance(wrist_a, wrist_b),
        )
    }
}

/// `wrist_a - wrist_b` in a neighbor frame, if both markers were sampled.
fn wrist_offset(neighbor: &Neighbor<'_>, wrist_a: MarkerRole, wrist_b: MarkerRole) -> Option<(usize, Point3)> {
    let a = neighbor.snapshot.get(wrist_a)?;
    let b = neighbor.snapshot.get(wrist_b)?;
    Some((neighbor.frame, a - b))
}

/// Wrist offset at the target frame, interpolated from the closest usable frames.
fn interpolated_offset(context: &FrameContext<'_>, wrist_a: MarkerRole, wrist_b: MarkerRole) -> Option<Point3> {
    let target = context.target.frame;
    let before = context
        .nearest_before()
        .and_then(|n| wrist_offset(n, wrist_a, wrist_b));
    let after = context
        .nearest_after()
        .and_then(|n| wrist_offset(n, wrist_a, wrist_b));

    match (before, after) {
        (Some((fb, ob)), Some((fa, oa))) => {
            let t = (target - fb) as f64 / (fa - fb) as f64;
            Some(ob.lerp(&oa, t))
        }
        (Some((_, offset)), None) | (None, Some((_, offset))) => Some(offset),
        (None, None) => None,
    }
}

impl RigidCluster for HandCluster {
    fn kind(&self) -> ClusterKind {
        match self.side {
            Side::Left => ClusterKind::LeftHand,
            Side::Right => ClusterKind::RightHand,
        }
    }

    fn reference(&self) -> &ReferenceGeometry {
        &self.reference
    }

    fn apply_basis(
        &self,
        basis: DistancePair,
        markers: &mut MarkerSnapshot,
        threshold: Threshold,
        context: Option<&FrameContext<'_>>,
    ) -> Result<Option<RepairStep>, GeometryError> {
        // finger to wrist A and wrist to wrist have no rule yet
        if basis != DistancePair::finger_wrist_b(self.side) {
            return Ok(None);
        }

        let finger_role = MarkerRole::finger(self.side);
        let wrist_a_role = MarkerRole::wrist_a(self.side);
        let wrist_b_role = MarkerRole::wrist_b(self.side);

        let finger = markers.require(finger_role)?;
        let wrist_b = markers.require(wrist_b_role)?;

        let interpolated = context
            .and_then(|context| interpolated_offset(context, wrist_a_role, wrist_b_role))
            .map(|offset| wrist_b + offset)
            .filter(|candidate| self.accepts(&finger, candidate, &wrist_b, threshold));

        let (wrist_a, method) = match interpolated {
            Some(candidate) => (candidate, RepairMethod::NeighborInterpolation),
            None => (
                wrist_b + self.reference.displacement(wrist_b_role, wrist_a_role)?,
                RepairMethod::RigidOffset,
            ),
        };
        markers.set(wrist_a_role, wrist_a);

        Ok(Some(RepairStep {
            basis,
            moved: vec![wrist_a_role],
            method,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::{reconstruct, Confidence};
    use crate::RepairError;
    use approx::assert_relative_eq;
    use remocap_core::diagnose::FrameVerdict;
    use remocap_core::neighbors::{find_context, DEFAULT_NEIGHBOR_CUTOFF};

    fn hands_tpose() -> MarkerSnapshot {
        MarkerSnapshot::from_samples([
            (MarkerRole::Rfin, Point3::new(800.0, 0.0, 1400.0)),
            (MarkerRole::Rwra, Point3::new(700.0, 25.0, 1400.0)),
            (MarkerRole::Rwrb, Point3::new(700.0, -25.0, 1400.0)),
            (MarkerRole::Lfin, Point3::new(-800.0, 0.0, 1400.0)),
            (MarkerRole::Lwra, Point3::new(-700.0, 25.0, 1400.0)),
            (MarkerRole::Lwrb, Point3::new(-700.0, -25.0, 1400.0)),
        ])
    }

    fn verdicts(frames: &[(bool, MarkerSnapshot)]) -> Vec<FrameVerdict> {
        frames
            .iter()
            .enumerate()
            .map(|(frame, (broken, snapshot))| FrameVerdict {
                frame,
                broken: *broken,
                score: 0.0,
                snapshot: snapshot.clone(),
            })
            .collect()
    }

    #[test]
    fn test_wrist_a_rigid_offset() -> Result<(), Box<dyn std::error::Error>> {
        let calibration = hands_tpose();
        for side in [Side::Left, Side::Right] {
            let hand = HandCluster::new(side, &calibration)?;
            let wrist_a = MarkerRole::wrist_a(side);

            let mut live = calibration.clone();
            live.set(wrist_a, Point3::new(0.0, 0.0, 0.0));

            let repaired = reconstruct(&hand, 4, &live, Threshold::default(), None)?;
            assert_eq!(repaired.steps.len(), 1);
            assert_eq!(repaired.steps[0].basis, DistancePair::finger_wrist_b(side));
            assert_eq!(repaired.steps[0].moved, vec![wrist_a]);
            assert_eq!(repaired.steps[0].method, RepairMethod::RigidOffset);
            assert_eq!(repaired.confidence, Confidence::Low);
            assert_eq!(repaired.markers.get(wrist_a), calibration.get(wrist_a));
        }
        Ok(())
    }

    #[test]
    fn test_wrist_a_from_neighbors() -> Result<(), Box<dyn std::error::Error>> {
        let calibration = hands_tpose();
        let hand = HandCluster::new(Side::Right, &calibration)?;

        // the hand slowly turns around the finger to wrist B axis, wrist A follows
        let rotated = |angle: f64| {
            let mut snapshot = calibration.clone();
            let wrb = Point3::new(700.0, -25.0, 1400.0);
            snapshot.set(
                MarkerRole::Rwra,
                wrb + Point3::new(0.0, 50.0 * angle.cos(), 50.0 * angle.sin()),
            );
            snapshot
        };

        let mut broken_frame = rotated(0.4);
        broken_frame.set(MarkerRole::Rwra, Point3::new(0.0, 0.0, 0.0));

        let history = verdicts(&[
            (false, rotated(0.0)),
            (false, rotated(0.2)),
            (true, broken_frame),
            (false, rotated(0.6)),
            (false, rotated(0.8)),
        ]);

        let context = find_context(2, &history, DEFAULT_NEIGHBOR_CUTOFF)?;
        let repaired = reconstruct(
            &hand,
            2,
            context.target.snapshot,
            Threshold::default(),
            Some(&context),
        )?;

        assert_eq!(repaired.steps[0].method, RepairMethod::NeighborInterpolation);
        assert_eq!(repaired.confidence, Confidence::High);

        // halfway between the offsets at 0.2 and 0.6 rad
        let expected = {
            let (a, b) = (0.2f64, 0.6f64);
            Point3::new(
                700.0,
                -25.0 + 50.0 * (a.cos() + b.cos()) / 2.0,
                1400.0 + 50.0 * (a.sin() + b.sin()) / 2.0,
            )
        };
        let actual = repaired.markers.require(MarkerRole::Rwra)?;
        assert_relative_eq!(actual.x, expected.x, epsilon = 1e-9);
        assert_relative_eq!(actual.y, expected.y, epsilon = 1e-9);
        assert_relative_eq!(actual.z, expected.z, epsilon = 1e-9);
        Ok(())
    }

    #[test]
    fn test_neighbor_candidate_rejected_falls_back() -> Result<(), Box<dyn std::error::Error>> {
        let calibration = hands_tpose();
        let hand = HandCluster::new(Side::Right, &calibration)?;

        // the neighbor frame itself carries a wrong wrist offset
        let mut odd = calibration.clone();
        odd.set(MarkerRole::Rwra, Point3::new(700.0, 200.0, 1400.0));
        let mut broken_frame = calibration.clone();
        broken_frame.set(MarkerRole::Rwra, Point3::new(0.0, 0.0, 0.0));

        let history = verdicts(&[(false, odd), (true, broken_frame)]);
        let context = find_context(1, &history, DEFAULT_NEIGHBOR_CUTOFF)?;
        let repaired = reconstruct(
            &hand,
            1,
            context.target.snapshot,
            Threshold::default(),
            Some(&context),
        )?;

        assert_eq!(repaired.steps[0].method, RepairMethod::RigidOffset);
        assert_eq!(repaired.confidence, Confidence::Low);
        assert_eq!(
            repaired.markers.get(MarkerRole::Rwra),
            calibration.get(MarkerRole::Rwra)
        );
        Ok(())
    }

    #[test]
    fn test_hand_unsupported_topology() -> Result<(), Box<dyn std::error::Error>> {
        let calibration = hands_tpose();
        let hand = HandCluster::new(Side::Left, &calibration)?;

        // the finger is lost, only the wrist edge keeps its length
        let mut live = calibration.clone();
        live.set(MarkerRole::Lfin, Point3::new(0.0, 0.0, 0.0));

        let result = reconstruct(&hand, 9, &live, Threshold::default(), None);
        assert_eq!(
            result,
            Err(RepairError::UnsupportedRepairTopology {
                cluster: ClusterKind::LeftHand,
                frame: 9,
                basis: Some(DistancePair::LwraLwrb),
            })
        );
        Ok(())
    }

    #[test]
    fn test_hand_ok_frame_is_untouched() -> Result<(), Box<dyn std::error::Error>> {
        let calibration = hands_tpose();
        let hand = HandCluster::new(Side::Right, &calibration)?;
        let repaired = reconstruct(&hand, 0, &calibration, Threshold::default(), None)?;
        assert!(repaired.steps.is_empty());
        assert_eq!(repaired.markers, calibration);
        Ok(())
    }
}
