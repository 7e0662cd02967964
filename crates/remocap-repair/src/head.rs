use remocap_core::diagnose::Threshold;
use remocap_core::marker::{DistancePair, MarkerRole};
use remocap_core::neighbors::FrameContext;
use remocap_core::point::Point3;
use remocap_core::reference::ReferenceGeometry;
use remocap_core::snapshot::MarkerSnapshot;
use remocap_core::GeometryError;

use crate::cluster::{ClusterKind, RepairMethod, RepairStep, RigidCluster};

/// Tracked head markers, `pt24` excluded.
const TRACKED: [MarkerRole; 4] = [
    MarkerRole::Lfhd,
    MarkerRole::Lbhd,
    MarkerRole::Rfhd,
    MarkerRole::Rbhd,
];

/// The head cluster: four markers around the head and their centroid `pt24`.
///
/// When one edge of the head quad is still measured correctly, the two other
/// corners are placed at the calibration offset from the corners of that
/// edge, which keeps the calibration shape:
///
/// | trusted | rebuilt                              |
/// |---------|--------------------------------------|
/// | `lf_lb` | `rfhd` from `lfhd`, `rbhd` from `lbhd` |
/// | `rf_rb` | `lfhd` from `rfhd`, `lbhd` from `rbhd` |
/// | `lf_rf` | `lbhd` from `lfhd`, `rbhd` from `rfhd` |
///
/// The back edge and both diagonals have no rule.
#[derive(Debug, Clone)]
pub struct HeadCluster {
    reference: ReferenceGeometry,
}

impl HeadCluster {
    /// Create the head cluster from the calibration sample.
    ///
    /// # Errors
    ///
    /// Fails with [`GeometryError::MissingMarker`] if a head marker is missing from the calibration.
    pub fn new(calibration: &MarkerSnapshot) -> Result<Self, GeometryError> {
        Ok(Self {
            reference: ReferenceGeometry::new(calibration, &DistancePair::HEAD_ORDER)?,
        })
    }

    /// `(anchor, moved)` couples rebuilt for a trusted pair.
    fn rebuild_plan(basis: DistancePair) -> Option<[(MarkerRole, MarkerRole); 2]> {
        use MarkerRole::*;
        match basis {
            DistancePair::LfLb => Some([(Lfhd, Rfhd), (Lbhd, Rbhd)]),
            DistancePair::RfRb => Some([(Rfhd, Lfhd), (Rbhd, Lbhd)]),
            DistancePair::LfRf => Some([(Lfhd, Lbhd), (Rfhd, Rbhd)]),
            // TODO: back edge and diagonals need a rotation-aware rule, the calibration offsets alone do not fix them
            _ => None,
        }
    }
}

impl RigidCluster for HeadCluster {
    fn kind(&self) -> ClusterKind {
        ClusterKind::Head
    }

    fn reference(&self) -> &ReferenceGeometry {
        &self.reference
    }

    fn apply_basis(
        &self,
        basis: DistancePair,
        markers: &mut MarkerSnapshot,
        _threshold: Threshold,
        _context: Option<&FrameContext<'_>>,
    ) -> Result<Option<RepairStep>, GeometryError> {
        let Some(plan) = Self::rebuild_plan(basis) else {
            return Ok(None);
        };

        let mut moved = Vec::with_capacity(plan.len());
        for (anchor, target) in plan {
            let position = markers.require(anchor)? + self.reference.displacement(anchor, target)?;
            markers.set(target, position);
            moved.push(target);
        }

        Ok(Some(RepairStep {
            basis,
            moved,
            method: RepairMethod::RigidOffset,
        }))
    }

    fn finalize(&self, markers: &mut MarkerSnapshot) -> Result<(), GeometryError> {
        let corners = TRACKED
            .iter()
            .map(|role| markers.require(*role))
            .collect::<Result<Vec<_>, _>>()?;
        if let Some(centroid) = Point3::mean(&corners) {
            markers.set(MarkerRole::Pt24, centroid);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::reconstruct;
    use crate::RepairError;
    use approx::assert_relative_eq;
    use remocap_core::diagnose::{diagnose, Aggregation};

    fn head_tpose() -> MarkerSnapshot {
        MarkerSnapshot::from_samples([
            (MarkerRole::Lfhd, Point3::new(-47.5, 35.0, 1700.0)),
            (MarkerRole::Rfhd, Point3::new(47.5, 35.0, 1700.0)),
            (MarkerRole::Lbhd, Point3::new(-47.5, -35.0, 1700.0)),
            (MarkerRole::Rbhd, Point3::new(47.5, -35.0, 1700.0)),
            (MarkerRole::Pt24, Point3::new(0.0, 0.0, 1700.0)),
        ])
    }

    fn shifted(snapshot: &MarkerSnapshot, roles: &[MarkerRole], shift: Point3) -> MarkerSnapshot {
        let mut out = snapshot.clone();
        for role in roles {
            if let Some(p) = snapshot.get(*role) {
                out.set(*role, p + shift);
            }
        }
        out
    }

    fn centroid(markers: &MarkerSnapshot) -> Result<Point3, GeometryError> {
        let corners = [
            markers.require(MarkerRole::Lfhd)?,
            markers.require(MarkerRole::Lbhd)?,
            markers.require(MarkerRole::Rfhd)?,
            markers.require(MarkerRole::Rbhd)?,
        ];
        Ok(Point3::mean(&corners).unwrap_or_default())
    }

    #[test]
    fn test_right_side_basis_translates_left_side() -> Result<(), Box<dyn std::error::Error>> {
        let calibration = head_tpose();
        let head = HeadCluster::new(&calibration)?;
        let threshold = Threshold::default();

        let shift = Point3::new(50.0, 0.0, 0.0);
        let live = shifted(&calibration, &[MarkerRole::Rfhd, MarkerRole::Rbhd], shift);
        let diagnosis = diagnose(&live, head.reference(), threshold, Aggregation::Signed)?;
        assert!(diagnosis.broken);
        assert!(diagnosis.is_pair_good(DistancePair::RfRb));

        let mut markers = live.clone();
        let step = head.apply_basis(DistancePair::RfRb, &mut markers, threshold, None)?;
        assert_eq!(
            step.map(|s| s.moved),
            Some(vec![MarkerRole::Lfhd, MarkerRole::Lbhd])
        );

        for role in [MarkerRole::Lfhd, MarkerRole::Lbhd] {
            let expected = calibration.require(role)? + shift;
            let actual = markers.require(role)?;
            assert_relative_eq!(actual.x, expected.x);
            assert_relative_eq!(actual.y, expected.y);
            assert_relative_eq!(actual.z, expected.z);
        }

        // the translated quad is the calibration quad again
        let repaired = reconstruct(&head, 0, &markers, threshold, None)?;
        assert!(repaired.steps.is_empty());
        assert_eq!(
            repaired.markers.get(MarkerRole::Pt24),
            Some(centroid(&repaired.markers)?)
        );
        assert_relative_eq!(
            repaired.markers.require(MarkerRole::Pt24)?.x,
            calibration.require(MarkerRole::Pt24)?.x + 50.0
        );
        Ok(())
    }

    #[test]
    fn test_reconstruct_uses_first_trusted_pair() -> Result<(), Box<dyn std::error::Error>> {
        let calibration = head_tpose();
        let head = HeadCluster::new(&calibration)?;
        let threshold = Threshold::default();

        let live = shifted(
            &calibration,
            &[MarkerRole::Rfhd, MarkerRole::Rbhd],
            Point3::new(50.0, 0.0, 0.0),
        );

        let repaired = reconstruct(&head, 7, &live, threshold, None)?;
        assert_eq!(repaired.steps.len(), 1);
        assert_eq!(repaired.steps[0].basis, DistancePair::LfLb);
        assert_eq!(repaired.steps[0].method, RepairMethod::RigidOffset);

        // lfhd and lbhd were trusted, the right side goes back to the calibration place
        for role in TRACKED {
            assert_eq!(repaired.markers.get(role), calibration.get(role));
        }
        assert_eq!(
            repaired.markers.get(MarkerRole::Pt24),
            Some(centroid(&repaired.markers)?)
        );

        let diagnosis = diagnose(&repaired.markers, head.reference(), threshold, Aggregation::Absolute)?;
        assert!(diagnosis.all_good());
        assert!(!diagnosis.broken);
        Ok(())
    }

    #[test]
    fn test_reconstruct_front_edge_basis() -> Result<(), Box<dyn std::error::Error>> {
        let calibration = head_tpose();
        let head = HeadCluster::new(&calibration)?;
        let threshold = Threshold::default();

        // lbhd drifts away, lf_lb breaks but rf_rb stays and comes first
        let mut live = calibration.clone();
        live.set(MarkerRole::Lbhd, Point3::new(-47.5, -80.0, 1690.0));
        let repaired = reconstruct(&head, 3, &live, threshold, None)?;
        assert_eq!(repaired.steps[0].basis, DistancePair::RfRb);
        for role in TRACKED {
            let expected = calibration.require(role)?;
            let actual = repaired.markers.require(role)?;
            assert_relative_eq!(actual.x, expected.x);
            assert_relative_eq!(actual.y, expected.y);
            assert_relative_eq!(actual.z, expected.z);
        }
        Ok(())
    }

    #[test]
    fn test_reconstruct_unsupported_topology() -> Result<(), Box<dyn std::error::Error>> {
        let calibration = head_tpose();
        let head = HeadCluster::new(&calibration)?;
        let threshold = Threshold::default();

        // only the back edge keeps its length
        let live = MarkerSnapshot::from_samples([
            (MarkerRole::Lfhd, Point3::new(-200.0, 300.0, 1700.0)),
            (MarkerRole::Rfhd, Point3::new(400.0, -20.0, 1500.0)),
            (MarkerRole::Lbhd, Point3::new(-47.5, -35.0, 1700.0)),
            (MarkerRole::Rbhd, Point3::new(47.5, -35.0, 1700.0)),
            (MarkerRole::Pt24, Point3::new(0.0, 0.0, 1700.0)),
        ]);
        let diagnosis = diagnose(&live, head.reference(), threshold, Aggregation::Signed)?;
        assert_eq!(
            diagnosis.first_good(&DistancePair::HEAD_ORDER),
            Some(DistancePair::LbRb)
        );

        let result = reconstruct(&head, 11, &live, threshold, None);
        assert_eq!(
            result,
            Err(RepairError::UnsupportedRepairTopology {
                cluster: ClusterKind::Head,
                frame: 11,
                basis: Some(DistancePair::LbRb),
            })
        );
        Ok(())
    }

    #[test]
    fn test_reconstruct_without_trusted_pair() -> Result<(), Box<dyn std::error::Error>> {
        let calibration = head_tpose();
        let head = HeadCluster::new(&calibration)?;

        let live = MarkerSnapshot::from_samples([
            (MarkerRole::Lfhd, Point3::new(0.0, 0.0, 0.0)),
            (MarkerRole::Rfhd, Point3::new(0.0, 0.0, 0.0)),
            (MarkerRole::Lbhd, Point3::new(0.0, 0.0, 0.0)),
            (MarkerRole::Rbhd, Point3::new(0.0, 0.0, 0.0)),
        ]);

        let result = reconstruct(&head, 2, &live, Threshold::default(), None);
        assert_eq!(
            result,
            Err(RepairError::UnsupportedRepairTopology {
                cluster: ClusterKind::Head,
                frame: 2,
                basis: None,
            })
        );
        Ok(())
    }

    #[test]
    fn test_reconstruct_rotated_edge_does_not_converge() -> Result<(), Box<dyn std::error::Error>> {
        let calibration = head_tpose();
        let head = HeadCluster::new(&calibration)?;
        let threshold = Threshold::default();

        // the left edge keeps its length but lies along x, the calibration offsets cannot follow
        let live = MarkerSnapshot::from_samples([
            (MarkerRole::Lfhd, Point3::new(-47.5, 0.0, 1700.0)),
            (MarkerRole::Lbhd, Point3::new(22.5, 0.0, 1700.0)),
            (MarkerRole::Rfhd, Point3::new(300.0, 300.0, 1000.0)),
            (MarkerRole::Rbhd, Point3::new(-300.0, 300.0, 1000.0)),
        ]);

        let result = reconstruct(&head, 5, &live, threshold, None);
        assert_eq!(
            result,
            Err(RepairError::DidNotConverge {
                cluster: ClusterKind::Head,
                frame: 5,
                steps: DistancePair::HEAD_ORDER.len(),
            })
        );
        Ok(())
    }

    #[test]
    fn test_finalize_recomputes_centroid() -> Result<(), Box<dyn std::error::Error>> {
        let head = HeadCluster::new(&head_tpose())?;
        let mut markers = shifted(&head_tpose(), &TRACKED, Point3::new(1.25, -3.5, 0.75));
        head.finalize(&mut markers)?;
        assert_eq!(markers.get(MarkerRole::Pt24), Some(centroid(&markers)?));
        Ok(())
    }
}
