use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::GeometryError;
use crate::marker::{DistancePair, MarkerRole};
use crate::point::{euclidean_distance, Point3};
use crate::snapshot::MarkerSnapshot;

/// Distances between marker pairs, keyed by pair.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DistanceTable {
    distances: BTreeMap<DistancePair, f64>,
}

impl DistanceTable {
    /// Measure the distance of every pair of `order` on a snapshot.
    ///
    /// # Errors
    ///
    /// Fails with [`GeometryError::MissingMarker`] if a marker of a pair has no
    /// sample, [`GeometryError::NonFiniteMarker`] if it is not finite.
    pub fn measure(snapshot: &MarkerSnapshot, order: &[DistancePair]) -> Result<Self, GeometryError> {
        let mut distances = BTreeMap::new();
        for pair in order {
            let (a, b) = pair.roles();
            let distance = euclidean_distance(&snapshot.require(a)?, &snapshot.require(b)?);
            distances.insert(*pair, distance);
        }
        Ok(Self { distances })
    }

    /// Build a table from explicit values.
    pub fn from_distances(distances: impl IntoIterator<Item = (DistancePair, f64)>) -> Self {
        Self {
            distances: distances.into_iter().collect(),
        }
    }

    /// Get the distance of a pair.
    #[inline]
    pub fn get(&self, pair: DistancePair) -> Option<f64> {
        self.distances.get(&pair).copied()
    }

    /// The pairs of the table, sorted.
    pub fn pairs(&self) -> Vec<DistancePair> {
        self.distances.keys().copied().collect()
    }

    /// Iterate over `(pair, distance)`, sorted by pair.
    pub fn iter(&self) -> impl Iterator<Item = (DistancePair, f64)> + '_ {
        self.distances.iter().map(|(pair, d)| (*pair, *d))
    }

    /// Number of pairs in the table.
    pub fn len(&self) -> usize {
        self.distances.len()
    }

    /// Check if the table is empty.
    pub fn is_empty(&self) -> bool {
        self.distances.is_empty()
    }

    /// Check that both tables track exactly the same pairs.
    pub fn same_pairs(&self, other: &DistanceTable) -> bool {
        self.distances.keys().eq(other.distances.keys())
    }
}

/// Reference geometry of a rigid cluster, measured once on the calibration sample.
///
/// It holds the calibration marker positions, the priority order of the
/// tracked pairs and their reference distances. It never changes after
/// construction.
#[derive(Debug, Clone)]
pub struct ReferenceGeometry {
    calibration: MarkerSnapshot,
    order: Vec<DistancePair>,
    distances: DistanceTable,
}

impl ReferenceGeometry {
    /// Build the reference geometry of a cluster from a calibration sample.
    ///
    /// # Arguments
    ///
    /// * `calibration` - Marker positions of the calibration (T-pose) frame.
    /// * `order` - Tracked pairs of the cluster, in priority order.
    ///
    /// # Errors
    ///
    /// * [`GeometryError::EmptyOrder`] if `order` is empty.
    /// * [`GeometryError::MissingMarker`] if the calibration lacks a marker of a pair.
    pub fn new(calibration: &MarkerSnapshot, order: &[DistancePair]) -> Result<Self, GeometryError> {
        if order.is_empty() {
            return Err(GeometryError::EmptyOrder);
        }

        let distances = DistanceTable::measure(calibration, order)?;

        let roles = order
            .iter()
            .flat_map(|pair| {
                let (a, b) = pair.roles();
                [a, b]
            })
            .collect::<Vec<_>>();

        Ok(Self {
            calibration: calibration.restricted_to(&roles),
            order: order.to_vec(),
            distances,
        })
    }

    /// Tracked pairs in priority order.
    pub fn order(&self) -> &[DistancePair] {
        &self.order
    }

    /// Reference distances.
    pub fn distances(&self) -> &DistanceTable {
        &self.distances
    }

    /// Reference distance of a pair.
    pub fn distance(&self, pair: DistancePair) -> Option<f64> {
        self.distances.get(pair)
    }

    /// Calibration position of a marker.
    pub fn position(&self, role: MarkerRole) -> Result<Point3, GeometryError> {
        self.calibration.require(role)
    }

    /// Calibration vector going from marker `from` to marker `to`.
    ///
    /// Adding it to the live position of `from` places `to` where the rigid
    /// calibration shape expects it.
    pub fn displacement(&self, from: MarkerRole, to: MarkerRole) -> Result<Point3, GeometryError> {
        Ok(self.position(to)? - self.position(from)?)
    }
}
