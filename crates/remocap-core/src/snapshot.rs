use serde::{Deserialize, Serialize};

use crate::error::GeometryError;
use crate::marker::MarkerRole;
use crate::point::Point3;

/// Marker positions of a single frame.
///
/// Every role has a slot; an empty slot means the marker has no sample.
/// A calibration (T-pose) sample is a snapshot as well.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarkerSnapshot {
    positions: [Option<Point3>; MarkerRole::COUNT],
}

impl MarkerSnapshot {
    /// Create an empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a snapshot from `(role, position)` samples.
    pub fn from_samples(samples: impl IntoIterator<Item = (MarkerRole, Point3)>) -> Self {
        let mut snapshot = Self::new();
        for (role, position) in samples {
            snapshot.set(role, position);
        }
        snapshot
    }

    /// Get the position of a marker, if any.
    #[inline]
    pub fn get(&self, role: MarkerRole) -> Option<Point3> {
        self.positions[role.index()]
    }

    /// Get the position of a marker or fail if it is missing.
    ///
    /// A sample with a NaN or infinite coordinate is rejected too, lost
    /// markers are often exported that way.
    pub fn require(&self, role: MarkerRole) -> Result<Point3, GeometryError> {
        let position = self.get(role).ok_or(GeometryError::MissingMarker(role))?;
        if !position.is_finite() {
            return Err(GeometryError::NonFiniteMarker(role));
        }
        Ok(position)
    }

    /// Set the position of a marker.
    #[inline]
    pub fn set(&mut self, role: MarkerRole, position: Point3) {
        self.positions[role.index()] = Some(position);
    }

    /// Check if a marker has a sample.
    pub fn contains(&self, role: MarkerRole) -> bool {
        self.positions[role.index()].is_some()
    }

    /// Iterate over the markers that have a sample.
    pub fn iter(&self) -> impl Iterator<Item = (MarkerRole, Point3)> + '_ {
        MarkerRole::ALL
            .iter()
            .filter_map(|role| self.get(*role).map(|p| (*role, p)))
    }

    /// Keep only the given roles.
    pub fn restricted_to(&self, roles: &[MarkerRole]) -> Self {
        Self::from_samples(
            roles
                .iter()
                .filter_map(|role| self.get(*role).map(|p| (*role, p))),
        )
    }
}
