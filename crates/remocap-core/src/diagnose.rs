use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::GeometryError;
use crate::marker::DistancePair;
use crate::reference::{DistanceTable, ReferenceGeometry};
use crate::snapshot::MarkerSnapshot;

/// Tolerance on the distance deviation from the reference, in capture units.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Threshold(f64);

impl Threshold {
    /// Create a threshold, it must be positive and finite.
    pub fn new(value: f64) -> Result<Self, GeometryError> {
        if value.is_finite() && value > 0.0 {
            Ok(Self(value))
        } else {
            Err(GeometryError::InvalidThreshold(value))
        }
    }

    /// The threshold value.
    #[inline]
    pub fn value(self) -> f64 {
        self.0
    }
}

impl Default for Threshold {
    fn default() -> Self {
        Self(10.0)
    }
}

impl TryFrom<f64> for Threshold {
    type Error = GeometryError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Threshold> for f64 {
    fn from(threshold: Threshold) -> Self {
        threshold.0
    }
}

impl fmt::Display for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How the per-pair deviations are folded into a single frame score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregation {
    /// `|Σ(live - reference)|`, deviations of opposite sign cancel out.
    #[default]
    Signed,
    /// `Σ|live - reference|`, every deviation counts.
    Absolute,
}

impl Aggregation {
    /// Fold signed per-pair differences into a non-negative score.
    pub fn score(self, differences: impl Iterator<Item = f64>) -> f64 {
        match self {
            Aggregation::Signed => differences.sum::<f64>().abs(),
            Aggregation::Absolute => differences.map(f64::abs).sum(),
        }
    }
}

impl std::str::FromStr for Aggregation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "signed" => Ok(Aggregation::Signed),
            "absolute" => Ok(Aggregation::Absolute),
            other => Err(format!("unknown aggregation {other}, expected signed or absolute")),
        }
    }
}

/// Outcome of comparing a live frame against the reference geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnosis {
    /// Whether the frame score exceeds the threshold.
    pub broken: bool,
    /// Aggregated deviation of the frame.
    pub score: f64,
    /// Distances measured on the live frame.
    pub live: DistanceTable,
    /// Signed `live - reference` difference per pair.
    pub differences: DistanceTable,
    threshold: Threshold,
}

impl Diagnosis {
    /// Check if the live distance of a pair is within tolerance.
    ///
    /// Pairs that are not tracked are never good.
    pub fn is_pair_good(&self, pair: DistancePair) -> bool {
        self.differences
            .get(pair)
            .is_some_and(|d| d.abs() < self.threshold.value())
    }

    /// Check if every tracked pair is within tolerance.
    pub fn all_good(&self) -> bool {
        self.differences
            .iter()
            .all(|(_, d)| d.abs() < self.threshold.value())
    }

    /// First pair of `order` that is within tolerance.
    pub fn first_good(&self, order: &[DistancePair]) -> Option<DistancePair> {
        order.iter().copied().find(|pair| self.is_pair_good(*pair))
    }

    /// Pairs that are out of tolerance, in the given order.
    pub fn bad_pairs(&self, order: &[DistancePair]) -> Vec<DistancePair> {
        order
            .iter()
            .copied()
            .filter(|pair| !self.is_pair_good(*pair))
            .collect()
    }
}

/// Cached scan result of one frame of one cluster.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameVerdict {
    /// Frame index in the capture.
    pub frame: usize,
    /// Whether the cluster was found broken at this frame.
    pub broken: bool,
    /// Aggregated deviation score.
    pub score: f64,
    /// Marker positions read during the scan.
    pub snapshot: MarkerSnapshot,
}

impl FrameVerdict {
    /// Build the verdict of a frame from its diagnosis.
    pub fn new(frame: usize, snapshot: MarkerSnapshot, diagnosis: &Diagnosis) -> Self {
        Self {
            frame,
            broken: diagnosis.broken,
            score: diagnosis.score,
            snapshot,
        }
    }

    /// Check if the frame can be used as repair context.
    #[inline]
    pub fn is_ok(&self) -> bool {
        !self.broken
    }
}

/// Compare live distances with the reference distances.
///
/// # Arguments
///
/// * `live` - Distances measured on the live frame.
/// * `reference` - Reference geometry of the cluster.
/// * `threshold` - Tolerance of the frame score.
/// * `aggregation` - How per-pair differences are combined.
///
/// # Errors
///
/// Fails with [`GeometryError::MismatchedGeometry`] if both tables do not
/// track exactly the same pairs.
pub fn compare(
    live: DistanceTable,
    reference: &ReferenceGeometry,
    threshold: Threshold,
    aggregation: Aggregation,
) -> Result<Diagnosis, GeometryError> {
    let reference_distances = reference.distances();
    if !live.same_pairs(reference_distances) || live.is_empty() {
        return Err(GeometryError::MismatchedGeometry {
            live: live.pairs(),
            reference: reference_distances.pairs(),
        });
    }

    let differences = DistanceTable::from_distances(
        live.iter()
            .zip(reference_distances.iter())
            .map(|((pair, l), (_, r))| (pair, l - r)),
    );

    let score = aggregation.score(differences.iter().map(|(_, d)| d));

    Ok(Diagnosis {
        broken: score > threshold.value(),
        score,
        live,
        differences,
        threshold,
    })
}

/// Diagnose a frame of a rigid cluster.
///
/// The live distances are measured over the reference order and compared
/// with the calibration distances. The function has no side effects, frames
/// can be diagnosed in any order or in parallel.
///
/// # Errors
///
/// * [`GeometryError::MissingMarker`] if a tracked marker has no sample.
/// * [`GeometryError::NonFiniteMarker`] if a tracked marker has a NaN or infinite coordinate.
/// * [`GeometryError::MismatchedGeometry`] if the distance tables differ.
pub fn diagnose(
    live: &MarkerSnapshot,
    reference: &ReferenceGeometry,
    threshold: Threshold,
    aggregation: Aggregation,
) -> Result<Diagnosis, GeometryError> {
    let live_distances = DistanceTable::measure(live, reference.order())?;
    compare(live_distances, reference, threshold, aggregation)
}
