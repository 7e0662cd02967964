use crate::marker::{DistancePair, MarkerRole};

/// Error types for invalid marker geometry input.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GeometryError {
    /// A marker required by the computation has no sample.
    #[error("Marker {0} is missing")]
    MissingMarker(MarkerRole),

    /// A marker sample has a NaN or infinite coordinate.
    #[error("Marker {0} has a non-finite position")]
    NonFiniteMarker(MarkerRole),

    /// The live and reference distance tables do not cover the same pairs.
    #[error("Mismatched geometry: live pairs {live:?} != reference pairs {reference:?}")]
    MismatchedGeometry {
        /// Pairs measured on the live frame.
        live: Vec<DistancePair>,
        /// Pairs of the reference geometry.
        reference: Vec<DistancePair>,
    },

    /// The threshold is not a positive finite number.
    #[error("Threshold must be a positive finite number, got {0}")]
    InvalidThreshold(f64),

    /// A frame index outside of the capture was requested.
    #[error("Frame {frame} is out of range for a capture of {frame_count} frames")]
    FrameOutOfRange {
        /// Requested frame index.
        frame: usize,
        /// Number of frames of the capture.
        frame_count: usize,
    },

    /// A reference geometry was requested without any distance pair.
    #[error("Reference geometry needs at least one distance pair")]
    EmptyOrder,

    /// A marker series does not have one sample per frame.
    #[error("Marker series {name} has {actual} samples, expected {expected}")]
    SeriesLengthMismatch {
        /// Name of the marker series.
        name: String,
        /// Number of frames of the capture.
        expected: usize,
        /// Number of samples found in the series.
        actual: usize,
    },

    /// A marker name does not match any known role.
    #[error("Unknown marker {0}")]
    UnknownMarker(String),
}
