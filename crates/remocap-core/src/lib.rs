#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Error types shared by the geometry primitives.
pub mod error;

/// Point arithmetic and the Euclidean distance.
pub mod point;

/// Marker roles and the named distance pairs between them.
pub mod marker;

/// Per-frame marker snapshots.
pub mod snapshot;

/// Calibration (T-pose) reference distances.
pub mod reference;

/// Frame diagnosis against the reference geometry.
pub mod diagnose;

/// Search for usable frames around a broken one.
pub mod neighbors;

/// Motion data model consumed and updated by the repair pipeline.
pub mod motion;

pub use error::GeometryError;
pub use point::{euclidean_distance, Axis, Point3};
