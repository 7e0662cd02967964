#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

mod error;
pub use error::RepairError;

/// Rigid cluster abstraction and the shared reconstruction loop.
pub mod cluster;

/// Head cluster reconstruction.
pub mod head;

/// Hand cluster reconstruction.
pub mod hand;

/// Run configuration.
pub mod config;

/// Two-phase scan and repair pipeline.
pub mod pipeline;

/// JSON input and output.
pub mod io;

pub use cluster::{reconstruct, ClusterKind, Confidence, Reconstruction, RepairMethod, RepairStep, RigidCluster};
pub use config::RepairConfig;
pub use pipeline::{RepairPipeline, RepairReport, ScanReport};
