//! JSON files read and written by a repair run.
//!
//! * calibration: `{"lfhd": [x, y, z], ...}`, names that are not marker roles are ignored.
//! * capture: `{"frames": N, "markers": {"lfhd": [[x, y, z], ...], ...}}`.
//! * report: the [`RepairReport`] of a run.
//! * config: a [`RepairConfig`], missing fields take their default value.

use std::{
    collections::BTreeMap,
    fs::File,
    io::{BufReader, BufWriter, Write},
    path::Path,
};

use remocap_core::marker::MarkerRole;
use remocap_core::motion::MotionCapture;
use remocap_core::point::Point3;
use remocap_core::snapshot::MarkerSnapshot;
use remocap_core::GeometryError;

use crate::config::RepairConfig;
use crate::pipeline::RepairReport;

/// Error types for the io module.
#[derive(Debug, thiserror::Error)]
pub enum IoError {
    /// Error reading or writing the file.
    #[error("Failed to manipulate the file. {0}")]
    Io(#[from] std::io::Error),

    /// Error parsing or producing JSON.
    #[error("Invalid JSON content. {0}")]
    Json(#[from] serde_json::Error),

    /// The file content is not a consistent capture.
    #[error(transparent)]
    Geometry(#[from] GeometryError),
}

/// Read the calibration (T-pose) sample.
///
/// # Arguments
///
/// * `path` - The path to the calibration JSON file.
///
/// # Returns
///
/// The calibration positions of every known marker role of the file.
pub fn read_calibration(path: impl AsRef<Path>) -> Result<MarkerSnapshot, IoError> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let samples: BTreeMap<String, Point3> = serde_json::from_reader(reader)?;

    let mut calibration = MarkerSnapshot::new();
    for (name, position) in samples {
        match name.parse::<MarkerRole>() {
            Ok(role) => calibration.set(role, position),
            Err(_) => log::debug!("Ignoring calibration marker {}", name),
        }
    }

    Ok(calibration)
}

/// Read a capture and check that every series covers every frame.
///
/// # Arguments
///
/// * `path` - The path to the capture JSON file.
pub fn read_capture(path: impl AsRef<Path>) -> Result<MotionCapture, IoError> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let capture: MotionCapture = serde_json::from_reader(reader)?;
    capture.validate()?;
    Ok(capture)
}

/// Write a capture, markers that are not repaired included.
pub fn write_capture(path: impl AsRef<Path>, capture: &MotionCapture) -> Result<(), IoError> {
    write_json(path, capture)
}

/// Write the report of a repair run.
pub fn write_report(path: impl AsRef<Path>, report: &RepairReport) -> Result<(), IoError> {
    write_json(path, report)
}

/// Read the settings of a run.
///
/// The threshold is checked while parsing, the cluster list is checked when
/// the pipeline is built.
pub fn read_config(path: impl AsRef<Path>) -> Result<RepairConfig, IoError> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    Ok(serde_json::from_reader(reader)?)
}

fn write_json<T: serde::Serialize>(path: impl AsRef<Path>, value: &T) -> Result<(), IoError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.flush()?;
    Ok(())
}
