use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::GeometryError;
use crate::marker::MarkerRole;
use crate::point::{Axis, Point3};
use crate::snapshot::MarkerSnapshot;

/// Frame-indexed positions of a single marker.
pub type MarkerSeries = Vec<Point3>;

/// Read and write access to a motion capture.
///
/// The repair pipeline only needs the frame count, random access to marker
/// positions and an in-place coordinate update.
pub trait MotionData {
    /// Number of frames of the capture.
    fn frame_count(&self) -> usize;

    /// Position of a marker at a frame, `None` if the marker has no sample there.
    fn position(&self, role: MarkerRole, frame: usize) -> Option<Point3>;

    /// Overwrite a single coordinate of a marker at a frame.
    fn set_coordinate(
        &mut self,
        role: MarkerRole,
        frame: usize,
        axis: Axis,
        value: f64,
    ) -> Result<(), GeometryError>;

    /// Overwrite the position of a marker at a frame.
    fn set_position(&mut self, role: MarkerRole, frame: usize, position: Point3) -> Result<(), GeometryError> {
        for axis in Axis::ALL {
            self.set_coordinate(role, frame, axis, position.get(axis))?;
        }
        Ok(())
    }

    /// Read the given markers at a frame.
    fn snapshot(&self, roles: &[MarkerRole], frame: usize) -> MarkerSnapshot {
        MarkerSnapshot::from_samples(
            roles
                .iter()
                .filter_map(|role| self.position(*role, frame).map(|p| (*role, p))),
        )
    }
}

/// In-memory motion capture: named marker series sharing one frame count.
///
/// Markers that are not known roles are kept untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MotionCapture {
    frames: usize,
    markers: BTreeMap<String, MarkerSeries>,
}

impl MotionCapture {
    /// Create an empty capture of `frames` frames.
    pub fn new(frames: usize) -> Self {
        Self {
            frames,
            markers: BTreeMap::new(),
        }
    }

    /// Add or replace a marker series.
    ///
    /// # Errors
    ///
    /// Fails with [`GeometryError::SeriesLengthMismatch`] if the series does
    /// not have one sample per frame.
    pub fn insert_series(&mut self, name: impl Into<String>, series: MarkerSeries) -> Result<(), GeometryError> {
        let name = name.into();
        if series.len() != self.frames {
            return Err(GeometryError::SeriesLengthMismatch {
                name,
                expected: self.frames,
                actual: series.len(),
            });
        }
        self.markers.insert(name, series);
        Ok(())
    }

    /// Get a marker series by name.
    pub fn series(&self, name: &str) -> Option<&MarkerSeries> {
        self.markers.get(name)
    }

    /// Names of all the marker series.
    pub fn marker_names(&self) -> impl Iterator<Item = &str> {
        self.markers.keys().map(String::as_str)
    }

    /// Check that every series has one sample per frame.
    ///
    /// Deserialized captures are not checked until this is called.
    pub fn validate(&self) -> Result<(), GeometryError> {
        for (name, series) in &self.markers {
            if series.len() != self.frames {
                return Err(GeometryError::SeriesLengthMismatch {
                    name: name.clone(),
                    expected: self.frames,
                    actual: series.len(),
                });
            }
        }
        Ok(())
    }
}

impl MotionData for MotionCapture {
    fn frame_count(&self) -> usize {
        self.frames
    }

    fn position(&self, role: MarkerRole, frame: usize) -> Option<Point3> {
        self.markers
            .get(role.name())
            .and_then(|series| series.get(frame))
            .copied()
    }

    fn set_coordinate(
        &mut self,
        role: MarkerRole,
        frame: usize,
        axis: Axis,
        value: f64,
    ) -> Result<(), GeometryError> {
        let frame_count = self.frames;
        let series = self
            .markers
            .get_mut(role.name())
            .ok_or(GeometryError::MissingMarker(role))?;
        let point = series
            .get_mut(frame)
            .ok_or(GeometryError::FrameOutOfRange { frame, frame_count })?;
        *point = point.with(axis, value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_motion_capture_access() -> Result<(), GeometryError> {
        let mut capture = MotionCapture::new(2);
        capture.insert_series("lfhd", vec![Point3::new(1.0, 2.0, 3.0), Point3::new(4.0, 5.0, 6.0)])?;
        capture.insert_series("lkne", vec![Point3::ZERO, Point3::ZERO])?;

        assert_eq!(capture.frame_count(), 2);
        assert_eq!(capture.position(MarkerRole::Lfhd, 1), Some(Point3::new(4.0, 5.0, 6.0)));
        assert_eq!(capture.position(MarkerRole::Lfhd, 2), None);
        assert_eq!(capture.position(MarkerRole::Rfhd, 0), None);
        assert_eq!(capture.marker_names().collect::<Vec<_>>(), vec!["lfhd", "lkne"]);

        capture.set_coordinate(MarkerRole::Lfhd, 0, Axis::Y, -2.0)?;
        assert_eq!(capture.position(MarkerRole::Lfhd, 0), Some(Point3::new(1.0, -2.0, 3.0)));

        capture.set_position(MarkerRole::Lfhd, 1, Point3::new(7.0, 8.0, 9.0))?;
        assert_eq!(capture.position(MarkerRole::Lfhd, 1), Some(Point3::new(7.0, 8.0, 9.0)));
        Ok(())
    }

    #[test]
    fn test_motion_capture_errors() -> Result<(), GeometryError> {
        let mut capture = MotionCapture::new(2);
        assert!(matches!(
            capture.insert_series("lfhd", vec![Point3::ZERO]),
            Err(GeometryError::SeriesLengthMismatch { expected: 2, actual: 1, .. })
        ));
        assert_eq!(
            capture.set_position(MarkerRole::Lfhd, 0, Point3::ZERO),
            Err(GeometryError::MissingMarker(MarkerRole::Lfhd))
        );

        capture.insert_series("lfhd", vec![Point3::ZERO, Point3::ZERO])?;
        assert_eq!(
            capture.set_position(MarkerRole::Lfhd, 5, Point3::ZERO),
            Err(GeometryError::FrameOutOfRange {
                frame: 5,
                frame_count: 2
            })
        );
        Ok(())
    }

    #[test]
    fn test_snapshot_reads_known_roles() -> Result<(), GeometryError> {
        let mut capture = MotionCapture::new(1);
        capture.insert_series("rfin", vec![Point3::new(1.0, 1.0, 1.0)])?;
        let snapshot = capture.snapshot(&[MarkerRole::Rfin, MarkerRole::Rwra], 0);
        assert_eq!(snapshot.get(MarkerRole::Rfin), Some(Point3::new(1.0, 1.0, 1.0)));
        assert!(!snapshot.contains(MarkerRole::Rwra));
        Ok(())
    }
}
