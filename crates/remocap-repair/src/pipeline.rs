use rayon::prelude::*;
use serde::Serialize;

use remocap_core::diagnose::{diagnose, FrameVerdict};
use remocap_core::marker::MarkerRole;
use remocap_core::motion::MotionData;
use remocap_core::neighbors::{find_context, ContextQuality};
use remocap_core::snapshot::MarkerSnapshot;
use remocap_core::GeometryError;

use crate::cluster::{reconstruct, ClusterKind, Confidence, Reconstruction, RepairStep, RigidCluster};
use crate::config::RepairConfig;
use crate::hand::HandCluster;
use crate::head::HeadCluster;
use crate::RepairError;

/// Scan result of one cluster over the whole capture.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterScan {
    /// The scanned cluster.
    pub cluster: ClusterKind,
    /// One verdict per frame, indexed by frame.
    pub verdicts: Vec<FrameVerdict>,
}

impl ClusterScan {
    /// Frames found broken, ascending.
    pub fn broken_frames(&self) -> Vec<usize> {
        self.verdicts
            .iter()
            .filter(|v| v.broken)
            .map(|v| v.frame)
            .collect()
    }
}

/// Cached result of the scan phase.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanReport {
    /// Number of frames of the scanned capture.
    pub frame_count: usize,
    /// One entry per configured cluster, in processing order.
    pub clusters: Vec<ClusterScan>,
}

impl ScanReport {
    /// Scan of a given cluster.
    pub fn cluster(&self, kind: ClusterKind) -> Option<&ClusterScan> {
        self.clusters.iter().find(|scan| scan.cluster == kind)
    }

    /// Number of broken frames over all clusters.
    pub fn broken_count(&self) -> usize {
        self.clusters
            .iter()
            .map(|scan| scan.verdicts.iter().filter(|v| v.broken).count())
            .sum()
    }

    /// Check if no cluster is broken at any frame.
    pub fn is_clean(&self) -> bool {
        self.broken_count() == 0
    }
}

/// Outcome of the repair of a broken frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameRepair {
    /// Repaired frame.
    pub frame: usize,
    /// Reconstruction steps, in order.
    pub steps: Vec<RepairStep>,
    /// Markers written back to the capture.
    pub written: Vec<MarkerRole>,
    /// Trust in the reconstruction.
    pub confidence: Confidence,
    /// Quality of the neighbor context the repair was built with.
    pub context: ContextQuality,
}

/// Repairs of one cluster.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterRepair {
    /// The repaired cluster.
    pub cluster: ClusterKind,
    /// One entry per rebuilt frame, ascending.
    pub frames: Vec<FrameRepair>,
    /// Broken frames left as is: the frame score is over the threshold
    /// but every pair is within tolerance, so no pair can be rebuilt.
    pub unresolved: Vec<usize>,
}

/// Result of the repair phase.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RepairReport {
    /// Number of frames of the repaired capture.
    pub frame_count: usize,
    /// One entry per configured cluster, in processing order.
    pub clusters: Vec<ClusterRepair>,
}

impl RepairReport {
    /// Repairs of a given cluster.
    pub fn cluster(&self, kind: ClusterKind) -> Option<&ClusterRepair> {
        self.clusters.iter().find(|repair| repair.cluster == kind)
    }

    /// Number of repaired frames over all clusters.
    pub fn repaired_count(&self) -> usize {
        self.clusters.iter().map(|repair| repair.frames.len()).sum()
    }

    /// Number of broken frames left as is over all clusters.
    pub fn unresolved_count(&self) -> usize {
        self.clusters.iter().map(|repair| repair.unresolved.len()).sum()
    }

    /// Number of repairs built with a degraded neighbor context.
    pub fn low_confidence_count(&self) -> usize {
        self.clusters
            .iter()
            .flat_map(|repair| &repair.frames)
            .filter(|frame| frame.confidence == Confidence::Low)
            .count()
    }
}

/// A reconstruction waiting for the write-back.
struct PendingRepair {
    frame: usize,
    original: MarkerSnapshot,
    reconstruction: Reconstruction,
    context: ContextQuality,
}

/// Two-phase repair of a motion capture.
///
/// The scan phase diagnoses every frame of every configured cluster and
/// caches the verdicts. The repair phase rebuilds the broken frames using
/// the cached verdicts as neighbor context, then writes the corrected
/// markers back in a single sequential pass once every frame succeeded.
///
/// Example:
/// ```
/// use remocap_core::marker::MarkerRole;
/// use remocap_core::motion::MotionCapture;
/// use remocap_core::point::Point3;
/// use remocap_core::snapshot::MarkerSnapshot;
/// use remocap_repair::{ClusterKind, RepairConfig, RepairPipeline};
///
/// let lf = Point3::new(-47.5, 35.0, 1700.0);
/// let lb = Point3::new(-47.5, -35.0, 1700.0);
/// let rf = Point3::new(47.5, 35.0, 1700.0);
/// let rb = Point3::new(47.5, -35.0, 1700.0);
///
/// let calibration = MarkerSnapshot::from_samples([
///     (MarkerRole::Lfhd, lf),
///     (MarkerRole::Lbhd, lb),
///     (MarkerRole::Rfhd, rf),
///     (MarkerRole::Rbhd, rb),
/// ]);
///
/// let config = RepairConfig {
///     clusters: vec![ClusterKind::Head],
///     ..Default::default()
/// };
/// let pipeline = RepairPipeline::new(config, &calibration).unwrap();
///
/// let mut capture = MotionCapture::new(3);
/// capture.insert_series("lfhd", vec![lf; 3]).unwrap();
/// capture.insert_series("lbhd", vec![lb; 3]).unwrap();
/// capture.insert_series("rfhd", vec![rf, rf + Point3::new(50.0, 0.0, 0.0), rf]).unwrap();
/// capture.insert_series("rbhd", vec![rb, rb + Point3::new(50.0, 0.0, 0.0), rb]).unwrap();
///
/// let report = pipeline.run(&mut capture).unwrap();
/// assert_eq!(report.repaired_count(), 1);
/// assert_eq!(capture.series("rfhd"), Some(&vec![rf; 3]));
/// ```
pub struct RepairPipeline {
    config: RepairConfig,
    clusters: Vec<Box<dyn RigidCluster>>,
}

impl RepairPipeline {
    /// Build the pipeline and the reference geometry of every configured cluster.
    ///
    /// # Arguments
    ///
    /// * `config` - Run settings.
    /// * `calibration` - Marker positions of the calibration (T-pose) sample.
    ///
    /// # Errors
    ///
    /// * [`RepairError::InvalidConfig`] if the configuration does not validate.
    /// * [`RepairError::Geometry`] if a marker of a configured cluster is missing from the calibration.
    pub fn new(config: RepairConfig, calibration: &MarkerSnapshot) -> Result<Self, RepairError> {
        config.validate()?;

        let clusters = config
            .clusters
            .iter()
            .map(|kind| build_cluster(*kind, calibration))
            .collect::<Result<Vec<_>, _>>()?;

        log::debug!(
            "Repair pipeline ready: clusters {:?}, threshold {}, {:?} aggregation",
            config.clusters,
            config.threshold,
            config.aggregation,
        );

        Ok(Self { config, clusters })
    }

    /// Settings of the pipeline.
    pub fn config(&self) -> &RepairConfig {
        &self.config
    }

    /// Diagnose every frame of every configured cluster.
    ///
    /// # Errors
    ///
    /// Fails with [`RepairError::Geometry`] if a tracked marker is missing
    /// from the capture. The lowest frame of the first cluster in error is
    /// reported.
    pub fn scan<D: MotionData + Sync>(&self, data: &D) -> Result<ScanReport, RepairError> {
        let frame_count = data.frame_count();
        let mut clusters = Vec::with_capacity(self.clusters.len());

        for cluster in &self.clusters {
            let kind = cluster.kind();
            log::info!("Scanning {} over {} frames", kind, frame_count);

            let evaluate = |frame: usize| -> Result<FrameVerdict, GeometryError> {
                let snapshot = data.snapshot(kind.roles(), frame);
                let diagnosis = diagnose(
                    &snapshot,
                    cluster.reference(),
                    self.config.threshold,
                    self.config.aggregation,
                )?;
                Ok(FrameVerdict::new(frame, snapshot, &diagnosis))
            };

            let verdicts: Vec<Result<FrameVerdict, GeometryError>> = if self.config.parallel {
                (0..frame_count).into_par_iter().map(evaluate).collect()
            } else {
                (0..frame_count).map(evaluate).collect()
            };
            let verdicts = verdicts.into_iter().collect::<Result<Vec<_>, _>>()?;

            let scan = ClusterScan {
                cluster: kind,
                verdicts,
            };
            for verdict in scan.verdicts.iter().filter(|v| v.broken) {
                log::warn!(
                    "{} broken at frame {} (score {:.3})",
                    kind,
                    verdict.frame,
                    verdict.score
                );
            }
            log::info!(
                "{}: {} of {} frames broken",
                kind,
                scan.broken_frames().len(),
                frame_count
            );

            clusters.push(scan);
        }

        Ok(ScanReport {
            frame_count,
            clusters,
        })
    }

    /// Rebuild the broken frames found by [`RepairPipeline::scan`] and write them back.
    ///
    /// Only markers whose position changed and that are sampled in the
    /// capture are written. Nothing is written if any frame fails. A frame
    /// whose score is over the threshold while every pair is within
    /// tolerance needs no reconstruction step; it is listed as unresolved
    /// and not written.
    ///
    /// # Errors
    ///
    /// * [`RepairError::ScanMismatch`] if the scan was not made by this pipeline on this capture.
    /// * [`RepairError::UnsupportedRepairTopology`] or [`RepairError::DidNotConverge`]
    ///   for the first frame, by cluster then frame order, that cannot be rebuilt.
    /// * [`RepairError::Geometry`] if the write-back fails.
    pub fn repair<D: MotionData>(&self, data: &mut D, scan: &ScanReport) -> Result<RepairReport, RepairError> {
        self.check_scan(data.frame_count(), scan)?;

        let mut pending = Vec::with_capacity(self.clusters.len());
        for (cluster, cluster_scan) in self.clusters.iter().zip(&scan.clusters) {
            let repairs = self.rebuild_cluster(cluster.as_ref(), cluster_scan).map_err(|err| {
                log::error!("Aborting repair: {}", err);
                err
            })?;
            pending.push((cluster.kind(), repairs));
        }

        let mut clusters = Vec::with_capacity(pending.len());
        for (kind, repairs) in pending {
            let mut frames = Vec::with_capacity(repairs.len());
            let mut unresolved = Vec::new();
            for repair in repairs {
                if repair.reconstruction.steps.is_empty() {
                    log::warn!(
                        "{} frame {}: broken by score but every pair is within tolerance, left as is",
                        kind,
                        repair.frame
                    );
                    unresolved.push(repair.frame);
                    continue;
                }
                let written = write_back(data, kind, &repair)?;
                frames.push(FrameRepair {
                    frame: repair.frame,
                    steps: repair.reconstruction.steps,
                    written,
                    confidence: repair.reconstruction.confidence,
                    context: repair.context,
                });
            }
            clusters.push(ClusterRepair {
                cluster: kind,
                frames,
                unresolved,
            });
        }

        let report = RepairReport {
            frame_count: scan.frame_count,
            clusters,
        };
        log::info!(
            "Repaired {} frames, {} with low confidence, {} left as is",
            report.repaired_count(),
            report.low_confidence_count(),
            report.unresolved_count()
        );

        Ok(report)
    }

    /// Scan the capture, then repair it.
    pub fn run<D: MotionData + Sync>(&self, data: &mut D) -> Result<RepairReport, RepairError> {
        let scan = self.scan(data)?;
        self.repair(data, &scan)
    }

    fn check_scan(&self, frame_count: usize, scan: &ScanReport) -> Result<(), RepairError> {
        if scan.frame_count != frame_count {
            return Err(RepairError::ScanMismatch(format!(
                "scan covers {} frames, capture has {}",
                scan.frame_count, frame_count
            )));
        }

        let scanned = scan.clusters.iter().map(|s| s.cluster).collect::<Vec<_>>();
        if scanned != self.config.clusters {
            return Err(RepairError::ScanMismatch(format!(
                "scan covers clusters {:?}, pipeline repairs {:?}",
                scanned, self.config.clusters
            )));
        }

        if let Some(scan) = scan.clusters.iter().find(|s| s.verdicts.len() != frame_count) {
            return Err(RepairError::ScanMismatch(format!(
                "{} scan has {} verdicts for {} frames",
                scan.cluster,
                scan.verdicts.len(),
                frame_count
            )));
        }

        Ok(())
    }

    fn rebuild_cluster(
        &self,
        cluster: &dyn RigidCluster,
        scan: &ClusterScan,
    ) -> Result<Vec<PendingRepair>, RepairError> {
        let threshold = self.config.threshold;
        let cutoff = self.config.neighbor_cutoff;
        let kind = cluster.kind();

        let rebuild = |frame: usize| -> Result<PendingRepair, RepairError> {
            let context = find_context(frame, &scan.verdicts, cutoff)?;
            if context.quality.is_degraded() {
                log::warn!(
                    "{} frame {}: {:?} neighbor context (before {:?}, after {:?}), repair is low confidence",
                    kind,
                    frame,
                    context.quality,
                    context.before_frames(),
                    context.after_frames(),
                );
            }

            let reconstruction = reconstruct(cluster, frame, context.target.snapshot, threshold, Some(&context))?;

            Ok(PendingRepair {
                frame,
                original: context.target.snapshot.clone(),
                reconstruction,
                context: context.quality,
            })
        };

        let broken = scan.broken_frames();
        let repairs: Vec<Result<PendingRepair, RepairError>> = if self.config.parallel {
            broken.into_par_iter().map(rebuild).collect()
        } else {
            broken.into_iter().map(rebuild).collect()
        };

        repairs.into_iter().collect()
    }
}

fn build_cluster(kind: ClusterKind, calibration: &MarkerSnapshot) -> Result<Box<dyn RigidCluster>, GeometryError> {
    Ok(match kind.side() {
        None => Box::new(HeadCluster::new(calibration)?),
        Some(side) => Box::new(HandCluster::new(side, calibration)?),
    })
}

/// Write the changed markers of a repaired frame, returns the written roles.
fn write_back<D: MotionData>(data: &mut D, kind: ClusterKind, repair: &PendingRepair) -> Result<Vec<MarkerRole>, GeometryError> {
    let mut written = Vec::new();
    for &role in kind.roles() {
        let Some(position) = repair.reconstruction.markers.get(role) else {
            continue;
        };
        match repair.original.get(role) {
            Some(original) if original != position => {
                data.set_position(role, repair.frame, position)?;
                written.push(role);
            }
            Some(_) => {}
            None => log::debug!(
                "{} frame {}: {} is not sampled in the capture, not written",
                kind,
                repair.frame,
                role
            ),
        }
    }
    Ok(written)
}
