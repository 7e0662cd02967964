//! Neighbor-frame search.
//!
//! A broken frame is repaired with the help of the closest frames whose
//! cluster was diagnosed as ok. The search looks at most two usable frames
//! back and two forward, and rates how much the result can be trusted.

use serde::{Deserialize, Serialize};

use crate::diagnose::FrameVerdict;
use crate::error::GeometryError;
use crate::snapshot::MarkerSnapshot;

/// Maximum number of usable frames collected on each side of the target.
pub const MAX_NEIGHBORS_PER_SIDE: usize = 2;

/// Default distance, in frames, beyond which a neighbor is considered far away.
pub const DEFAULT_NEIGHBOR_CUTOFF: usize = 10;

/// A usable frame next to the repaired one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor<'a> {
    /// Frame index in the capture.
    pub frame: usize,
    /// Cached marker positions of the frame.
    pub snapshot: &'a MarkerSnapshot,
}

/// How much a neighbor context can be trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextQuality {
    /// Two usable frames on each side, all within the cutoff.
    Full,
    /// Fewer than two usable frames on at least one side.
    Thin,
    /// The closest usable frame of a side is farther than the cutoff.
    Distant,
}

impl ContextQuality {
    /// Check if a repair built on this context is low confidence.
    pub fn is_degraded(self) -> bool {
        self != ContextQuality::Full
    }
}

/// Usable frames around a target frame, every group sorted ascending.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameContext<'a> {
    /// Usable frames before the target.
    pub before: Vec<Neighbor<'a>>,
    /// The target frame itself.
    pub target: Neighbor<'a>,
    /// Usable frames after the target.
    pub after: Vec<Neighbor<'a>>,
    /// Trust rating of the context.
    pub quality: ContextQuality,
}

impl<'a> FrameContext<'a> {
    /// Closest usable frame before the target.
    pub fn nearest_before(&self) -> Option<&Neighbor<'a>> {
        self.before.last()
    }

    /// Closest usable frame after the target.
    pub fn nearest_after(&self) -> Option<&Neighbor<'a>> {
        self.after.first()
    }

    /// Frame indices of the before group.
    pub fn before_frames(&self) -> Vec<usize> {
        self.before.iter().map(|n| n.frame).collect()
    }

    /// Frame indices of the after group.
    pub fn after_frames(&self) -> Vec<usize> {
        self.after.iter().map(|n| n.frame).collect()
    }
}

/// Find the usable frames around `target` in a verdict history.
///
/// # Arguments
///
/// * `target` - Index of the frame to repair.
/// * `verdicts` - Scan result of every frame, indexed by frame.
/// * `cutoff` - Distance in frames beyond which the closest neighbor of a side is too far.
///
/// # Returns
///
/// Up to [`MAX_NEIGHBORS_PER_SIDE`] ok frames on each side, sorted ascending,
/// and the target frame. A side without enough usable frames degrades the
/// context quality but never fails.
///
/// # Errors
///
/// Fails with [`GeometryError::FrameOutOfRange`] if `target` is not a frame of the history.
///
/// Example:
/// ```
/// use remocap_core::diagnose::FrameVerdict;
/// use remocap_core::neighbors::find_context;
/// use remocap_core::snapshot::MarkerSnapshot;
///
/// let verdicts = [false, false, true, true, false, false]
///     .iter()
///     .enumerate()
///     .map(|(frame, broken)| FrameVerdict {
///         frame,
///         broken: *broken,
///         score: 0.0,
///         snapshot: MarkerSnapshot::new(),
///     })
///     .collect::<Vec<_>>();
///
/// let context = find_context(2, &verdicts, 10).unwrap();
/// assert_eq!(context.before_frames(), vec![0, 1]);
/// assert_eq!(context.target.frame, 2);
/// assert_eq!(context.after_frames(), vec![4, 5]);
/// ```
pub fn find_context(
    target: usize,
    verdicts: &[FrameVerdict],
    cutoff: usize,
) -> Result<FrameContext<'_>, GeometryError> {
    let frame_count = verdicts.len();
    let target_verdict = verdicts.get(target).ok_or(GeometryError::FrameOutOfRange {
        frame: target,
        frame_count,
    })?;

    let neighbor = move |index: usize| Neighbor {
        frame: index,
        snapshot: &verdicts[index].snapshot,
    };

    let mut before = (0..target)
        .rev()
        .filter(|&index| verdicts[index].is_ok())
        .take(MAX_NEIGHBORS_PER_SIDE)
        .map(neighbor)
        .collect::<Vec<_>>();
    before.reverse();

    let after = (target + 1..frame_count)
        .filter(|&index| verdicts[index].is_ok())
        .take(MAX_NEIGHBORS_PER_SIDE)
        .map(neighbor)
        .collect::<Vec<_>>();

    let target_neighbor = Neighbor {
        frame: target,
        snapshot: &target_verdict.snapshot,
    };

    let quality = rate_context(target, &before, &after, cutoff);

    Ok(FrameContext {
        before,
        target: target_neighbor,
        after,
        quality,
    })
}

fn rate_context(target: usize, before: &[Neighbor], after: &[Neighbor], cutoff: usize) -> ContextQuality {
    if before.len() < MAX_NEIGHBORS_PER_SIDE || after.len() < MAX_NEIGHBORS_PER_SIDE {
        return ContextQuality::Thin;
    }

    let before_gap = before.last().map_or(usize::MAX, |n| target - n.frame);
    let after_gap = after.first().map_or(usize::MAX, |n| n.frame - target);
    if before_gap > cutoff || after_gap > cutoff {
        return ContextQuality::Distant;
    }

    ContextQuality::Full
}
