use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::GeometryError;

/// Body side of a hand cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Left side of the body.
    Left,
    /// Right side of the body.
    Right,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Left => write!(f, "left"),
            Side::Right => write!(f, "right"),
        }
    }
}

/// The markers known to the repair engine.
///
/// Head markers seen from the top:
///
/// ```text
///   lfhd    rfhd
///     o      o
///        o pt24
///     o      o
///   lbhd    rbhd
/// ```
///
/// `pt24` is derived from the four head markers and is never tracked itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkerRole {
    /// Left front head.
    Lfhd,
    /// Left back head.
    Lbhd,
    /// Right front head.
    Rfhd,
    /// Right back head.
    Rbhd,
    /// Head centroid.
    Pt24,
    /// Right finger.
    Rfin,
    /// Right wrist, marker A.
    Rwra,
    /// Right wrist, marker B.
    Rwrb,
    /// Left finger.
    Lfin,
    /// Left wrist, marker A.
    Lwra,
    /// Left wrist, marker B.
    Lwrb,
    /// Left elbow.
    Lelb,
    /// Right elbow.
    Relb,
}

impl MarkerRole {
    /// Number of roles.
    pub const COUNT: usize = 13;

    /// All roles, in index order.
    pub const ALL: [MarkerRole; MarkerRole::COUNT] = [
        MarkerRole::Lfhd,
        MarkerRole::Lbhd,
        MarkerRole::Rfhd,
        MarkerRole::Rbhd,
        MarkerRole::Pt24,
        MarkerRole::Rfin,
        MarkerRole::Rwra,
        MarkerRole::Rwrb,
        MarkerRole::Lfin,
        MarkerRole::Lwra,
        MarkerRole::Lwrb,
        MarkerRole::Lelb,
        MarkerRole::Relb,
    ];

    /// Dense index of the role, used for fixed-size tables.
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Marker name as found in capture files.
    pub const fn name(self) -> &'static str {
        match self {
            MarkerRole::Lfhd => "lfhd",
            MarkerRole::Lbhd => "lbhd",
            MarkerRole::Rfhd => "rfhd",
            MarkerRole::Rbhd => "rbhd",
            MarkerRole::Pt24 => "pt24",
            MarkerRole::Rfin => "rfin",
            MarkerRole::Rwra => "rwra",
            MarkerRole::Rwrb => "rwrb",
            MarkerRole::Lfin => "lfin",
            MarkerRole::Lwra => "lwra",
            MarkerRole::Lwrb => "lwrb",
            MarkerRole::Lelb => "lelb",
            MarkerRole::Relb => "relb",
        }
    }

    /// Finger marker of a hand.
    pub const fn finger(side: Side) -> Self {
        match side {
            Side::Left => MarkerRole::Lfin,
            Side::Right => MarkerRole::Rfin,
        }
    }

    /// Wrist marker A of a hand.
    pub const fn wrist_a(side: Side) -> Self {
        match side {
            Side::Left => MarkerRole::Lwra,
            Side::Right => MarkerRole::Rwra,
        }
    }

    /// Wrist marker B of a hand.
    pub const fn wrist_b(side: Side) -> Self {
        match side {
            Side::Left => MarkerRole::Lwrb,
            Side::Right => MarkerRole::Rwrb,
        }
    }
}

impl fmt::Display for MarkerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for MarkerRole {
    type Err = GeometryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        MarkerRole::ALL
            .iter()
            .copied()
            .find(|role| role.name() == lower)
            .ok_or_else(|| GeometryError::UnknownMarker(s.to_string()))
    }
}

/// A named, unordered pair of markers whose distance is tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistancePair {
    /// Left temple, lfhd <-> lbhd.
    LfLb,
    /// Right temple, rfhd <-> rbhd.
    RfRb,
    /// Forehead, lfhd <-> rfhd.
    LfRf,
    /// Back of the head, lbhd <-> rbhd.
    LbRb,
    /// Diagonal left front to right back, lfhd <-> rbhd.
    LfRb,
    /// Diagonal left back to right front, lbhd <-> rfhd.
    LbRf,
    /// rfin <-> rwra.
    RfinRwra,
    /// rfin <-> rwrb.
    RfinRwrb,
    /// lfin <-> lwra.
    LfinLwra,
    /// lfin <-> lwrb.
    LfinLwrb,
    /// rwra <-> rwrb.
    RwraRwrb,
    /// lwra <-> lwrb.
    LwraLwrb,
}

impl DistancePair {
    /// Head pairs in priority order: both sides, front, back and both diagonals.
    pub const HEAD_ORDER: [DistancePair; 6] = [
        DistancePair::LfLb,
        DistancePair::RfRb,
        DistancePair::LfRf,
        DistancePair::LbRb,
        DistancePair::LfRb,
        DistancePair::LbRf,
    ];

    /// Hand pairs of both sides: finger to wrist, then wrist to wrist.
    pub const HANDS_ORDER: [DistancePair; 6] = [
        DistancePair::RfinRwra,
        DistancePair::RfinRwrb,
        DistancePair::LfinLwra,
        DistancePair::LfinLwrb,
        DistancePair::RwraRwrb,
        DistancePair::LwraLwrb,
    ];

    /// The two markers of the pair.
    pub const fn roles(self) -> (MarkerRole, MarkerRole) {
        use MarkerRole::*;
        match self {
            DistancePair::LfLb => (Lfhd, Lbhd),
            DistancePair::RfRb => (Rfhd, Rbhd),
            DistancePair::LfRf => (Lfhd, Rfhd),
            DistancePair::LbRb => (Lbhd, Rbhd),
            DistancePair::LfRb => (Lfhd, Rbhd),
            DistancePair::LbRf => (Lbhd, Rfhd),
            DistancePair::RfinRwra => (Rfin, Rwra),
            DistancePair::RfinRwrb => (Rfin, Rwrb),
            DistancePair::LfinLwra => (Lfin, Lwra),
            DistancePair::LfinLwrb => (Lfin, Lwrb),
            DistancePair::RwraRwrb => (Rwra, Rwrb),
            DistancePair::LwraLwrb => (Lwra, Lwrb),
        }
    }

    /// Pair name, e.g. `lf_lb`.
    pub const fn name(self) -> &'static str {
        match self {
            DistancePair::LfLb => "lf_lb",
            DistancePair::RfRb => "rf_rb",
            DistancePair::LfRf => "lf_rf",
            DistancePair::LbRb => "lb_rb",
            DistancePair::LfRb => "lf_rb",
            DistancePair::LbRf => "lb_rf",
            DistancePair::RfinRwra => "rfin_rwra",
            DistancePair::RfinRwrb => "rfin_rwrb",
            DistancePair::LfinLwra => "lfin_lwra",
            DistancePair::LfinLwrb => "lfin_lwrb",
            DistancePair::RwraRwrb => "rwra_rwrb",
            DistancePair::LwraLwrb => "lwra_lwrb",
        }
    }

    /// Finger to wrist A pair of a hand.
    pub const fn finger_wrist_a(side: Side) -> Self {
        match side {
            Side::Left => DistancePair::LfinLwra,
            Side::Right => DistancePair::RfinRwra,
        }
    }

    /// Finger to wrist B pair of a hand.
    pub const fn finger_wrist_b(side: Side) -> Self {
        match side {
            Side::Left => DistancePair::LfinLwrb,
            Side::Right => DistancePair::RfinRwrb,
        }
    }

    /// Wrist A to wrist B pair of a hand.
    pub const fn wrist_wrist(side: Side) -> Self {
        match side {
            Side::Left => DistancePair::LwraLwrb,
            Side::Right => DistancePair::RwraRwrb,
        }
    }

    /// Check if the pair connects the given marker.
    pub fn contains(self, role: MarkerRole) -> bool {
        let (a, b) = self.roles();
        a == role || b == role
    }
}

impl fmt::Display for DistancePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
