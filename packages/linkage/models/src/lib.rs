#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Match, interpolation, and link result types.
//!
//! A casualty location goes through two derived stages: a [`MatchResult`]
//! naming up to two nearby count stations, and an [`InterpolatedVolume`]
//! combining their measurements. The fallback tier that produced a match is
//! an explicit [`Assignment`] variant so callers can match on it
//! exhaustively instead of inspecting sentinel strings.

pub mod progress;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use traffic_link_road_models::{RoadClass, VolumeMeasurements};

/// Key of a station group inside the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "by", content = "key", rename_all = "camelCase")]
pub enum GroupKey {
    /// Stations on one specific road (e.g. `"A315"`).
    Identity(String),
    /// Stations on all roads of one class.
    Class(RoadClass),
}

impl std::fmt::Display for GroupKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Identity(road) => write!(f, "road {road}"),
            Self::Class(class) => write!(f, "class {class}"),
        }
    }
}

/// One station returned by a nearest-neighbour query.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Neighbor {
    /// 0-based positional index of the station within its group.
    pub index: usize,
    /// Planar Euclidean distance in degrees of longitude/latitude.
    pub distance: f64,
}

/// The (up to) two nearest stations of a group, nearest first.
///
/// `second` is `None` when the group holds a single station.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Nearest {
    /// Nearest station.
    pub first: Neighbor,
    /// Second-nearest station, if the group has one.
    pub second: Option<Neighbor>,
}

/// Which fallback tier produced a match.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
pub enum AssignmentKind {
    /// Matched against stations on the same road.
    #[serde(rename = "Road Name")]
    #[strum(serialize = "Road Name")]
    ByIdentity,
    /// Matched against stations on roads of the same class.
    #[serde(rename = "Road Type")]
    #[strum(serialize = "Road Type")]
    ByClass,
    /// No usable station group.
    #[serde(rename = "None")]
    #[strum(serialize = "None")]
    Unmatched,
}

/// Why a target could not be matched.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum UnmatchedReason {
    /// Neither the road identity nor the road class has a station group.
    NoStationGroup,
    /// The target position is not finite.
    InvalidPosition,
}

/// Outcome of matching one target against the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Assignment {
    /// Matched by exact road identity.
    ByIdentity {
        /// The identity group that was queried.
        road_identity: String,
        /// Stations found.
        nearest: Nearest,
    },
    /// Matched by road class after the identity lookup failed.
    ByClass {
        /// The class group that was queried.
        road_class: RoadClass,
        /// Stations found.
        nearest: Nearest,
    },
    /// No match.
    Unmatched {
        /// Why no match was made.
        reason: UnmatchedReason,
    },
}

/// Match for a single target point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResult {
    /// Target id.
    pub id: String,
    /// The target's own road identity.
    pub road_identity: String,
    /// The target's own road class.
    pub road_class: RoadClass,
    /// Which tier matched, and what it found.
    pub assignment: Assignment,
}

impl MatchResult {
    /// Which fallback tier produced this result.
    #[must_use]
    pub const fn kind(&self) -> AssignmentKind {
        match self.assignment {
            Assignment::ByIdentity { .. } => AssignmentKind::ByIdentity,
            Assignment::ByClass { .. } => AssignmentKind::ByClass,
            Assignment::Unmatched { .. } => AssignmentKind::Unmatched,
        }
    }

    /// Catalog group the stations were taken from.
    #[must_use]
    pub fn group_key(&self) -> Option<GroupKey> {
        match &self.assignment {
            Assignment::ByIdentity { road_identity, .. } => {
                Some(GroupKey::Identity(road_identity.clone()))
            }
            Assignment::ByClass { road_class, .. } => Some(GroupKey::Class(*road_class)),
            Assignment::Unmatched { .. } => None,
        }
    }

    /// Road identity of the matched group. Class matches report the
    /// target's own identity, as no specific road was matched.
    #[must_use]
    pub fn matched_group_key(&self) -> Option<&str> {
        match &self.assignment {
            Assignment::ByIdentity { road_identity, .. } => Some(road_identity),
            Assignment::ByClass { .. } => Some(&self.road_identity),
            Assignment::Unmatched { .. } => None,
        }
    }

    /// Road class of the matched group.
    ///
    /// Identity matches take the class from the matched road's name, which
    /// can disagree with the class recorded on the target.
    #[must_use]
    pub fn matched_road_class(&self) -> Option<RoadClass> {
        match &self.assignment {
            Assignment::ByIdentity { road_identity, .. } => {
                Some(RoadClass::from_road_name(road_identity).unwrap_or(self.road_class))
            }
            Assignment::ByClass { road_class, .. } => Some(*road_class),
            Assignment::Unmatched { .. } => None,
        }
    }

    /// Stations found, if any.
    #[must_use]
    pub const fn nearest(&self) -> Option<&Nearest> {
        match &self.assignment {
            Assignment::ByIdentity { nearest, .. } | Assignment::ByClass { nearest, .. } => {
                Some(nearest)
            }
            Assignment::Unmatched { .. } => None,
        }
    }

    /// Distance to the nearest station; `NaN` when unmatched.
    #[must_use]
    pub fn distance_1(&self) -> f64 {
        self.nearest().map_or(f64::NAN, |n| n.first.distance)
    }

    /// Distance to the second-nearest station; `NaN` when absent.
    #[must_use]
    pub fn distance_2(&self) -> f64 {
        self.nearest()
            .and_then(|n| n.second)
            .map_or(f64::NAN, |s| s.distance)
    }

    /// Group index of the nearest station.
    #[must_use]
    pub fn station_index_1(&self) -> Option<usize> {
        self.nearest().map(|n| n.first.index)
    }

    /// Group index of the second-nearest station.
    #[must_use]
    pub fn station_index_2(&self) -> Option<usize> {
        self.nearest().and_then(|n| n.second).map(|s| s.index)
    }

    /// Reason code for unmatched results.
    #[must_use]
    pub const fn unmatched_reason(&self) -> Option<UnmatchedReason> {
        match self.assignment {
            Assignment::Unmatched { reason } => Some(reason),
            _ => None,
        }
    }
}

/// Relative weights of the two matched stations. Always sum to 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Weights {
    /// Weight of the nearest station.
    pub first: f64,
    /// Weight of the second-nearest station.
    pub second: f64,
    /// Both distances were zero and the 0.5/0.5 fallback was used.
    pub degenerate: bool,
}

/// Interpolated traffic volumes for a single target.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum InterpolatedVolume {
    /// Distance-weighted combination of two stations.
    Weighted {
        /// Weights applied.
        weights: Weights,
        /// Combined volumes.
        volumes: VolumeMeasurements,
    },
    /// The single matched station's raw volumes.
    Single {
        /// Station volumes.
        volumes: VolumeMeasurements,
    },
    /// Unmatched target, no volumes.
    Absent,
}

impl InterpolatedVolume {
    /// The interpolated volumes, if any.
    #[must_use]
    pub const fn volumes(&self) -> Option<&VolumeMeasurements> {
        match self {
            Self::Weighted { volumes, .. } | Self::Single { volumes } => Some(volumes),
            Self::Absent => None,
        }
    }

    /// Weights, for two-station interpolations.
    #[must_use]
    pub const fn weights(&self) -> Option<&Weights> {
        match self {
            Self::Weighted { weights, .. } => Some(weights),
            _ => None,
        }
    }
}

/// A match and its interpolation, keyed by target id in the joined table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkRecord {
    /// Match result.
    pub matched: MatchResult,
    /// Interpolated volumes.
    pub volume: InterpolatedVolume,
}

/// What the join does with unmatched targets.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum UnmatchedPolicy {
    /// Unmatched targets keep a link record with `Assign_Type = None`.
    #[default]
    Keep,
    /// Unmatched targets get no link record at all.
    Drop,
}

/// Counters describing one linkage run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkSummary {
    /// Input rows (before de-duplication).
    pub rows: u64,
    /// Distinct targets that were matched.
    pub distinct_targets: u64,
    /// Matches by road identity.
    pub by_identity: u64,
    /// Matches by road class.
    pub by_class: u64,
    /// Targets with no station group.
    pub unmatched_no_group: u64,
    /// Targets with a non-finite position.
    pub unmatched_invalid_position: u64,
    /// Unmatched targets left out of the join.
    pub dropped: u64,
    /// Matches that used only one station.
    pub single_station: u64,
    /// Two-station matches where both distances were zero.
    pub degenerate_weights: u64,
    /// Link records after the join.
    pub linked: u64,
}

impl LinkSummary {
    /// Total unmatched targets.
    #[must_use]
    pub const fn unmatched(&self) -> u64 {
        self.unmatched_no_group + self.unmatched_invalid_position
    }
}
