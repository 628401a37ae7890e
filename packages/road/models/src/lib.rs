#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Road classification, traffic count station, and casualty location types.
//!
//! These are the shared vocabulary of the traffic-link workspace: every
//! crate that reads count stations, reads casualty locations, or matches
//! one against the other speaks in terms of the types defined here.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Coarse road category, serialized by its single-letter code.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
pub enum RoadClass {
    /// Motorways (`M1`, `M25`, ...)
    #[serde(rename = "M")]
    #[strum(serialize = "M")]
    Motorway,
    /// A roads, including A(M) motorway sections
    #[serde(rename = "A")]
    #[strum(serialize = "A")]
    A,
    /// B roads
    #[serde(rename = "B")]
    #[strum(serialize = "B")]
    B,
    /// Classified unnumbered roads
    #[serde(rename = "C")]
    #[strum(serialize = "C")]
    C,
    /// Unclassified roads
    #[serde(rename = "U")]
    #[strum(serialize = "U")]
    Unclassified,
}

impl RoadClass {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::A, Self::B, Self::Motorway, Self::C, Self::Unclassified]
    }

    /// Single-letter code used in road names and output files.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Motorway => "M",
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
            Self::Unclassified => "U",
        }
    }

    /// Human-readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Motorway => "Motorway",
            Self::A => "A road",
            Self::B => "B road",
            Self::C => "C road",
            Self::Unclassified => "Unclassified",
        }
    }

    /// Whether roads of this class carry a number in their identity.
    #[must_use]
    pub const fn is_numbered(self) -> bool {
        matches!(self, Self::Motorway | Self::A | Self::B)
    }

    /// Derives the class from the first character of a road name
    /// (`"A315"` is an A road, `"M25"` a motorway).
    #[must_use]
    pub fn from_road_name(road: &str) -> Option<Self> {
        match road.trim().chars().next()? {
            'M' | 'm' => Some(Self::Motorway),
            'A' | 'a' => Some(Self::A),
            'B' | 'b' => Some(Self::B),
            'C' | 'c' => Some(Self::C),
            'U' | 'u' => Some(Self::Unclassified),
            _ => None,
        }
    }

    /// Maps the numeric `1st_Road_Class` code of the casualty data.
    ///
    /// A(M) sections (code 2) count as A roads. Codes outside 1-5,
    /// including the "unclassified" code 6, map to [`Self::Unclassified`].
    #[must_use]
    pub const fn from_stats19_code(code: i64) -> Self {
        match code {
            1 => Self::Motorway,
            2 | 3 => Self::A,
            4 => Self::B,
            5 => Self::C,
            _ => Self::Unclassified,
        }
    }
}

/// Builds the road identity for a casualty location.
///
/// Numbered classes get the class letter followed by the road number
/// (`A` + `315` is `"A315"`). C and unclassified roads are identified by
/// their bare class letter, as are numbered roads with no usable number.
#[must_use]
pub fn road_identity(class: RoadClass, number: Option<i64>) -> String {
    match number {
        Some(n) if class.is_numbered() && n > 0 => format!("{}{n}", class.code()),
        _ => class.code().to_string(),
    }
}

/// A longitude/latitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Longitude (WGS84).
    pub lon: f64,
    /// Latitude (WGS84).
    pub lat: f64,
}

impl Position {
    /// Creates a position from longitude and latitude.
    #[must_use]
    pub const fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    /// A position with both coordinates `NaN`, used for missing locations.
    #[must_use]
    pub const fn missing() -> Self {
        Self {
            lon: f64::NAN,
            lat: f64::NAN,
        }
    }

    /// Whether both coordinates are finite.
    #[must_use]
    pub const fn is_finite(&self) -> bool {
        self.lon.is_finite() && self.lat.is_finite()
    }

    /// `[lon, lat]`, the layout used by the spatial index.
    #[must_use]
    pub const fn to_array(self) -> [f64; 2] {
        [self.lon, self.lat]
    }
}

/// One of the six traffic-volume measurements carried by a count station.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum VolumeKind {
    /// All motor vehicles
    AllMotor,
    /// Pedal cycles
    PedalCycle,
    /// Two-wheeled motor vehicles
    TwoWheel,
    /// Cars and taxis
    Car,
    /// Buses and coaches
    Bus,
    /// All goods vehicles (light and heavy)
    Goods,
}

impl VolumeKind {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::AllMotor,
            Self::PedalCycle,
            Self::TwoWheel,
            Self::Car,
            Self::Bus,
            Self::Goods,
        ]
    }

    /// Column name used by the count data and the output file.
    #[must_use]
    pub const fn column(self) -> &'static str {
        match self {
            Self::AllMotor => "FdAll_MV",
            Self::PedalCycle => "FdPC",
            Self::TwoWheel => "Fd2WMV",
            Self::Car => "FdCar",
            Self::Bus => "FdBUS",
            Self::Goods => "FdAll_GV",
        }
    }
}

/// Annual average daily flows by vehicle category.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeMeasurements {
    /// All motor vehicles.
    pub all_motor: f64,
    /// Pedal cycles.
    pub pedal_cycle: f64,
    /// Two-wheeled motor vehicles.
    pub two_wheel: f64,
    /// Cars and taxis.
    pub car: f64,
    /// Buses and coaches.
    pub bus: f64,
    /// All goods vehicles.
    pub goods: f64,
}

impl VolumeMeasurements {
    /// Builds a measurement vector by evaluating `f` for every kind.
    #[must_use]
    pub fn from_fn(mut f: impl FnMut(VolumeKind) -> f64) -> Self {
        Self {
            all_motor: f(VolumeKind::AllMotor),
            pedal_cycle: f(VolumeKind::PedalCycle),
            two_wheel: f(VolumeKind::TwoWheel),
            car: f(VolumeKind::Car),
            bus: f(VolumeKind::Bus),
            goods: f(VolumeKind::Goods),
        }
    }

    /// Returns the measurement of the given kind.
    #[must_use]
    pub const fn get(&self, kind: VolumeKind) -> f64 {
        match kind {
            VolumeKind::AllMotor => self.all_motor,
            VolumeKind::PedalCycle => self.pedal_cycle,
            VolumeKind::TwoWheel => self.two_wheel,
            VolumeKind::Car => self.car,
            VolumeKind::Bus => self.bus,
            VolumeKind::Goods => self.goods,
        }
    }
}

/// A traffic count point with its measured volumes.
///
/// Immutable once read; identified inside a catalog group by its
/// positional index rather than by any field here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountStation {
    /// Count point reference from the source data, if present.
    pub count_point: Option<u32>,
    /// Road identity (e.g. `"A315"`, or `"C"`/`"U"` for minor roads).
    pub road_identity: String,
    /// Class of the road the station sits on.
    pub road_class: RoadClass,
    /// Station location.
    pub position: Position,
    /// Measured volumes.
    pub volumes: VolumeMeasurements,
}

/// A casualty location to be matched against count stations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetPoint {
    /// Accident identity, unique per accident.
    pub id: String,
    /// Road identity, see [`road_identity`].
    pub road_identity: String,
    /// Class of the road the accident happened on.
    pub road_class: RoadClass,
    /// Accident location.
    pub position: Position,
}

/// A row that can be located as a target point.
///
/// Implemented by casualty tables so the linkage join can match rows of
/// any shape.
pub trait AsTarget {
    /// The target this row is matched as. Rows with equal targets are
    /// matched once.
    fn target_point(&self) -> TargetPoint;
}

impl AsTarget for TargetPoint {
    fn target_point(&self) -> TargetPoint {
        self.clone()
    }
}
