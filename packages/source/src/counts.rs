//! Annual average daily flow (AADF) count point data.
//!
//! Major-road and minor-road counts are published as two CSV tables with
//! the same layout. Each row is one count point in one year; rows of the
//! requested year become [`CountStation`]s.

use std::io::Read;
use std::path::Path;

use serde::Deserialize;
use traffic_link_road_models::{CountStation, Position, RoadClass, VolumeMeasurements};

use crate::{SourceError, archive, projection};

/// Members of the counts archive, major roads first.
pub const COUNT_TABLES: &[&str] = &["AADF-data-major-roads", "AADF-data-minor-roads"];

/// A raw row of an AADF table. Unused columns are ignored.
#[derive(Debug, Deserialize)]
pub struct AadfRecord {
    /// Year the flows were estimated for.
    #[serde(rename = "AADFYear")]
    pub year: i32,
    /// Count point reference.
    #[serde(rename = "CP", default, deserialize_with = "csv::invalid_option")]
    pub count_point: Option<u32>,
    /// Road name (`"A1"`, `"M25"`, `"C"`, `"U"`).
    #[serde(rename = "Road")]
    pub road: String,
    /// National Grid Easting, metres.
    #[serde(rename = "S Ref E", default, deserialize_with = "csv::invalid_option")]
    pub easting: Option<f64>,
    /// National Grid Northing, metres.
    #[serde(rename = "S Ref N", default, deserialize_with = "csv::invalid_option")]
    pub northing: Option<f64>,
    #[serde(rename = "FdAll_MV", default, deserialize_with = "csv::invalid_option")]
    pub all_motor: Option<f64>,
    #[serde(rename = "FdPC", default, deserialize_with = "csv::invalid_option")]
    pub pedal_cycle: Option<f64>,
    #[serde(rename = "Fd2WMV", default, deserialize_with = "csv::invalid_option")]
    pub two_wheel: Option<f64>,
    #[serde(rename = "FdCar", default, deserialize_with = "csv::invalid_option")]
    pub car: Option<f64>,
    #[serde(rename = "FdBUS", default, deserialize_with = "csv::invalid_option")]
    pub bus: Option<f64>,
    /// Goods vehicle columns, summed into one goods volume.
    #[serde(rename = "FdHGV", default, deserialize_with = "csv::invalid_option")]
    pub hgv: Option<f64>,
    #[serde(rename = "FdHGVA3", default, deserialize_with = "csv::invalid_option")]
    pub hgv_a3: Option<f64>,
    #[serde(rename = "FdHGVA5", default, deserialize_with = "csv::invalid_option")]
    pub hgv_a5: Option<f64>,
    #[serde(rename = "FdHGVA6", default, deserialize_with = "csv::invalid_option")]
    pub hgv_a6: Option<f64>,
    #[serde(rename = "FdHGVR2", default, deserialize_with = "csv::invalid_option")]
    pub hgv_r2: Option<f64>,
    #[serde(rename = "FdHGVR3", default, deserialize_with = "csv::invalid_option")]
    pub hgv_r3: Option<f64>,
    #[serde(rename = "FdHGVR4", default, deserialize_with = "csv::invalid_option")]
    pub hgv_r4: Option<f64>,
    #[serde(rename = "FdLGV", default, deserialize_with = "csv::invalid_option")]
    pub lgv: Option<f64>,
}

impl AadfRecord {
    /// Converts this row into a count station.
    ///
    /// Returns `None` if the road name is empty or does not start with a
    /// known class letter. Missing flows become `NaN`; the goods volume is
    /// `NaN` if any of its parts is missing.
    #[must_use]
    pub fn to_station(&self) -> Option<CountStation> {
        let road = self.road.trim();
        let road_class = RoadClass::from_road_name(road)?;

        let goods = [
            self.hgv,
            self.hgv_a3,
            self.hgv_a5,
            self.hgv_a6,
            self.hgv_r2,
            self.hgv_r3,
            self.hgv_r4,
            self.lgv,
        ]
        .iter()
        .map(|v| v.unwrap_or(f64::NAN))
        .sum();

        Some(CountStation {
            count_point: self.count_point,
            road_identity: road.to_string(),
            road_class,
            position: self.position(),
            volumes: VolumeMeasurements {
                all_motor: self.all_motor.unwrap_or(f64::NAN),
                pedal_cycle: self.pedal_cycle.unwrap_or(f64::NAN),
                two_wheel: self.two_wheel.unwrap_or(f64::NAN),
                car: self.car.unwrap_or(f64::NAN),
                bus: self.bus.unwrap_or(f64::NAN),
                goods,
            },
        })
    }

    /// WGS84 position of the count point. An absent or all-zero grid
    /// reference is missing data.
    fn position(&self) -> Position {
        match (self.easting, self.northing) {
            (Some(e), Some(n)) if !(e == 0.0 && n == 0.0) => projection::bng_to_wgs84(e, n),
            _ => Position::missing(),
        }
    }
}

/// Parses one AADF table, keeping rows of `year`.
///
/// Malformed rows are skipped.
///
/// # Errors
///
/// Returns an error if the header cannot be read or lacks a required
/// column.
pub fn parse_counts(
    reader: impl Read,
    year: i32,
    path: &str,
) -> Result<Vec<CountStation>, SourceError> {
    let mut csv_reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);

    let headers = csv_reader.headers().map_err(|e| SourceError::Csv {
        path: path.to_string(),
        source: e,
    })?;
    for column in ["AADFYear", "Road"] {
        if !headers.iter().any(|h| h.trim_start_matches('\u{feff}') == column) {
            return Err(SourceError::MissingColumn {
                path: path.to_string(),
                column: column.to_string(),
            });
        }
    }

    let mut stations = Vec::new();
    let mut skipped = 0u64;
    for result in csv_reader.deserialize::<AadfRecord>() {
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                log::trace!("  skipping malformed row: {e}");
                skipped += 1;
                continue;
            }
        };

        if record.year != year {
            continue;
        }

        match record.to_station() {
            Some(station) => stations.push(station),
            None => {
                log::trace!("  skipping count point with road {:?}", record.road);
                skipped += 1;
            }
        }
    }

    if skipped > 0 {
        log::debug!("  {path}: skipped {skipped} rows");
    }

    Ok(stations)
}

/// Loads every count station of `year` from the counts archive in
/// `data_dir`.
///
/// # Errors
///
/// Returns an error if a table is missing or unreadable.
pub fn load_counts(
    data_dir: &Path,
    archive_name: &str,
    year: i32,
) -> Result<Vec<CountStation>, SourceError> {
    let mut stations = Vec::new();

    for table in COUNT_TABLES {
        let bytes = archive::read_member(data_dir, archive_name, table)?;
        let parsed = parse_counts(bytes.as_slice(), year, table)?;
        log::info!("  {table}: {} count points for {year}", parsed.len());
        stations.extend(parsed);
    }

    let missing = stations.iter().filter(|s| !s.position.is_finite()).count();
    if missing > 0 {
        log::warn!("{missing} count points have no grid reference");
    }

    Ok(stations)
}
