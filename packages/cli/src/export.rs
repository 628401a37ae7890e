//! `Casualties.csv` writer.
//!
//! One output row per casualty of a selected agency: the decoded casualty
//! and accident attributes followed by the link fields (assignment kind,
//! matched road, distances, the two count points used, their weights, and
//! the six interpolated volumes). Absent values are written as empty
//! fields.

use std::io::Write;
use std::path::Path;

use serde::Serialize;
use traffic_link_linkage::{LinkedRow, LinkedTable};
use traffic_link_linkage_models::{LinkRecord, MatchResult};
use traffic_link_road_models::{CountStation, RoadClass, VolumeMeasurements};
use traffic_link_source::CasualtyRow;
use traffic_link_spatial::StationCatalog;

use crate::config::PipelineConfig;

/// Errors writing the output file.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// The output file or directory could not be created.
    #[error("Failed to create {path}: {source}")]
    Io {
        /// Path being created.
        path: String,
        /// The underlying error.
        source: std::io::Error,
    },

    /// A row could not be written.
    #[error("CSV write error: {0}")]
    Csv(#[from] csv::Error),
}

/// Counters for one export.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportStats {
    /// Rows written.
    pub written: u64,
    /// Rows outside the selected agencies.
    pub filtered: u64,
    /// Rows whose unmatched target was dropped by policy.
    pub dropped: u64,
}

#[derive(Serialize)]
struct OutputRow<'a> {
    #[serde(rename = "Accident_Index")]
    accident_index: &'a str,
    #[serde(rename = "Police_Force")]
    police_force: &'a str,
    #[serde(rename = "Casualty_Class")]
    casualty_class: &'a str,
    #[serde(rename = "Sex_of_Casualty")]
    sex_of_casualty: &'a str,
    #[serde(rename = "Age_of_Casualty")]
    age_of_casualty: Option<i64>,
    #[serde(rename = "Casualty_Severity")]
    casualty_severity: &'a str,
    #[serde(rename = "Casualty_Type")]
    casualty_type: &'a str,
    #[serde(rename = "Longitude")]
    longitude: Option<f64>,
    #[serde(rename = "Latitude")]
    latitude: Option<f64>,
    #[serde(rename = "geo")]
    geo: String,
    #[serde(rename = "Junction_Detail")]
    junction_detail: &'a str,
    #[serde(rename = "Junction_Control")]
    junction_control: &'a str,
    #[serde(rename = "Junction")]
    junction: &'a str,
    #[serde(rename = "Number_of_Vehicles")]
    number_of_vehicles: Option<u32>,
    #[serde(rename = "Number_of_Casualties")]
    number_of_casualties: Option<u32>,
    #[serde(rename = "Date")]
    date: &'a str,
    #[serde(rename = "Day_of_Week")]
    day_of_week: &'a str,
    #[serde(rename = "Day_Type")]
    day_type: &'a str,
    #[serde(rename = "Time")]
    time: &'a str,
    #[serde(rename = "1st_Road_Class")]
    road_class: &'static str,
    #[serde(rename = "Road_Name")]
    road_name: &'a str,
    #[serde(rename = "Road_Type")]
    road_type: &'a str,
    #[serde(rename = "Speed_limit")]
    speed_limit: Option<u32>,
    #[serde(rename = "Light_Conditions")]
    light_conditions: &'a str,
    #[serde(rename = "Weather_Conditions")]
    weather_conditions: &'a str,
    #[serde(rename = "Road_Surface_Conditions")]
    road_surface_conditions: &'a str,
    #[serde(rename = "Urban_or_Rural_Area")]
    urban_or_rural_area: &'a str,
    #[serde(rename = "Assign_Type")]
    assign_type: String,
    #[serde(rename = "Unmatched_Reason")]
    unmatched_reason: Option<String>,
    #[serde(rename = "Matched_Road")]
    matched_road: Option<&'a str>,
    #[serde(rename = "Matched_Road_Class")]
    matched_road_class: Option<&'static str>,
    #[serde(rename = "Distance_1")]
    distance_1: Option<f64>,
    #[serde(rename = "Distance_2")]
    distance_2: Option<f64>,
    #[serde(rename = "CP_Index_1")]
    cp_index_1: Option<usize>,
    #[serde(rename = "CP_Index_2")]
    cp_index_2: Option<usize>,
    #[serde(rename = "CP_1")]
    cp_1: Option<u32>,
    #[serde(rename = "CP_2")]
    cp_2: Option<u32>,
    #[serde(rename = "Lon_S_1")]
    lon_s_1: Option<f64>,
    #[serde(rename = "Lat_S_1")]
    lat_s_1: Option<f64>,
    #[serde(rename = "Lon_S_2")]
    lon_s_2: Option<f64>,
    #[serde(rename = "Lat_S_2")]
    lat_s_2: Option<f64>,
    #[serde(rename = "Weight_1")]
    weight_1: Option<f64>,
    #[serde(rename = "Weight_2")]
    weight_2: Option<f64>,
    #[serde(rename = "FdAll_MV")]
    all_motor: Option<f64>,
    #[serde(rename = "FdPC")]
    pedal_cycle: Option<f64>,
    #[serde(rename = "Fd2WMV")]
    two_wheel: Option<f64>,
    #[serde(rename = "FdCar")]
    car: Option<f64>,
    #[serde(rename = "FdBUS")]
    bus: Option<f64>,
    #[serde(rename = "FdAll_GV")]
    goods: Option<f64>,
}

fn finite(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}

fn station<'c>(
    catalog: &'c StationCatalog,
    matched: &MatchResult,
    index: Option<usize>,
) -> Option<&'c CountStation> {
    let key = matched.group_key()?;
    catalog.group(&key)?.station(index?)
}

impl<'a> OutputRow<'a> {
    fn new(row: &'a CasualtyRow, link: &'a LinkRecord, catalog: &StationCatalog) -> Self {
        let matched = &link.matched;
        let first = station(catalog, matched, matched.station_index_1());
        let second = station(catalog, matched, matched.station_index_2());
        let volumes: Option<&VolumeMeasurements> = link.volume.volumes();
        let weights = link.volume.weights();

        Self {
            accident_index: &row.accident_index,
            police_force: row.police_force,
            casualty_class: row.casualty_class,
            sex_of_casualty: row.sex_of_casualty,
            age_of_casualty: row.age_of_casualty,
            casualty_severity: row.casualty_severity,
            casualty_type: row.casualty_type,
            longitude: finite(row.position.lon),
            latitude: finite(row.position.lat),
            geo: row.geo(),
            junction_detail: row.junction_detail,
            junction_control: row.junction_control,
            junction: row.junction,
            number_of_vehicles: row.number_of_vehicles,
            number_of_casualties: row.number_of_casualties,
            date: &row.date,
            day_of_week: row.day_of_week,
            day_type: row.day_type,
            time: &row.time,
            road_class: row.road_class.code(),
            road_name: &row.road_name,
            road_type: row.road_type,
            speed_limit: row.speed_limit,
            light_conditions: row.light_conditions,
            weather_conditions: row.weather_conditions,
            road_surface_conditions: row.road_surface_conditions,
            urban_or_rural_area: row.urban_or_rural_area,
            assign_type: matched.kind().to_string(),
            unmatched_reason: matched.unmatched_reason().as_ref().map(ToString::to_string),
            matched_road: matched.matched_group_key(),
            matched_road_class: matched.matched_road_class().map(RoadClass::code),
            distance_1: finite(matched.distance_1()),
            distance_2: finite(matched.distance_2()),
            cp_index_1: matched.station_index_1(),
            cp_index_2: matched.station_index_2(),
            cp_1: first.and_then(|s| s.count_point),
            cp_2: second.and_then(|s| s.count_point),
            lon_s_1: first.map(|s| s.position.lon),
            lat_s_1: first.map(|s| s.position.lat),
            lon_s_2: second.map(|s| s.position.lon),
            lat_s_2: second.map(|s| s.position.lat),
            weight_1: weights.map(|w| w.first),
            weight_2: weights.map(|w| w.second),
            all_motor: volumes.and_then(|v| finite(v.all_motor)),
            pedal_cycle: volumes.and_then(|v| finite(v.pedal_cycle)),
            two_wheel: volumes.and_then(|v| finite(v.two_wheel)),
            car: volumes.and_then(|v| finite(v.car)),
            bus: volumes.and_then(|v| finite(v.bus)),
            goods: volumes.and_then(|v| finite(v.goods)),
        }
    }
}

/// Writes the rows of `table` that belong to the configured agencies.
///
/// Rows whose unmatched target was dropped by policy are not written.
///
/// # Errors
///
/// Returns an error if a row cannot be written.
pub fn write_casualties<W: Write>(
    writer: W,
    table: &LinkedTable<CasualtyRow>,
    catalog: &StationCatalog,
    config: &PipelineConfig,
) -> Result<ExportStats, ExportError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    let mut stats = ExportStats::default();

    for LinkedRow { row, link } in &table.rows {
        if !config.includes_agency(row.police_force) {
            stats.filtered += 1;
            continue;
        }
        let Some(link) = link else {
            stats.dropped += 1;
            continue;
        };

        csv_writer.serialize(OutputRow::new(row, link, catalog))?;
        stats.written += 1;
    }

    csv_writer.flush().map_err(|e| ExportError::Io {
        path: "output".to_string(),
        source: e,
    })?;

    Ok(stats)
}

/// Writes `Casualties.csv` under the configured output directory.
///
/// # Errors
///
/// Returns an error if the directory or file cannot be created or a row
/// cannot be written.
pub fn export(
    table: &LinkedTable<CasualtyRow>,
    catalog: &StationCatalog,
    config: &PipelineConfig,
) -> Result<ExportStats, ExportError> {
    std::fs::create_dir_all(&config.output_dir).map_err(|e| ExportError::Io {
        path: config.output_dir.display().to_string(),
        source: e,
    })?;

    let path = config.output_path();
    let file = create(&path)?;
    let stats = write_casualties(std::io::BufWriter::new(file), table, catalog, config)?;

    log::info!(
        "Wrote {} rows to {} ({} outside selected agencies, {} dropped)",
        stats.written,
        path.display(),
        stats.filtered,
        stats.dropped
    );

    Ok(stats)
}

fn create(path: &Path) -> Result<std::fs::File, ExportError> {
    std::fs::File::create(path).map_err(|e| ExportError::Io {
        path: path.display().to_string(),
        source: e,
    })
}
