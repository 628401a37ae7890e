//! Road casualty records with their accident's location and conditions.
//!
//! The road safety data ships one accident table and one casualty table
//! per year, keyed by `Accident_Index`. Casualties are inner-joined to
//! their accident, exact duplicates are dropped, and the coded columns are
//! decoded into the labels of [`crate::decode`].

use std::collections::{HashMap, HashSet};
use std::io::Read;
use std::path::Path;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use traffic_link_road_models::{AsTarget, Position, RoadClass, TargetPoint, road_identity};

use crate::{SourceError, archive, decode};

/// Archive member name of the accident table for `year`.
#[must_use]
pub fn accidents_table(year: i32) -> String {
    format!("DfTRoadSafety_Accidents_{year}")
}

/// Archive member name of the casualty table for `year`.
#[must_use]
pub fn casualties_table(year: i32) -> String {
    format!("DfTRoadSafety_Casualties_{year}")
}

/// A raw accident row. Numeric codes default to `-1` ("data missing").
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AccidentRecord {
    #[serde(rename = "Accident_Index", alias = "\u{feff}Accident_Index")]
    pub accident_index: String,
    #[serde(rename = "Police_Force", default = "missing_code")]
    pub police_force: i64,
    #[serde(rename = "Longitude", default, deserialize_with = "csv::invalid_option")]
    pub longitude: Option<f64>,
    #[serde(rename = "Latitude", default, deserialize_with = "csv::invalid_option")]
    pub latitude: Option<f64>,
    #[serde(rename = "Junction_Detail", default = "missing_code")]
    pub junction_detail: i64,
    #[serde(rename = "Junction_Control", default = "missing_code")]
    pub junction_control: i64,
    #[serde(rename = "Number_of_Vehicles", default, deserialize_with = "csv::invalid_option")]
    pub number_of_vehicles: Option<u32>,
    #[serde(rename = "Number_of_Casualties", default, deserialize_with = "csv::invalid_option")]
    pub number_of_casualties: Option<u32>,
    #[serde(rename = "Date", default)]
    pub date: String,
    #[serde(rename = "Day_of_Week", default = "missing_code")]
    pub day_of_week: i64,
    #[serde(rename = "Time", default)]
    pub time: String,
    #[serde(rename = "1st_Road_Class", default = "missing_code")]
    pub first_road_class: i64,
    #[serde(rename = "1st_Road_Number", default, deserialize_with = "csv::invalid_option")]
    pub first_road_number: Option<i64>,
    #[serde(rename = "Road_Type", default = "missing_code")]
    pub road_type: i64,
    #[serde(rename = "Speed_limit", default, deserialize_with = "csv::invalid_option")]
    pub speed_limit: Option<u32>,
    #[serde(rename = "Light_Conditions", default = "missing_code")]
    pub light_conditions: i64,
    #[serde(rename = "Weather_Conditions", default = "missing_code")]
    pub weather_conditions: i64,
    #[serde(rename = "Road_Surface_Conditions", default = "missing_code")]
    pub road_surface_conditions: i64,
    #[serde(rename = "Urban_or_Rural_Area", default = "missing_code")]
    pub urban_or_rural_area: i64,
}

/// A raw casualty row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
pub struct CasualtyRecord {
    #[serde(rename = "Accident_Index", alias = "\u{feff}Accident_Index")]
    pub accident_index: String,
    #[serde(rename = "Casualty_Class", default = "missing_code")]
    pub casualty_class: i64,
    #[serde(rename = "Sex_of_Casualty", default = "missing_code")]
    pub sex_of_casualty: i64,
    #[serde(rename = "Age_of_Casualty", default, deserialize_with = "csv::invalid_option")]
    pub age_of_casualty: Option<i64>,
    #[serde(rename = "Casualty_Severity", default = "missing_code")]
    pub casualty_severity: i64,
    #[serde(rename = "Casualty_Type", default = "missing_code")]
    pub casualty_type: i64,
}

const fn missing_code() -> i64 {
    -1
}

/// One casualty with its accident's attributes, decoded.
#[derive(Debug, Clone, PartialEq)]
pub struct CasualtyRow {
    pub accident_index: String,
    pub police_force: &'static str,
    pub casualty_class: &'static str,
    pub sex_of_casualty: &'static str,
    /// Age in years; `None` when not recorded.
    pub age_of_casualty: Option<i64>,
    pub casualty_severity: &'static str,
    pub casualty_type: &'static str,
    /// Accident location; `NaN` coordinates when not recorded.
    pub position: Position,
    pub junction_detail: &'static str,
    pub junction_control: &'static str,
    pub junction: &'static str,
    pub number_of_vehicles: Option<u32>,
    pub number_of_casualties: Option<u32>,
    pub date: String,
    pub day_of_week: &'static str,
    pub day_type: &'static str,
    pub time: String,
    /// Class of the first road.
    pub road_class: RoadClass,
    /// Road identity of the first road (`"A315"`, or `"C"` for C roads).
    pub road_name: String,
    pub road_type: &'static str,
    pub speed_limit: Option<u32>,
    pub light_conditions: &'static str,
    pub weather_conditions: &'static str,
    pub road_surface_conditions: &'static str,
    pub urban_or_rural_area: &'static str,
}

impl CasualtyRow {
    /// Decodes a casualty and the accident it belongs to.
    #[must_use]
    pub fn decode(casualty: &CasualtyRecord, accident: &AccidentRecord) -> Self {
        let road_class = RoadClass::from_stats19_code(accident.first_road_class);
        let position = match (accident.longitude, accident.latitude) {
            (Some(lon), Some(lat)) => Position::new(lon, lat),
            _ => Position::missing(),
        };

        Self {
            accident_index: casualty.accident_index.clone(),
            police_force: decode::police_force(accident.police_force),
            casualty_class: decode::casualty_class(casualty.casualty_class),
            sex_of_casualty: decode::sex_of_casualty(casualty.sex_of_casualty),
            age_of_casualty: casualty.age_of_casualty.filter(|age| *age >= 0),
            casualty_severity: decode::casualty_severity(casualty.casualty_severity),
            casualty_type: decode::casualty_type(casualty.casualty_type),
            position,
            junction_detail: decode::junction_detail(accident.junction_detail),
            junction_control: decode::junction_control(accident.junction_control),
            junction: decode::junction(accident.junction_detail),
            number_of_vehicles: accident.number_of_vehicles,
            number_of_casualties: accident.number_of_casualties,
            date: accident.date.clone(),
            day_of_week: decode::day_of_week(accident.day_of_week),
            day_type: decode::day_type(accident.day_of_week),
            time: accident.time.clone(),
            road_class,
            road_name: road_identity(road_class, accident.first_road_number),
            road_type: decode::road_type(accident.road_type),
            speed_limit: accident.speed_limit,
            light_conditions: decode::light_conditions(accident.light_conditions),
            weather_conditions: decode::weather_conditions(accident.weather_conditions),
            road_surface_conditions: decode::road_surface_conditions(
                accident.road_surface_conditions,
            ),
            urban_or_rural_area: decode::urban_or_rural(accident.urban_or_rural_area),
        }
    }

    /// `"lon,lat"` as written in the output file.
    #[must_use]
    pub fn geo(&self) -> String {
        format!("{},{}", self.position.lon, self.position.lat)
    }
}

impl AsTarget for CasualtyRow {
    fn target_point(&self) -> TargetPoint {
        TargetPoint {
            id: self.accident_index.clone(),
            road_identity: self.road_name.clone(),
            road_class: self.road_class,
            position: self.position,
        }
    }
}

fn read_table<T: DeserializeOwned>(
    reader: impl Read,
    path: &str,
) -> Result<Vec<T>, SourceError> {
    let mut csv_reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);

    let headers = csv_reader.headers().map_err(|e| SourceError::Csv {
        path: path.to_string(),
        source: e,
    })?;
    if !headers
        .iter()
        .any(|h| h.trim_start_matches('\u{feff}') == "Accident_Index")
    {
        return Err(SourceError::MissingColumn {
            path: path.to_string(),
            column: "Accident_Index".to_string(),
        });
    }

    let mut rows = Vec::new();
    for result in csv_reader.deserialize::<T>() {
        match result {
            Ok(row) => rows.push(row),
            Err(e) => log::trace!("  skipping malformed row in {path}: {e}"),
        }
    }
    Ok(rows)
}

/// Parses the accident table.
///
/// # Errors
///
/// Returns an error if the header cannot be read or has no
/// `Accident_Index` column.
pub fn parse_accidents(reader: impl Read, path: &str) -> Result<Vec<AccidentRecord>, SourceError> {
    read_table(reader, path)
}

/// Parses the casualty table.
///
/// # Errors
///
/// Returns an error if the header cannot be read or has no
/// `Accident_Index` column.
pub fn parse_casualties(
    reader: impl Read,
    path: &str,
) -> Result<Vec<CasualtyRecord>, SourceError> {
    read_table(reader, path)
}

/// Inner-joins casualties to accidents, dropping exact duplicates.
///
/// Casualties keep their input order. When an accident index appears more
/// than once, the first accident row wins.
#[must_use]
pub fn merge(accidents: &[AccidentRecord], casualties: Vec<CasualtyRecord>) -> Vec<CasualtyRow> {
    let mut by_index: HashMap<&str, &AccidentRecord> = HashMap::with_capacity(accidents.len());
    for accident in accidents {
        if let Some(first) = by_index.get(accident.accident_index.as_str()) {
            if *first != accident {
                log::debug!(
                    "Accident {} listed twice with different attributes",
                    accident.accident_index
                );
            }
            continue;
        }
        by_index.insert(&accident.accident_index, accident);
    }

    let total = casualties.len();
    let mut seen: HashSet<CasualtyRecord> = HashSet::with_capacity(total);
    let mut orphans = 0u64;

    let rows: Vec<CasualtyRow> = casualties
        .into_iter()
        .filter_map(|casualty| {
            let Some(accident) = by_index.get(casualty.accident_index.as_str()) else {
                orphans += 1;
                return None;
            };
            let row = CasualtyRow::decode(&casualty, accident);
            seen.insert(casualty).then_some(row)
        })
        .collect();

    if orphans > 0 {
        log::warn!("{orphans} casualties have no matching accident");
    }
    log::debug!("Merged {} of {total} casualty rows", rows.len());

    rows
}

/// Loads the decoded casualties of `year` from the road safety archive in
/// `data_dir`.
///
/// # Errors
///
/// Returns an error if either table is missing or unreadable.
pub fn load_casualties(
    data_dir: &Path,
    archive_name: &str,
    year: i32,
) -> Result<Vec<CasualtyRow>, SourceError> {
    let accidents_name = accidents_table(year);
    let bytes = archive::read_member(data_dir, archive_name, &accidents_name)?;
    let accidents = parse_accidents(bytes.as_slice(), &accidents_name)?;
    log::info!("  {accidents_name}: {} accidents", accidents.len());

    let casualties_name = casualties_table(year);
    let bytes = archive::read_member(data_dir, archive_name, &casualties_name)?;
    let casualties = parse_casualties(bytes.as_slice(), &casualties_name)?;
    log::info!("  {casualties_name}: {} casualties", casualties.len());

    Ok(merge(&accidents, casualties))
}
