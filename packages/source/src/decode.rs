//! Decoding tables for the coded columns of the road safety data.
//!
//! Every table is total: codes outside the published lookup, including the
//! `-1` "data missing" code, decode to [`UNKNOWN`].

/// Label for unrecognized or missing codes.
pub const UNKNOWN: &str = "Unknown";

/// `Casualty_Class`.
#[must_use]
pub const fn casualty_class(code: i64) -> &'static str {
    match code {
        1 => "Driver or rider",
        2 => "Passenger",
        3 => "Pedestrian",
        _ => UNKNOWN,
    }
}

/// `Sex_of_Casualty`.
#[must_use]
pub const fn sex_of_casualty(code: i64) -> &'static str {
    match code {
        1 => "Male",
        2 => "Female",
        _ => UNKNOWN,
    }
}

/// `Casualty_Severity`.
#[must_use]
pub const fn casualty_severity(code: i64) -> &'static str {
    match code {
        1 => "Fatal",
        2 => "Serious",
        3 => "Slight",
        _ => UNKNOWN,
    }
}

/// `Casualty_Type`.
#[must_use]
pub const fn casualty_type(code: i64) -> &'static str {
    match code {
        0 => "Pedestrian",
        1 => "Cyclist",
        2 => "Motorcycle 50cc and under rider or passenger",
        3 => "Motorcycle 125cc and under rider or passenger",
        4 => "Motorcycle over 125cc and up to 500cc rider or passenger",
        5 => "Motorcycle over 500cc rider or passenger",
        8 => "Taxi/Private hire car occupant",
        9 => "Car occupant",
        10 => "Minibus (8 - 16 passenger seats) occupant",
        11 => "Bus or coach occupant (17 or more pass seats)",
        16 => "Horse rider",
        17 => "Agricultural vehicle occupant",
        18 => "Tram occupant",
        19 => "Van / Goods vehicle (3.5 tonnes mgw or under) occupant",
        20 => "Goods vehicle (over 3.5t. and under 7.5t.) occupant",
        21 => "Goods vehicle (7.5 tonnes mgw and over) occupant",
        22 => "Mobility scooter rider",
        23 => "Electric motorcycle rider or passenger",
        90 => "Other vehicle occupant",
        97 => "Motorcycle - unknown cc rider or passenger",
        98 => "Goods vehicle (unknown weight) occupant",
        _ => UNKNOWN,
    }
}

/// `Police_Force`. These labels are what agency filters match against.
#[must_use]
pub const fn police_force(code: i64) -> &'static str {
    match code {
        1 => "Metropolitan Police",
        3 => "Cumbria",
        4 => "Lancashire",
        5 => "Merseyside",
        6 => "Greater Manchester",
        7 => "Cheshire",
        10 => "Northumbria",
        11 => "Durham",
        12 => "North Yorkshire",
        13 => "West Yorkshire",
        14 => "South Yorkshire",
        16 => "Humberside",
        17 => "Cleveland",
        20 => "West Midlands",
        21 => "Staffordshire",
        22 => "West Mercia",
        23 => "Warwickshire",
        30 => "Derbyshire",
        31 => "Nottinghamshire",
        32 => "Lincolnshire",
        33 => "Leicestershire",
        34 => "Northamptonshire",
        35 => "Cambridgeshire",
        36 => "Norfolk",
        37 => "Suffolk",
        40 => "Bedfordshire",
        41 => "Hertfordshire",
        42 => "Essex",
        43 => "Thames Valley",
        44 => "Hampshire",
        45 => "Surrey",
        46 => "Kent",
        47 => "Sussex",
        48 => "City of London",
        50 => "Devon and Cornwall",
        52 => "Avon and Somerset",
        53 => "Gloucestershire",
        54 => "Wiltshire",
        55 => "Dorset",
        60 => "North Wales",
        61 => "Gwent",
        62 => "South Wales",
        63 => "Dyfed-Powys",
        91 => "Northern",
        92 => "Grampian",
        93 => "Tayside",
        94 => "Fife",
        95 => "Lothian and Borders",
        96 => "Central",
        97 => "Strathclyde",
        98 => "Dumfries and Galloway",
        _ => UNKNOWN,
    }
}

/// Every police force label, in code order.
pub fn police_forces() -> impl Iterator<Item = &'static str> {
    (0..100).map(police_force).filter(|label| *label != UNKNOWN)
}

/// `Junction_Detail`.
#[must_use]
pub const fn junction_detail(code: i64) -> &'static str {
    match code {
        0 => "Not at junction or within 20 metres",
        1 => "Roundabout",
        2 => "Mini-roundabout",
        3 => "T or staggered junction",
        5 => "Slip road",
        6 => "Crossroads",
        7 => "More than 4 arms (not roundabout)",
        8 => "Private drive or entrance",
        9 => "Other junction",
        _ => UNKNOWN,
    }
}

/// Whether a `Junction_Detail` code describes a junction.
///
/// Private drives and entrances are not junctions.
#[must_use]
pub const fn junction(detail_code: i64) -> &'static str {
    match detail_code {
        1 | 2 | 3 | 5 | 6 | 7 | 9 => "Junction",
        _ => "Not a Junction",
    }
}

/// `Junction_Control`.
#[must_use]
pub const fn junction_control(code: i64) -> &'static str {
    match code {
        0 => "Not at junction or within 20 metres",
        1 => "Authorised person",
        2 => "Auto traffic signal",
        3 => "Stop sign",
        4 => "Give way or uncontrolled",
        _ => UNKNOWN,
    }
}

/// `Day_of_Week`, where 1 is Sunday.
#[must_use]
pub const fn day_of_week(code: i64) -> &'static str {
    match code {
        1 => "Sunday",
        2 => "Monday",
        3 => "Tuesday",
        4 => "Wednesday",
        5 => "Thursday",
        6 => "Friday",
        7 => "Saturday",
        _ => UNKNOWN,
    }
}

/// Weekend or weekday for a `Day_of_Week` code.
#[must_use]
pub const fn day_type(code: i64) -> &'static str {
    match code {
        1 | 7 => "Weekend",
        2..=6 => "Weekday",
        _ => UNKNOWN,
    }
}

/// `Road_Type`.
#[must_use]
pub const fn road_type(code: i64) -> &'static str {
    match code {
        1 => "Roundabout",
        2 => "One way street",
        3 => "Dual carriageway",
        6 => "Single carriageway",
        7 => "Slip road",
        12 => "One way street/Slip road",
        _ => UNKNOWN,
    }
}

/// `Light_Conditions`.
#[must_use]
pub const fn light_conditions(code: i64) -> &'static str {
    match code {
        1 => "Daylight",
        4 => "Darkness - lights lit",
        5 => "Darkness - lights unlit",
        6 => "Darkness - no lighting",
        7 => "Darkness - lighting unknown",
        _ => UNKNOWN,
    }
}

/// `Weather_Conditions`.
#[must_use]
pub const fn weather_conditions(code: i64) -> &'static str {
    match code {
        1 => "Fine no high winds",
        2 => "Raining no high winds",
        3 => "Snowing no high winds",
        4 => "Fine + high winds",
        5 => "Raining + high winds",
        6 => "Snowing + high winds",
        7 => "Fog or mist",
        8 => "Other",
        _ => UNKNOWN,
    }
}

/// `Road_Surface_Conditions`.
#[must_use]
pub const fn road_surface_conditions(code: i64) -> &'static str {
    match code {
        1 => "Dry",
        2 => "Wet or damp",
        3 => "Snow",
        4 => "Frost or ice",
        5 => "Flood over 3cm. deep",
        6 => "Oil or diesel",
        7 => "Mud",
        _ => UNKNOWN,
    }
}

/// `Urban_or_Rural_Area`.
#[must_use]
pub const fn urban_or_rural(code: i64) -> &'static str {
    match code {
        1 => "Urban",
        2 => "Rural",
        _ => UNKNOWN,
    }
}
