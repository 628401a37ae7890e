//! British National Grid to WGS84 conversion.
//!
//! Count stations are published with OSGB36 National Grid Easting and
//! Northing. These are inverted to OSGB36 latitude/longitude with the
//! Ordnance Survey Transverse Mercator series, moved to WGS84 with a
//! seven-parameter Helmert transform, and returned as decimal degrees.
//! The Helmert step is accurate to a few metres, well within the spacing
//! of count stations.

use std::f64::consts::PI;

use traffic_link_road_models::Position;

/// A reference ellipsoid by semi-major and semi-minor axis (metres).
#[derive(Debug, Clone, Copy)]
struct Ellipsoid {
    a: f64,
    b: f64,
}

impl Ellipsoid {
    const fn e2(self) -> f64 {
        1.0 - (self.b * self.b) / (self.a * self.a)
    }
}

const AIRY_1830: Ellipsoid = Ellipsoid {
    a: 6_377_563.396,
    b: 6_356_256.909,
};

const WGS84: Ellipsoid = Ellipsoid {
    a: 6_378_137.0,
    b: 6_356_752.314_2,
};

/// Central meridian scale factor.
const F0: f64 = 0.999_601_271_7;
/// True origin latitude, degrees.
const LAT0: f64 = 49.0;
/// True origin longitude, degrees.
const LON0: f64 = -2.0;
/// False easting of the true origin, metres.
const E0: f64 = 400_000.0;
/// False northing of the true origin, metres.
const N0: f64 = -100_000.0;

/// OSGB36 to WGS84 Helmert parameters: translation (m), rotation
/// (arc-seconds), scale (ppm).
const TX: f64 = 446.448;
const TY: f64 = -125.157;
const TZ: f64 = 542.060;
const RX: f64 = 0.1502;
const RY: f64 = 0.2470;
const RZ: f64 = 0.8421;
const S_PPM: f64 = -20.4894;

/// Stop refining the footpoint latitude below this meridional arc
/// residual (metres).
const ARC_TOLERANCE: f64 = 1e-5;
const MAX_ITERATIONS: usize = 32;

/// Converts a National Grid Easting/Northing (metres) to WGS84.
///
/// Non-finite input yields [`Position::missing`].
#[must_use]
pub fn bng_to_wgs84(easting: f64, northing: f64) -> Position {
    if !easting.is_finite() || !northing.is_finite() {
        return Position::missing();
    }

    let (lat, lon) = grid_to_osgb36(easting, northing);
    let cartesian = to_cartesian(lat, lon, AIRY_1830);
    let (lat, lon) = from_cartesian(helmert(cartesian), WGS84);

    Position::new(lon.to_degrees(), lat.to_degrees())
}

/// Inverse Transverse Mercator on the Airy 1830 ellipsoid. Returns OSGB36
/// latitude and longitude in radians.
#[allow(
    clippy::many_single_char_names,
    clippy::similar_names,
    clippy::suboptimal_flops
)]
fn grid_to_osgb36(easting: f64, northing: f64) -> (f64, f64) {
    let Ellipsoid { a, b } = AIRY_1830;
    let e2 = AIRY_1830.e2();
    let n = (a - b) / (a + b);
    let lat0 = LAT0.to_radians();
    let lon0 = LON0.to_radians();

    let mut lat = lat0;
    let mut m = 0.0;
    for _ in 0..MAX_ITERATIONS {
        lat += (northing - N0 - m) / (a * F0);
        m = meridional_arc(lat, lat0, b, n);
        if (northing - N0 - m).abs() < ARC_TOLERANCE {
            break;
        }
    }

    let sin_lat = lat.sin();
    let denom = 1.0 - e2 * sin_lat * sin_lat;
    let nu = a * F0 / denom.sqrt();
    let rho = a * F0 * (1.0 - e2) / denom.powf(1.5);
    let eta2 = nu / rho - 1.0;

    let t = lat.tan();
    let t2 = t * t;
    let t4 = t2 * t2;
    let t6 = t4 * t2;
    let sec = 1.0 / lat.cos();

    let vii = t / (2.0 * rho * nu);
    let viii = t / (24.0 * rho * nu.powi(3)) * (5.0 + 3.0 * t2 + eta2 - 9.0 * t2 * eta2);
    let ix = t / (720.0 * rho * nu.powi(5)) * (61.0 + 90.0 * t2 + 45.0 * t4);
    let x = sec / nu;
    let xi = sec / (6.0 * nu.powi(3)) * (nu / rho + 2.0 * t2);
    let xii = sec / (120.0 * nu.powi(5)) * (5.0 + 28.0 * t2 + 24.0 * t4);
    let xiia = sec / (5040.0 * nu.powi(7)) * (61.0 + 662.0 * t2 + 1320.0 * t4 + 720.0 * t6);

    let de = easting - E0;
    let de2 = de * de;

    let lat = lat - vii * de2 + viii * de2 * de2 - ix * de2 * de2 * de2;
    let lon = lon0 + x * de - xi * de * de2 + xii * de * de2 * de2 - xiia * de * de2 * de2 * de2;

    (lat, lon)
}

/// Meridional arc from the true origin latitude to `lat`.
#[allow(clippy::suboptimal_flops)]
fn meridional_arc(lat: f64, lat0: f64, b: f64, n: f64) -> f64 {
    let n2 = n * n;
    let n3 = n2 * n;
    let dl = lat - lat0;
    let sl = lat + lat0;

    b * F0
        * ((1.0 + n + 1.25 * n2 + 1.25 * n3) * dl
            - (3.0 * n + 3.0 * n2 + 21.0 / 8.0 * n3) * dl.sin() * sl.cos()
            + (15.0 / 8.0 * n2 + 15.0 / 8.0 * n3) * (2.0 * dl).sin() * (2.0 * sl).cos()
            - 35.0 / 24.0 * n3 * (3.0 * dl).sin() * (3.0 * sl).cos())
}

/// Geodetic (height zero) to Earth-centred cartesian coordinates.
fn to_cartesian(lat: f64, lon: f64, ellipsoid: Ellipsoid) -> [f64; 3] {
    let e2 = ellipsoid.e2();
    let sin_lat = lat.sin();
    let nu = ellipsoid.a / (1.0 - e2 * sin_lat * sin_lat).sqrt();

    [
        nu * lat.cos() * lon.cos(),
        nu * lat.cos() * lon.sin(),
        (1.0 - e2) * nu * sin_lat,
    ]
}

/// Position-vector Helmert transform from OSGB36 to WGS84.
#[allow(clippy::suboptimal_flops)]
fn helmert([x, y, z]: [f64; 3]) -> [f64; 3] {
    let arcsec = PI / (180.0 * 3600.0);
    let (rx, ry, rz) = (RX * arcsec, RY * arcsec, RZ * arcsec);
    let s = 1.0 + S_PPM * 1e-6;

    [
        TX + s * x - rz * y + ry * z,
        TY + rz * x + s * y - rx * z,
        TZ - ry * x + rx * y + s * z,
    ]
}

/// Cartesian to geodetic latitude and longitude (radians).
fn from_cartesian([x, y, z]: [f64; 3], ellipsoid: Ellipsoid) -> (f64, f64) {
    let e2 = ellipsoid.e2();
    let p = x.hypot(y);

    let mut lat = z.atan2(p * (1.0 - e2));
    for _ in 0..MAX_ITERATIONS {
        let sin_lat = lat.sin();
        let nu = ellipsoid.a / (1.0 - e2 * sin_lat * sin_lat).sqrt();
        let next = (z + e2 * nu * sin_lat).atan2(p);
        if (next - lat).abs() < 1e-12 {
            lat = next;
            break;
        }
        lat = next;
    }

    (lat, y.atan2(x))
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn ordnance_survey_worked_example() {
        // Caister water tower, from the OS guide to coordinate systems.
        let (lat, lon) = grid_to_osgb36(651_409.903, 313_177.270);
        let expected_lat = 52.0 + 39.0 / 60.0 + 27.2531 / 3600.0;
        let expected_lon = 1.0 + 43.0 / 60.0 + 4.5177 / 3600.0;

        assert!((lat.to_degrees() - expected_lat).abs() < 1e-7);
        assert!((lon.to_degrees() - expected_lon).abs() < 1e-7);
    }

    #[test]
    fn grid_origin_lands_south_west_of_scilly() {
        // Rows with a zero grid reference project here.
        let p = bng_to_wgs84(0.0, 0.0);
        assert!((p.lon - -7.557_159_842).abs() < 1e-6, "{p:?}");
        assert!((p.lat - 49.766_807_232).abs() < 1e-6, "{p:?}");
    }

    #[test]
    fn central_london() {
        let p = bng_to_wgs84(530_000.0, 180_000.0);
        assert!((p.lon - -0.128_354).abs() < 1e-5, "{p:?}");
        assert!((p.lat - 51.503_991).abs() < 1e-5, "{p:?}");
    }

    #[test]
    fn non_finite_input_is_missing() {
        assert!(!bng_to_wgs84(f64::NAN, 180_000.0).is_finite());
        assert!(!bng_to_wgs84(530_000.0, f64::INFINITY).is_finite());
    }

    #[test]
    fn cartesian_round_trip_on_one_ellipsoid() {
        let lat = 51.5_f64.to_radians();
        let lon = (-0.1_f64).to_radians();
        let (lat2, lon2) = from_cartesian(to_cartesian(lat, lon, WGS84), WGS84);
        assert!((lat - lat2).abs() < 1e-11);
        assert!((lon - lon2).abs() < 1e-11);
    }

    proptest! {
        #[test]
        fn grid_maps_into_the_british_isles(
            easting in 0.0..700_000.0f64,
            northing in 0.0..1_250_000.0f64,
        ) {
            let p = bng_to_wgs84(easting, northing);
            prop_assert!(p.is_finite());
            prop_assert!((-12.0..5.0).contains(&p.lon), "{p:?}");
            prop_assert!((48.0..62.0).contains(&p.lat), "{p:?}");
        }

        #[test]
        fn moving_north_increases_latitude(
            easting in 100_000.0..600_000.0f64,
            northing in 0.0..1_200_000.0f64,
        ) {
            let south = bng_to_wgs84(easting, northing);
            let north = bng_to_wgs84(easting, northing + 1_000.0);
            prop_assert!(north.lat > south.lat);
        }
    }
}
