//! Distance-weighted combination of matched station volumes.

use traffic_link_linkage_models::{GroupKey, InterpolatedVolume, MatchResult, Weights};
use traffic_link_road_models::{CountStation, VolumeMeasurements};
use traffic_link_spatial::StationCatalog;

use crate::LinkageError;

/// Relative weights for two stations at distances `d1 <= d2`.
///
/// Each station is weighted by the *other* station's share of the total
/// distance, so the closer station gets the larger weight:
/// `w1 = (t - d1) / ((t - d1) + (t - d2))` with `t = d1 + d2`, and
/// `w2 = 1 - w1`. When both distances are zero the target sits on both
/// stations and they are weighted equally.
#[must_use]
pub fn relative_weights(d1: f64, d2: f64) -> Weights {
    let total = d1 + d2;
    let rel1 = total - d1;
    let rel2 = total - d2;
    let denominator = rel1 + rel2;

    if denominator == 0.0 {
        return Weights {
            first: 0.5,
            second: 0.5,
            degenerate: true,
        };
    }

    let first = rel1 / denominator;
    Weights {
        first,
        second: 1.0 - first,
        degenerate: false,
    }
}

/// Turns match results into volume estimates using the catalog's station
/// measurements.
#[derive(Clone, Copy)]
pub struct Interpolator<'a> {
    catalog: &'a StationCatalog,
}

impl<'a> Interpolator<'a> {
    #[must_use]
    pub const fn new(catalog: &'a StationCatalog) -> Self {
        Self { catalog }
    }

    /// Interpolates volumes for one match.
    ///
    /// * two stations: convex combination by [`relative_weights`]
    /// * one station: that station's raw volumes
    /// * unmatched: [`InterpolatedVolume::Absent`]
    ///
    /// # Errors
    ///
    /// Returns [`LinkageError::StationNotFound`] if the match refers to a
    /// group or station index the catalog does not hold, which means the
    /// match was made against a different catalog.
    pub fn interpolate(&self, matched: &MatchResult) -> Result<InterpolatedVolume, LinkageError> {
        let (Some(key), Some(nearest)) = (matched.group_key(), matched.nearest()) else {
            return Ok(InterpolatedVolume::Absent);
        };

        let first = self.station(&key, nearest.first.index)?;

        match nearest.second {
            Some(second) if second.distance.is_finite() && nearest.first.distance.is_finite() => {
                let other = self.station(&key, second.index)?;
                let weights = relative_weights(nearest.first.distance, second.distance);
                let volumes = VolumeMeasurements::from_fn(|kind| {
                    weights.first * first.volumes.get(kind) + weights.second * other.volumes.get(kind)
                });
                Ok(InterpolatedVolume::Weighted { weights, volumes })
            }
            _ => Ok(InterpolatedVolume::Single {
                volumes: first.volumes,
            }),
        }
    }

    fn station(&self, key: &GroupKey, index: usize) -> Result<&'a CountStation, LinkageError> {
        self.catalog
            .group(key)
            .and_then(|group| group.station(index))
            .ok_or_else(|| LinkageError::StationNotFound {
                group: key.clone(),
                index,
            })
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use traffic_link_linkage_models::{Assignment, Nearest, Neighbor, UnmatchedReason};
    use traffic_link_road_models::{Position, RoadClass, TargetPoint, VolumeKind};
    use traffic_link_spatial::CatalogConfig;

    use super::*;
    use crate::Matcher;

    fn station(road: &str, lon: f64, lat: f64, volumes: VolumeMeasurements) -> CountStation {
        CountStation {
            count_point: None,
            road_identity: road.to_string(),
            road_class: RoadClass::from_road_name(road).unwrap(),
            position: Position::new(lon, lat),
            volumes,
        }
    }

    fn volumes(value: f64) -> VolumeMeasurements {
        VolumeMeasurements::from_fn(|_| value)
    }

    fn target(road: &str, class: RoadClass, lon: f64, lat: f64) -> TargetPoint {
        TargetPoint {
            id: "2015460100001".to_string(),
            road_identity: road.to_string(),
            road_class: class,
            position: Position::new(lon, lat),
        }
    }

    #[test]
    fn equal_distances_weight_equally() {
        let w = relative_weights(1.0, 1.0);
        assert!((w.first - 0.5).abs() < 1e-12);
        assert!((w.second - 0.5).abs() < 1e-12);
        assert!(!w.degenerate);
    }

    #[test]
    fn closer_station_gets_larger_weight() {
        let w = relative_weights(1.0, 3.0);
        assert!((w.first - 0.75).abs() < 1e-12);
        assert!((w.second - 0.25).abs() < 1e-12);
    }

    #[test]
    fn zero_distances_fall_back_to_half_weights() {
        let w = relative_weights(0.0, 0.0);
        assert!(w.degenerate);
        assert!((w.first - 0.5).abs() < f64::EPSILON);
        assert!((w.second - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn target_on_first_station_takes_its_values() {
        let w = relative_weights(0.0, 2.0);
        assert!((w.first - 1.0).abs() < 1e-12);
        assert!(w.second.abs() < 1e-12);
    }

    #[test]
    fn two_station_road_midpoint() {
        let low = VolumeMeasurements {
            car: 100.0,
            ..VolumeMeasurements::default()
        };
        let high = VolumeMeasurements {
            car: 300.0,
            ..VolumeMeasurements::default()
        };
        let catalog = StationCatalog::build(
            vec![station("A10", 0.0, 0.0, low), station("A10", 2.0, 0.0, high)],
            &CatalogConfig::default(),
        );

        let matched = Matcher::new(&catalog).match_target(&target("A10", RoadClass::A, 1.0, 0.0));
        assert!((matched.distance_1() - 1.0).abs() < 1e-12);
        assert!((matched.distance_2() - 1.0).abs() < 1e-12);

        let volume = Interpolator::new(&catalog).interpolate(&matched).unwrap();
        let car = volume.volumes().unwrap().car;
        assert!((car - 200.0).abs() < 1e-9, "car = {car}");
    }

    #[test]
    fn unmatched_target_has_no_volumes() {
        let catalog = StationCatalog::build(
            vec![station("A10", 0.0, 0.0, volumes(10.0))],
            &CatalogConfig::default(),
        );
        let matched = Matcher::new(&catalog).match_target(&target(
            "Z99",
            RoadClass::Unclassified,
            0.0,
            0.0,
        ));
        let volume = Interpolator::new(&catalog).interpolate(&matched).unwrap();
        assert_eq!(volume, InterpolatedVolume::Absent);
        assert!(volume.volumes().is_none());
    }

    #[test]
    fn single_class_station_passes_through() {
        let bus = VolumeMeasurements {
            bus: 50.0,
            ..VolumeMeasurements::default()
        };
        let catalog = StationCatalog::build(
            vec![station("B1234", 3.0, 3.0, bus)],
            &CatalogConfig::default(),
        );

        let matched = Matcher::new(&catalog).match_target(&target("B77", RoadClass::B, 0.0, 0.0));
        assert!(matched.distance_2().is_nan());

        let volume = Interpolator::new(&catalog).interpolate(&matched).unwrap();
        assert!(matches!(volume, InterpolatedVolume::Single { .. }));
        assert!((volume.volumes().unwrap().bus - 50.0).abs() < f64::EPSILON);
        assert!(volume.weights().is_none());
    }

    #[test]
    fn coincident_stations_use_degenerate_weights() {
        let catalog = StationCatalog::build(
            vec![
                station("M4", 1.0, 1.0, volumes(10.0)),
                station("M4", 1.0, 1.0, volumes(30.0)),
            ],
            &CatalogConfig::default(),
        );
        let matched =
            Matcher::new(&catalog).match_target(&target("M4", RoadClass::Motorway, 1.0, 1.0));
        let volume = Interpolator::new(&catalog).interpolate(&matched).unwrap();

        assert!(volume.weights().unwrap().degenerate);
        for kind in VolumeKind::all() {
            assert!((volume.volumes().unwrap().get(*kind) - 20.0).abs() < 1e-9);
        }
    }

    #[test]
    fn foreign_match_is_reported() {
        let catalog = StationCatalog::build(
            vec![station("A10", 0.0, 0.0, volumes(1.0))],
            &CatalogConfig::default(),
        );
        let matched = MatchResult {
            id: "x".to_string(),
            road_identity: "A10".to_string(),
            road_class: RoadClass::A,
            assignment: Assignment::ByIdentity {
                road_identity: "A10".to_string(),
                nearest: Nearest {
                    first: Neighbor {
                        index: 5,
                        distance: 0.1,
                    },
                    second: None,
                },
            },
        };
        let err = Interpolator::new(&catalog).interpolate(&matched).unwrap_err();
        assert!(matches!(err, LinkageError::StationNotFound { index: 5, .. }));
    }

    #[test]
    fn unmatched_result_needs_no_catalog_lookup() {
        let catalog = StationCatalog::build(Vec::new(), &CatalogConfig::default());
        let matched = MatchResult {
            id: "x".to_string(),
            road_identity: "A10".to_string(),
            road_class: RoadClass::A,
            assignment: Assignment::Unmatched {
                reason: UnmatchedReason::InvalidPosition,
            },
        };
        assert_eq!(
            Interpolator::new(&catalog).interpolate(&matched).unwrap(),
            InterpolatedVolume::Absent
        );
    }

    proptest! {
        #[test]
        fn weights_are_convex(d1 in 0.0..10.0f64, extra in 0.0..10.0f64) {
            let d2 = d1 + extra;
            let w = relative_weights(d1, d2);
            prop_assert!((w.first + w.second - 1.0).abs() < 1e-12);
            prop_assert!(w.first >= w.second - 1e-12);
            prop_assert!((0.0..=1.0).contains(&w.first));
        }

        #[test]
        fn interpolation_stays_between_station_values(
            a in (-1.0..1.0f64, -1.0..1.0f64),
            b in (-1.0..1.0f64, -1.0..1.0f64),
            query in (-1.0..1.0f64, -1.0..1.0f64),
            v1 in 0.0..50_000.0f64,
            v2 in 0.0..50_000.0f64,
        ) {
            let catalog = StationCatalog::build(
                vec![
                    station("A1", a.0, a.1, volumes(v1)),
                    station("A1", b.0, b.1, volumes(v2)),
                ],
                &CatalogConfig::default(),
            );
            let matcher = Matcher::new(&catalog);
            let interpolator = Interpolator::new(&catalog);
            let t = target("A1", RoadClass::A, query.0, query.1);

            let matched = matcher.match_target(&t);
            prop_assert!(matched.distance_1() <= matched.distance_2());

            let volume = interpolator.interpolate(&matched).unwrap();
            let (lo, hi) = (v1.min(v2), v1.max(v2));
            for kind in VolumeKind::all() {
                let v = volume.volumes().unwrap().get(*kind);
                prop_assert!(v >= lo - 1e-6 && v <= hi + 1e-6, "{v} outside [{lo}, {hi}]");
            }

            prop_assert_eq!(interpolator.interpolate(&matcher.match_target(&t)).unwrap(), volume);
        }
    }
}
