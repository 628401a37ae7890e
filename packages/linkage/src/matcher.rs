//! Station group selection and nearest-station lookup for one target.

use traffic_link_linkage_models::{Assignment, MatchResult, UnmatchedReason};
use traffic_link_road_models::TargetPoint;
use traffic_link_spatial::StationCatalog;

/// Matches targets against a built catalog.
///
/// Identity strictly dominates class: a target whose road has a station
/// group is always matched on that road, however close the stations of its
/// class group may be.
#[derive(Clone, Copy)]
pub struct Matcher<'a> {
    catalog: &'a StationCatalog,
}

impl<'a> Matcher<'a> {
    #[must_use]
    pub const fn new(catalog: &'a StationCatalog) -> Self {
        Self { catalog }
    }

    /// Finds the two nearest stations for `target`, falling back from road
    /// identity to road class to unmatched.
    #[must_use]
    pub fn match_target(&self, target: &TargetPoint) -> MatchResult {
        MatchResult {
            id: target.id.clone(),
            road_identity: target.road_identity.clone(),
            road_class: target.road_class,
            assignment: self.assign(target),
        }
    }

    fn assign(&self, target: &TargetPoint) -> Assignment {
        if !target.position.is_finite() {
            log::debug!("Target {} has no valid position", target.id);
            return Assignment::Unmatched {
                reason: UnmatchedReason::InvalidPosition,
            };
        }

        // Group keys are trimmed when the catalog is built.
        let road_identity = target.road_identity.trim();
        if let Some(nearest) = self
            .catalog
            .identity_group(road_identity)
            .and_then(|group| group.nearest_two(target.position))
        {
            return Assignment::ByIdentity {
                road_identity: road_identity.to_string(),
                nearest,
            };
        }

        if let Some(nearest) = self
            .catalog
            .class_group(target.road_class)
            .and_then(|group| group.nearest_two(target.position))
        {
            return Assignment::ByClass {
                road_class: target.road_class,
                nearest,
            };
        }

        log::trace!(
            "No station group for target {} (road {}, class {})",
            target.id,
            target.road_identity,
            target.road_class
        );
        Assignment::Unmatched {
            reason: UnmatchedReason::NoStationGroup,
        }
    }
}

#[cfg(test)]
mod tests {
    use traffic_link_linkage_models::AssignmentKind;
    use traffic_link_road_models::{CountStation, Position, RoadClass, VolumeMeasurements};
    use traffic_link_spatial::CatalogConfig;

    use super::*;

    fn station(road: &str, lon: f64, lat: f64) -> CountStation {
        CountStation {
            count_point: None,
            road_identity: road.to_string(),
            road_class: RoadClass::from_road_name(road).unwrap(),
            position: Position::new(lon, lat),
            volumes: VolumeMeasurements::default(),
        }
    }

    fn target(road: &str, class: RoadClass, lon: f64, lat: f64) -> TargetPoint {
        TargetPoint {
            id: "201501BS70001".to_string(),
            road_identity: road.to_string(),
            road_class: class,
            position: Position::new(lon, lat),
        }
    }

    fn catalog() -> StationCatalog {
        StationCatalog::build(
            vec![
                station("A10", 0.0, 0.0),
                station("A10", 2.0, 0.0),
                station("A20", 1.0, 0.1),
                station("B300", 7.0, 7.0),
            ],
            &CatalogConfig::default(),
        )
    }

    #[test]
    fn matches_by_identity_when_road_has_stations() {
        let catalog = catalog();
        let result = Matcher::new(&catalog).match_target(&target("A10", RoadClass::A, 1.0, 0.0));

        assert_eq!(result.kind(), AssignmentKind::ByIdentity);
        assert_eq!(result.matched_group_key(), Some("A10"));
        assert!((result.distance_1() - 1.0).abs() < 1e-12);
        assert!((result.distance_2() - 1.0).abs() < 1e-12);
        assert!(result.station_index_1().is_some());
        assert!(result.station_index_2().is_some());
    }

    #[test]
    fn identity_dominates_closer_class_stations() {
        let catalog = catalog();
        // A20's station at (1.0, 0.1) is far closer than either A10 station,
        // but the target is on A10.
        let result = Matcher::new(&catalog).match_target(&target("A10", RoadClass::A, 1.0, 0.1));
        assert_eq!(result.kind(), AssignmentKind::ByIdentity);
        assert!(result.distance_1() > 0.5);
    }

    #[test]
    fn padded_road_identity_still_matches_its_group() {
        let catalog = catalog();
        let result =
            Matcher::new(&catalog).match_target(&target(" A10 ", RoadClass::A, 1.0, 0.1));

        assert_eq!(result.kind(), AssignmentKind::ByIdentity);
        assert_eq!(result.matched_group_key(), Some("A10"));
    }

    #[test]
    fn falls_back_to_class() {
        let catalog = catalog();
        let result = Matcher::new(&catalog).match_target(&target("A99", RoadClass::A, 1.0, 0.1));

        assert_eq!(result.kind(), AssignmentKind::ByClass);
        assert_eq!(result.matched_road_class(), Some(RoadClass::A));
        assert!(result.distance_1() < 1e-12);
        assert!(result.distance_1() <= result.distance_2());
    }

    #[test]
    fn unmatched_without_any_group() {
        let catalog = catalog();
        let result = Matcher::new(&catalog).match_target(&target(
            "Z99",
            RoadClass::Unclassified,
            0.0,
            0.0,
        ));
        assert_eq!(result.kind(), AssignmentKind::Unmatched);
        assert_eq!(result.unmatched_reason(), Some(UnmatchedReason::NoStationGroup));
        assert!(result.distance_1().is_nan());
        assert!(result.distance_2().is_nan());
        assert_eq!(result.station_index_1(), None);
    }

    #[test]
    fn invalid_position_is_unmatched_with_reason() {
        let catalog = catalog();
        let result =
            Matcher::new(&catalog).match_target(&target("A10", RoadClass::A, f64::NAN, 51.0));
        assert_eq!(result.kind(), AssignmentKind::Unmatched);
        assert_eq!(result.unmatched_reason(), Some(UnmatchedReason::InvalidPosition));
    }

    #[test]
    fn single_station_class_group() {
        let catalog = catalog();
        let result = Matcher::new(&catalog).match_target(&target("B1", RoadClass::B, 0.0, 0.0));
        assert_eq!(result.kind(), AssignmentKind::ByClass);
        assert_eq!(result.station_index_1(), Some(0));
        assert!(result.distance_2().is_nan());
        assert_eq!(result.station_index_2(), None);
    }

    #[test]
    fn matching_is_repeatable() {
        let catalog = catalog();
        let matcher = Matcher::new(&catalog);
        let t = target("A10", RoadClass::A, 0.3, 0.2);
        assert_eq!(matcher.match_target(&t), matcher.match_target(&t));
    }
}
