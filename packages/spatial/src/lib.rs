#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! In-memory count station catalog for nearest-station lookups.
//!
//! Partitions count stations by road identity and by road class, builds one
//! R-tree per non-empty group, and answers "which two stations of this group
//! are closest to this point" queries. Built once per run and read-only
//! afterwards, so it can be shared freely between readers.
//!
//! Distances are planar Euclidean distances on `(longitude, latitude)`.
//! That is only an approximation of ground distance, which is acceptable for
//! ranking stations within one road or region.

use std::collections::BTreeMap;

use rstar::RTree;
use rstar::primitives::GeomWithData;
use serde::{Deserialize, Serialize};
use traffic_link_linkage_models::{GroupKey, Nearest, Neighbor};
use traffic_link_road_models::{CountStation, Position, RoadClass};

/// A station location in the R-tree, tagged with its index in the group.
type IndexedPoint = GeomWithData<[f64; 2], usize>;

/// Which groups the catalog builds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Classes that get a class group, in the order they are listed.
    #[serde(default = "default_classes")]
    pub classes: Vec<RoadClass>,
    /// Classes whose stations never form identity groups. Minor roads share
    /// a bare class letter as their "identity", so grouping them by it would
    /// just duplicate the class group.
    #[serde(default = "default_identity_excluded", rename = "identity_excluded_classes")]
    pub identity_excluded: Vec<RoadClass>,
}

fn default_classes() -> Vec<RoadClass> {
    RoadClass::all().to_vec()
}

fn default_identity_excluded() -> Vec<RoadClass> {
    vec![RoadClass::C, RoadClass::Unclassified]
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            classes: default_classes(),
            identity_excluded: default_identity_excluded(),
        }
    }
}

/// Counters collected while building the catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogStats {
    /// Stations offered to the catalog.
    pub stations: u64,
    /// Stations dropped because their position was not finite.
    pub excluded_invalid_position: u64,
    /// Non-empty identity groups.
    pub identity_groups: u64,
    /// Non-empty class groups.
    pub class_groups: u64,
}

/// The stations of one group plus their nearest-neighbour index.
pub struct StationGroup {
    key: GroupKey,
    stations: Vec<CountStation>,
    tree: RTree<IndexedPoint>,
}

impl StationGroup {
    fn new(key: GroupKey, stations: Vec<CountStation>) -> Self {
        let points = stations
            .iter()
            .enumerate()
            .map(|(index, station)| GeomWithData::new(station.position.to_array(), index))
            .collect();

        Self {
            key,
            stations,
            tree: RTree::bulk_load(points),
        }
    }

    /// Key this group is stored under.
    #[must_use]
    pub const fn key(&self) -> &GroupKey {
        &self.key
    }

    /// Number of stations in the group.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stations.len()
    }

    /// Whether the group has no stations. Never true for groups held by a
    /// built catalog.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }

    /// Station at a positional index.
    #[must_use]
    pub fn station(&self, index: usize) -> Option<&CountStation> {
        self.stations.get(index)
    }

    /// All stations in positional order.
    #[must_use]
    pub fn stations(&self) -> &[CountStation] {
        &self.stations
    }

    /// The two stations nearest to `position`, nearest first.
    ///
    /// A single-station group yields `second = None`. Stations at equal
    /// distance come back in whatever order the R-tree's nearest-neighbour
    /// iterator visits them; that order is stable for a given tree but is
    /// not defined by anything in the data.
    ///
    /// Returns `None` for an empty group or a non-finite position.
    #[must_use]
    pub fn nearest_two(&self, position: Position) -> Option<Nearest> {
        if !position.is_finite() {
            return None;
        }

        let mut iter = self
            .tree
            .nearest_neighbor_iter_with_distance_2(&position.to_array());

        let (first, first_d2) = iter.next()?;
        let second = iter.next().map(|(point, d2)| Neighbor {
            index: point.data,
            distance: d2.sqrt(),
        });

        Some(Nearest {
            first: Neighbor {
                index: first.data,
                distance: first_d2.sqrt(),
            },
            second,
        })
    }
}

/// Count stations partitioned by road identity and by road class.
pub struct StationCatalog {
    identities: BTreeMap<String, StationGroup>,
    classes: BTreeMap<RoadClass, StationGroup>,
    stats: CatalogStats,
}

impl StationCatalog {
    /// Partitions `stations` and builds an R-tree per non-empty group.
    ///
    /// Positional indexes follow input order within each group. Stations
    /// with a non-finite position are left out of every group.
    pub fn build(stations: impl IntoIterator<Item = CountStation>, config: &CatalogConfig) -> Self {
        let mut stats = CatalogStats::default();
        let mut by_identity: BTreeMap<String, Vec<CountStation>> = BTreeMap::new();
        let mut by_class: BTreeMap<RoadClass, Vec<CountStation>> = BTreeMap::new();

        for station in stations {
            stats.stations += 1;

            if !station.position.is_finite() {
                stats.excluded_invalid_position += 1;
                log::trace!(
                    "Excluding station {:?} on {}: no valid position",
                    station.count_point,
                    station.road_identity
                );
                continue;
            }

            let identity = station.road_identity.trim();
            if !identity.is_empty() && !config.identity_excluded.contains(&station.road_class) {
                by_identity
                    .entry(identity.to_string())
                    .or_default()
                    .push(station.clone());
            }

            if config.classes.contains(&station.road_class) {
                by_class.entry(station.road_class).or_default().push(station);
            }
        }

        let identities: BTreeMap<String, StationGroup> = by_identity
            .into_iter()
            .map(|(road, members)| {
                let group = StationGroup::new(GroupKey::Identity(road.clone()), members);
                (road, group)
            })
            .collect();

        let classes: BTreeMap<RoadClass, StationGroup> = by_class
            .into_iter()
            .map(|(class, members)| (class, StationGroup::new(GroupKey::Class(class), members)))
            .collect();

        stats.identity_groups = identities.len() as u64;
        stats.class_groups = classes.len() as u64;

        log::info!(
            "Built station catalog: {} stations, {} road groups, {} class groups",
            stats.stations - stats.excluded_invalid_position,
            stats.identity_groups,
            stats.class_groups
        );
        if stats.excluded_invalid_position > 0 {
            log::warn!(
                "Excluded {} stations with no valid position",
                stats.excluded_invalid_position
            );
        }

        Self {
            identities,
            classes,
            stats,
        }
    }

    /// Identity group for a road, if it has any stations.
    #[must_use]
    pub fn identity_group(&self, road_identity: &str) -> Option<&StationGroup> {
        self.identities.get(road_identity)
    }

    /// Class group, if it has any stations.
    #[must_use]
    pub fn class_group(&self, class: RoadClass) -> Option<&StationGroup> {
        self.classes.get(&class)
    }

    /// Looks up a group by key.
    #[must_use]
    pub fn group(&self, key: &GroupKey) -> Option<&StationGroup> {
        match key {
            GroupKey::Identity(road) => self.identity_group(road),
            GroupKey::Class(class) => self.class_group(*class),
        }
    }

    /// Queries a group for the two nearest stations. `None` when the group
    /// does not exist.
    #[must_use]
    pub fn nearest_two(&self, key: &GroupKey, position: Position) -> Option<Nearest> {
        self.group(key)?.nearest_two(position)
    }

    /// Identity groups in road-name order.
    pub fn identity_groups(&self) -> impl Iterator<Item = &StationGroup> {
        self.identities.values()
    }

    /// Class groups in class order.
    pub fn class_groups(&self) -> impl Iterator<Item = &StationGroup> {
        self.classes.values()
    }

    /// Build counters.
    #[must_use]
    pub const fn stats(&self) -> &CatalogStats {
        &self.stats
    }
}
