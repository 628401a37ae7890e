//! Runs matching and interpolation over a table and joins results back.
//!
//! Casualty tables hold one row per casualty, so the same accident location
//! shows up many times. Rows are reduced to distinct targets before any
//! index query, each distinct target is matched and interpolated once, and
//! the resulting link records are left-joined onto every original row by
//! target id.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use traffic_link_linkage_models::progress::{ProgressCallback, null_progress};
use traffic_link_linkage_models::{
    AssignmentKind, InterpolatedVolume, LinkRecord, LinkSummary, UnmatchedPolicy, UnmatchedReason,
};
pub use traffic_link_road_models::AsTarget;
use traffic_link_road_models::{RoadClass, TargetPoint};
use traffic_link_spatial::StationCatalog;

use crate::{Interpolator, LinkageError, Matcher};

/// Progress is reported in batches of this many distinct targets.
const PROGRESS_BATCH: u64 = 1_000;

/// An input row with the link record joined onto it.
#[derive(Debug, Clone)]
pub struct LinkedRow<R> {
    /// The input row.
    pub row: R,
    /// Link record for the row's target id; `None` when its target was
    /// unmatched and the policy dropped it.
    pub link: Option<Arc<LinkRecord>>,
}

/// Output of a join: every input row, in input order, plus run counters.
#[derive(Debug, Clone)]
pub struct LinkedTable<R> {
    /// Joined rows.
    pub rows: Vec<LinkedRow<R>>,
    /// What happened during the run.
    pub summary: LinkSummary,
}

/// De-duplication key: road identity, id, road class and exact position.
#[derive(PartialEq, Eq, Hash)]
struct TargetKey {
    road_identity: String,
    id: String,
    road_class: RoadClass,
    lon_bits: u64,
    lat_bits: u64,
}

impl From<&TargetPoint> for TargetKey {
    fn from(target: &TargetPoint) -> Self {
        Self {
            road_identity: target.road_identity.clone(),
            id: target.id.clone(),
            road_class: target.road_class,
            lon_bits: target.position.lon.to_bits(),
            lat_bits: target.position.lat.to_bits(),
        }
    }
}

/// Drives one match and one interpolation per distinct target.
pub struct JoinOrchestrator<'a> {
    catalog: &'a StationCatalog,
    policy: UnmatchedPolicy,
    progress: Arc<dyn ProgressCallback>,
}

impl<'a> JoinOrchestrator<'a> {
    #[must_use]
    pub fn new(catalog: &'a StationCatalog) -> Self {
        Self {
            catalog,
            policy: UnmatchedPolicy::default(),
            progress: null_progress(),
        }
    }

    /// Sets what happens to unmatched targets.
    #[must_use]
    pub const fn with_policy(mut self, policy: UnmatchedPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Reports per-target progress to `progress`.
    #[must_use]
    pub fn with_progress(mut self, progress: Arc<dyn ProgressCallback>) -> Self {
        self.progress = progress;
        self
    }

    /// Matches, interpolates and joins `rows`.
    ///
    /// # Errors
    ///
    /// * [`LinkageError::JoinCardinality`] if two distinct targets share an
    ///   id (whether or not either was dropped), or if the link records do
    ///   not line up one-to-one with the distinct targets that were kept.
    /// * [`LinkageError::StationNotFound`] if the catalog cannot resolve a
    ///   station it returned from a query.
    pub fn run<R: AsTarget>(&self, rows: Vec<R>) -> Result<LinkedTable<R>, LinkageError> {
        let start = Instant::now();
        let mut summary = LinkSummary {
            rows: rows.len() as u64,
            ..LinkSummary::default()
        };

        let targets: Vec<TargetPoint> = rows.iter().map(AsTarget::target_point).collect();
        let distinct = distinct_targets(&targets);
        summary.distinct_targets = distinct.len() as u64;

        log::info!(
            "Linking {} rows ({} distinct targets)",
            summary.rows,
            summary.distinct_targets
        );

        let matcher = Matcher::new(self.catalog);
        let interpolator = Interpolator::new(self.catalog);
        let mut links: HashMap<TargetKey, Arc<LinkRecord>> =
            HashMap::with_capacity(distinct.len());
        let mut seen_ids: HashSet<String> = HashSet::with_capacity(distinct.len());
        let mut collisions = 0u64;

        self.progress.set_total(summary.distinct_targets);
        self.progress.set_message("Matching targets".to_string());

        for (i, target) in distinct.iter().enumerate() {
            if !seen_ids.insert(target.id.clone()) {
                collisions += 1;
                log::warn!("Target id {} appears at more than one location", target.id);
            }

            let matched = matcher.match_target(target);
            let volume = interpolator.interpolate(&matched)?;
            record(&mut summary, matched.kind(), matched.unmatched_reason(), &volume);

            let processed = i as u64 + 1;
            if processed.is_multiple_of(PROGRESS_BATCH) {
                self.progress.inc(PROGRESS_BATCH);
            }

            if matched.kind() == AssignmentKind::Unmatched && self.policy == UnmatchedPolicy::Drop {
                summary.dropped += 1;
                continue;
            }

            links.insert(
                TargetKey::from(target),
                Arc::new(LinkRecord { matched, volume }),
            );
        }

        self.progress.inc(summary.distinct_targets % PROGRESS_BATCH);
        self.progress.finish(format!(
            "Matched {} targets in {:.1}s",
            summary.distinct_targets,
            start.elapsed().as_secs_f64()
        ));

        // Dropped targets still claim their id.
        if collisions > 0 {
            log::error!("{collisions} target id collision(s) during join");
            return Err(LinkageError::JoinCardinality {
                expected: summary.distinct_targets,
                actual: seen_ids.len() as u64,
            });
        }

        summary.linked = links.len() as u64;
        let expected = summary.distinct_targets - summary.dropped;
        if summary.linked != expected {
            return Err(LinkageError::JoinCardinality {
                expected,
                actual: summary.linked,
            });
        }

        let rows: Vec<LinkedRow<R>> = rows
            .into_iter()
            .zip(targets)
            .map(|(row, target)| LinkedRow {
                link: links.get(&TargetKey::from(&target)).cloned(),
                row,
            })
            .collect();

        log::info!(
            "Linked {} targets: {} by road, {} by class, {} unmatched ({} dropped) in {:.1}s",
            summary.linked,
            summary.by_identity,
            summary.by_class,
            summary.unmatched(),
            summary.dropped,
            start.elapsed().as_secs_f64()
        );

        Ok(LinkedTable { rows, summary })
    }
}

/// First occurrence of every distinct target, in input order.
fn distinct_targets(targets: &[TargetPoint]) -> Vec<TargetPoint> {
    let mut seen: HashSet<TargetKey> = HashSet::with_capacity(targets.len());
    targets
        .iter()
        .filter(|target| seen.insert(TargetKey::from(*target)))
        .cloned()
        .collect()
}

fn record(
    summary: &mut LinkSummary,
    kind: AssignmentKind,
    reason: Option<UnmatchedReason>,
    volume: &InterpolatedVolume,
) {
    match kind {
        AssignmentKind::ByIdentity => summary.by_identity += 1,
        AssignmentKind::ByClass => summary.by_class += 1,
        AssignmentKind::Unmatched => match reason {
            Some(UnmatchedReason::InvalidPosition) => summary.unmatched_invalid_position += 1,
            _ => summary.unmatched_no_group += 1,
        },
    }

    match volume {
        InterpolatedVolume::Weighted { weights, .. } if weights.degenerate => {
            summary.degenerate_weights += 1;
        }
        InterpolatedVolume::Single { .. } => summary.single_station += 1,
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use traffic_link_road_models::{CountStation, Position, VolumeMeasurements};
    use traffic_link_spatial::CatalogConfig;

    use super::*;

    /// A casualty row: several casualties share one accident.
    #[derive(Debug, Clone)]
    struct Casualty {
        casualty: u32,
        target: TargetPoint,
    }

    impl AsTarget for Casualty {
        fn target_point(&self) -> TargetPoint {
            self.target.clone()
        }
    }

    fn station(road: &str, lon: f64, lat: f64, car: f64) -> CountStation {
        CountStation {
            count_point: None,
            road_identity: road.to_string(),
            road_class: RoadClass::from_road_name(road).unwrap(),
            position: Position::new(lon, lat),
            volumes: VolumeMeasurements {
                car,
                ..VolumeMeasurements::default()
            },
        }
    }

    fn target(id: &str, road: &str, class: RoadClass, lon: f64, lat: f64) -> TargetPoint {
        TargetPoint {
            id: id.to_string(),
            road_identity: road.to_string(),
            road_class: class,
            position: Position::new(lon, lat),
        }
    }

    fn catalog() -> StationCatalog {
        StationCatalog::build(
            vec![
                station("A10", 0.0, 0.0, 100.0),
                station("A10", 2.0, 0.0, 300.0),
                station("B1", 5.0, 5.0, 40.0),
            ],
            &CatalogConfig::default(),
        )
    }

    fn casualties() -> Vec<Casualty> {
        let on_a10 = target("acc-1", "A10", RoadClass::A, 1.0, 0.0);
        let on_b = target("acc-2", "B99", RoadClass::B, 4.0, 4.0);
        let nowhere = target("acc-3", "Z99", RoadClass::Unclassified, 0.0, 0.0);
        vec![
            Casualty {
                casualty: 1,
                target: on_a10.clone(),
            },
            Casualty {
                casualty: 2,
                target: on_a10,
            },
            Casualty {
                casualty: 1,
                target: on_b,
            },
            Casualty {
                casualty: 1,
                target: nowhere,
            },
        ]
    }

    #[test]
    fn matches_each_distinct_target_once_and_joins_every_row() {
        let catalog = catalog();
        let table = JoinOrchestrator::new(&catalog).run(casualties()).unwrap();

        assert_eq!(table.summary.rows, 4);
        assert_eq!(table.summary.distinct_targets, 3);
        assert_eq!(table.summary.by_identity, 1);
        assert_eq!(table.summary.by_class, 1);
        assert_eq!(table.summary.unmatched_no_group, 1);
        assert_eq!(table.summary.single_station, 1);
        assert_eq!(table.summary.linked, 3);
        assert_eq!(table.rows.len(), 4);

        let first = table.rows[0].link.as_ref().unwrap();
        let second = table.rows[1].link.as_ref().unwrap();
        assert!(Arc::ptr_eq(first, second));
        assert_eq!(table.rows[1].row.casualty, 2);
        assert!((first.volume.volumes().unwrap().car - 200.0).abs() < 1e-9);

        let b = table.rows[2].link.as_ref().unwrap();
        assert_eq!(b.matched.kind(), AssignmentKind::ByClass);
        assert!((b.volume.volumes().unwrap().car - 40.0).abs() < f64::EPSILON);

        let none = table.rows[3].link.as_ref().unwrap();
        assert_eq!(none.matched.kind(), AssignmentKind::Unmatched);
        assert_eq!(none.volume, InterpolatedVolume::Absent);
    }

    #[test]
    fn drop_policy_leaves_unmatched_rows_unlinked() {
        let catalog = catalog();
        let table = JoinOrchestrator::new(&catalog)
            .with_policy(UnmatchedPolicy::Drop)
            .run(casualties())
            .unwrap();

        assert_eq!(table.summary.dropped, 1);
        assert_eq!(table.summary.linked, 2);
        assert_eq!(table.rows.len(), 4);
        assert!(table.rows[3].link.is_none());
    }

    #[test]
    fn same_id_at_two_locations_fails_cardinality_check() {
        let catalog = catalog();
        let rows = vec![
            target("acc-1", "A10", RoadClass::A, 1.0, 0.0),
            target("acc-1", "A10", RoadClass::A, 1.5, 0.0),
        ];
        let err = JoinOrchestrator::new(&catalog).run(rows).unwrap_err();
        assert!(matches!(
            err,
            LinkageError::JoinCardinality {
                expected: 2,
                actual: 1
            }
        ));
    }

    #[test]
    fn dropped_target_sharing_an_id_fails_cardinality_check() {
        let catalog = catalog();
        let rows = vec![
            target("acc-1", "A10", RoadClass::A, 1.0, 0.0),
            target("acc-1", "A10", RoadClass::A, f64::NAN, f64::NAN),
        ];
        let err = JoinOrchestrator::new(&catalog)
            .with_policy(UnmatchedPolicy::Drop)
            .run(rows)
            .unwrap_err();
        assert!(matches!(
            err,
            LinkageError::JoinCardinality {
                expected: 2,
                actual: 1
            }
        ));
    }

    #[test]
    fn invalid_positions_are_counted_not_fatal() {
        let catalog = catalog();
        let rows = vec![
            target("acc-1", "A10", RoadClass::A, f64::NAN, f64::NAN),
            target("acc-2", "A10", RoadClass::A, 0.5, 0.0),
        ];
        let table = JoinOrchestrator::new(&catalog).run(rows).unwrap();
        assert_eq!(table.summary.unmatched_invalid_position, 1);
        assert_eq!(table.summary.by_identity, 1);
        assert_eq!(
            table.rows[0].link.as_ref().unwrap().matched.unmatched_reason(),
            Some(UnmatchedReason::InvalidPosition)
        );
    }

    #[test]
    fn repeated_runs_are_identical() {
        let catalog = catalog();
        let orchestrator = JoinOrchestrator::new(&catalog);
        let a = orchestrator.run(casualties()).unwrap();
        let b = orchestrator.run(casualties()).unwrap();
        assert_eq!(a.summary, b.summary);
        for (x, y) in a.rows.iter().zip(&b.rows) {
            assert_eq!(x.link, y.link);
        }
    }

    #[test]
    fn empty_input_is_fine() {
        let catalog = catalog();
        let table = JoinOrchestrator::new(&catalog)
            .run(Vec::<TargetPoint>::new())
            .unwrap();
        assert!(table.rows.is_empty());
        assert_eq!(table.summary, LinkSummary::default());
    }
}
