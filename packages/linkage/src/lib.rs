#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Links casualty locations to nearby traffic count stations.
//!
//! For every distinct casualty location the [`Matcher`] picks the station
//! group (same road, else same road class, else none) and the two nearest
//! stations in it; the [`Interpolator`] turns those into one
//! distance-weighted volume estimate; the [`JoinOrchestrator`] runs both
//! over a table of rows and joins the results back by target id.
//!
//! The pass is a pure, synchronous computation over a read-only
//! [`StationCatalog`](traffic_link_spatial::StationCatalog).

pub mod interpolate;
pub mod join;
pub mod matcher;

pub use interpolate::{Interpolator, relative_weights};
pub use join::{AsTarget, JoinOrchestrator, LinkedRow, LinkedTable};
pub use matcher::Matcher;

use traffic_link_linkage_models::GroupKey;

/// Batch-level consistency failures.
///
/// Per-record problems (no station group, zero distances, bad positions)
/// are never errors; they are encoded in the match and interpolation
/// results.
#[derive(Debug, thiserror::Error)]
pub enum LinkageError {
    /// Distinct targets share an id, or the number of link records after
    /// the join differs from the number of distinct targets kept.
    #[error("Join cardinality check failed: expected {expected} link records, found {actual}")]
    JoinCardinality {
        /// Distinct targets, less dropped ones when ids are unique.
        expected: u64,
        /// Distinct ids on collision, otherwise link records produced.
        actual: u64,
    },

    /// A match referenced a station that its group does not hold.
    #[error("Station {index} not found in {group}")]
    StationNotFound {
        /// Group the match was made against.
        group: GroupKey,
        /// Positional index that was looked up.
        index: usize,
    },
}
