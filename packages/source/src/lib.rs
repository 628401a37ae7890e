#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Readers for the two published datasets the linkage runs on.
//!
//! Annual average daily flow (AADF) counts become
//! [`CountStation`](traffic_link_road_models::CountStation)s with WGS84
//! positions; the road safety accident and casualty tables become decoded
//! [`CasualtyRow`]s, one per casualty. Both datasets ship as nested zip
//! archives, which are read in memory by [`archive`].

pub mod archive;
pub mod casualties;
pub mod counts;
pub mod decode;
pub mod projection;

pub use casualties::{CasualtyRow, load_casualties};
pub use counts::load_counts;

/// Errors that can occur while reading source files.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// I/O error reading a file or archive entry.
    #[error("I/O error reading {path}: {source}")]
    Io {
        /// File or archive entry being read.
        path: String,
        /// The underlying error.
        source: std::io::Error,
    },

    /// The zip container could not be read.
    #[error("Zip error reading {path}: {source}")]
    Zip {
        /// Archive or nested archive being read.
        path: String,
        /// The underlying error.
        source: zip::result::ZipError,
    },

    /// A CSV file could not be parsed.
    #[error("CSV error in {path}: {source}")]
    Csv {
        /// File being parsed.
        path: String,
        /// The underlying error.
        source: csv::Error,
    },

    /// Neither the archive nor a plain CSV fallback holds the member.
    #[error("{name} not found in {path}")]
    MissingEntry {
        /// Archive (or directory) that was searched.
        path: String,
        /// Member that was looked for.
        name: String,
    },

    /// A CSV header lacks a required column.
    #[error("{path} has no {column} column")]
    MissingColumn {
        /// File being parsed.
        path: String,
        /// The required column.
        column: String,
    },
}
