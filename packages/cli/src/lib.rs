#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Casualty to traffic count linkage pipeline.
//!
//! Loads the AADF count points and the road safety casualty tables, links
//! every casualty to the nearest count points on its road, and writes the
//! result to `Casualties.csv`. The `traffic_link` binary drives the
//! [`pipeline`] from clap subcommands or from the [`interactive`] prompts.

pub mod config;
pub mod export;
pub mod interactive;
pub mod pipeline;

pub use config::{ConfigError, PipelineConfig};
pub use pipeline::{PipelineError, PipelineOutput};
