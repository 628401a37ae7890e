//! End-to-end linkage run.
//!
//! Chains load counts -> build catalog -> load casualties -> link -> export,
//! with one `indicatif` bar for the stages and one for the per-target
//! linking pass.

use std::fmt::Write as _;
use std::path::Path;
use std::time::Instant;

use traffic_link_cli_utils::{IndicatifProgress, MultiProgress};
use traffic_link_linkage::{JoinOrchestrator, LinkageError};
use traffic_link_linkage_models::LinkSummary;
use traffic_link_source::{SourceError, load_casualties, load_counts};
use traffic_link_spatial::{CatalogStats, StationCatalog};

use crate::config::PipelineConfig;
use crate::export::{self, ExportError, ExportStats};

/// Number of stages reported on the steps bar.
const STEPS: u64 = 5;

/// Errors from any stage of a run.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Reading the input data failed.
    #[error(transparent)]
    Source(#[from] SourceError),

    /// The join could not be completed.
    #[error(transparent)]
    Linkage(#[from] LinkageError),

    /// Writing `Casualties.csv` failed.
    #[error(transparent)]
    Export(#[from] ExportError),

    /// The summary file could not be written.
    #[error("Failed to write summary {path}: {source}")]
    Summary {
        /// Summary file path.
        path: String,
        /// The underlying error.
        source: std::io::Error,
    },

    /// The summary could not be encoded.
    #[error("Failed to encode summary: {0}")]
    Json(#[from] serde_json::Error),
}

/// Counters from one completed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOutput {
    /// Catalog construction counters.
    pub catalog: CatalogStats,
    /// Linkage counters.
    pub summary: LinkSummary,
    /// Export counters.
    pub export: ExportStats,
}

/// Loads the count points of the configured year and groups them.
///
/// # Errors
///
/// Returns an error if the counts archive cannot be read.
pub fn load_catalog(config: &PipelineConfig) -> Result<StationCatalog, SourceError> {
    let stations = load_counts(&config.data_dir, &config.counts_archive, config.year)?;
    Ok(StationCatalog::build(stations, &config.catalog))
}

/// Runs the whole pipeline for `config`, writing `Casualties.csv` and,
/// when `summary_path` is given, the [`LinkSummary`] as JSON.
///
/// Progress bars are added to `multi`, which must be the one registered
/// with the log bridge.
///
/// # Errors
///
/// Returns an error if any stage fails.
pub fn run(
    config: &PipelineConfig,
    multi: &MultiProgress,
    summary_path: Option<&Path>,
) -> Result<PipelineOutput, PipelineError> {
    let start = Instant::now();
    log::info!(
        "Linking {} casualties from {}",
        config.year,
        config.data_dir.display()
    );

    let steps = IndicatifProgress::steps_bar(multi, "Pipeline", STEPS);

    steps.set_message(format!("[1/{STEPS}] Loading count points"));
    let stations = load_counts(&config.data_dir, &config.counts_archive, config.year)?;
    steps.inc(1);

    steps.set_message(format!("[2/{STEPS}] Building station catalog"));
    let catalog = StationCatalog::build(stations, &config.catalog);
    steps.inc(1);

    steps.set_message(format!("[3/{STEPS}] Loading casualties"));
    let casualties = load_casualties(&config.data_dir, &config.casualties_archive, config.year)?;
    steps.inc(1);

    steps.set_message(format!("[4/{STEPS}] Linking"));
    let records = IndicatifProgress::records_bar(multi, "Linking casualties");
    let table = JoinOrchestrator::new(&catalog)
        .with_policy(config.unmatched)
        .with_progress(records)
        .run(casualties)?;
    steps.inc(1);

    steps.set_message(format!("[5/{STEPS}] Writing output"));
    let export = export::export(&table, &catalog, config)?;
    steps.inc(1);

    if let Some(path) = summary_path {
        write_summary(path, &table.summary)?;
    }

    steps.finish(format!(
        "Pipeline complete in {:.1}s",
        start.elapsed().as_secs_f64()
    ));

    Ok(PipelineOutput {
        catalog: catalog.stats().clone(),
        summary: table.summary,
        export,
    })
}

/// Writes `summary` to `path` as pretty-printed JSON.
///
/// # Errors
///
/// Returns an error if the summary cannot be encoded or written.
pub fn write_summary(path: &Path, summary: &LinkSummary) -> Result<(), PipelineError> {
    let json = serde_json::to_string_pretty(summary)?;
    std::fs::write(path, json).map_err(|e| PipelineError::Summary {
        path: path.display().to_string(),
        source: e,
    })?;
    log::info!("Wrote link summary to {}", path.display());
    Ok(())
}

/// Table of the catalog's groups, class groups first.
#[must_use]
pub fn station_report(catalog: &StationCatalog) -> String {
    let stats = catalog.stats();
    let mut out = String::new();

    let _ = writeln!(
        out,
        "{} count points, {} without a position",
        stats.stations, stats.excluded_invalid_position
    );
    let _ = writeln!(out, "{:<16} STATIONS", "GROUP");
    let _ = writeln!(out, "{}", "-".repeat(26));

    for group in catalog.class_groups().chain(catalog.identity_groups()) {
        let _ = writeln!(out, "{:<16} {}", group.key().to_string(), group.len());
    }

    out
}
