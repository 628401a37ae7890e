#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the casualty to traffic count linkage pipeline.
//!
//! With no subcommand an interactive menu is shown. Log output is routed
//! through `indicatif-log-bridge` (via
//! [`traffic_link_cli_utils::init_logger`]) so that log lines and progress
//! bars never fight for the terminal.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use traffic_link_cli::{PipelineConfig, interactive, pipeline};
use traffic_link_linkage_models::UnmatchedPolicy;

#[derive(Parser)]
#[command(
    name = "traffic_link",
    about = "Link road casualties to nearby traffic count points"
)]
struct Cli {
    /// Config file (defaults to `$TRAFFIC_LINK_CONFIG`, then `traffic_link.toml`)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Load both datasets, link every casualty and write `Casualties.csv`
    Link {
        /// Count year and casualty table year
        #[arg(long)]
        year: Option<i32>,
        /// Directory holding the source archives
        #[arg(long)]
        data_dir: Option<PathBuf>,
        /// Directory to write `Casualties.csv` to
        #[arg(long)]
        output_dir: Option<PathBuf>,
        /// Comma-separated police forces to export ("all" for every force)
        #[arg(long)]
        agencies: Option<String>,
        /// What to do with casualties no count point group covers
        #[arg(long, value_parser = parse_unmatched)]
        unmatched: Option<UnmatchedPolicy>,
        /// Also write the link summary as JSON to this path
        #[arg(long)]
        summary: Option<PathBuf>,
    },
    /// Print the count point groups for a year
    Stations {
        /// Count year
        #[arg(long)]
        year: Option<i32>,
        /// Directory holding the source archives
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
    /// Print the effective configuration as TOML
    Config,
}

fn parse_unmatched(value: &str) -> Result<UnmatchedPolicy, String> {
    value
        .trim()
        .parse()
        .map_err(|_| format!("expected `keep` or `drop`, got `{value}`"))
}

fn parse_agencies(value: &str) -> Vec<String> {
    if value.trim().eq_ignore_ascii_case("all") {
        return Vec::new();
    }
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = traffic_link_cli_utils::init_logger();
    let cli = Cli::parse();
    let mut config = PipelineConfig::load(cli.config.as_deref())?;

    let Some(command) = cli.command else {
        return interactive::run(config, &multi);
    };

    match command {
        Commands::Link {
            year,
            data_dir,
            output_dir,
            agencies,
            unmatched,
            summary,
        } => {
            if let Some(year) = year {
                config.year = year;
            }
            if let Some(dir) = data_dir {
                config.data_dir = dir;
            }
            if let Some(dir) = output_dir {
                config.output_dir = dir;
            }
            if let Some(agencies) = agencies {
                config.agencies = parse_agencies(&agencies);
            }
            if let Some(unmatched) = unmatched {
                config.unmatched = unmatched;
            }

            let output = pipeline::run(&config, &multi, summary.as_deref())?;
            log::info!(
                "{} casualties linked: {} by road, {} by class, {} unmatched",
                output.summary.rows,
                output.summary.by_identity,
                output.summary.by_class,
                output.summary.unmatched()
            );
        }
        Commands::Stations { year, data_dir } => {
            if let Some(year) = year {
                config.year = year;
            }
            if let Some(dir) = data_dir {
                config.data_dir = dir;
            }
            let catalog = pipeline::load_catalog(&config)?;
            print!("{}", pipeline::station_report(&catalog));
        }
        Commands::Config => print!("{}", config.to_toml()?),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn unmatched_flag_parses_into_policy() {
        let cli = Cli::try_parse_from(["traffic_link", "link", "--unmatched", "drop"]).unwrap();
        let Some(Commands::Link { unmatched, .. }) = cli.command else {
            panic!("expected the link subcommand");
        };
        assert_eq!(unmatched, Some(UnmatchedPolicy::Drop));
    }

    #[test]
    fn unknown_unmatched_value_is_rejected() {
        assert!(parse_unmatched("discard").is_err());
        assert!(Cli::try_parse_from(["traffic_link", "link", "--unmatched", "discard"]).is_err());
        assert_eq!(parse_unmatched("keep"), Ok(UnmatchedPolicy::Keep));
    }

    #[test]
    fn agencies_list_is_trimmed_and_all_means_every_force() {
        assert_eq!(
            parse_agencies(" Kent, ,Surrey "),
            vec!["Kent".to_string(), "Surrey".to_string()]
        );
        assert!(parse_agencies("ALL").is_empty());
    }
}
