//! Interactive prompts for running the pipeline without memorizing flags.

use std::path::PathBuf;

use dialoguer::{Confirm, Input, MultiSelect, Select};
use traffic_link_cli_utils::MultiProgress;
use traffic_link_linkage_models::UnmatchedPolicy;
use traffic_link_source::decode::police_forces;

use crate::config::PipelineConfig;
use crate::pipeline;

/// Top-level actions of the interactive menu.
enum Action {
    Link,
    Stations,
    ShowConfig,
}

impl Action {
    const ALL: &[Self] = &[Self::Link, Self::Stations, Self::ShowConfig];

    #[must_use]
    const fn label(&self) -> &'static str {
        match self {
            Self::Link => "Link casualties to traffic counts",
            Self::Stations => "Show count point groups",
            Self::ShowConfig => "Show configuration",
        }
    }
}

/// Prompts for an action and runs it, starting from `config`.
///
/// # Errors
///
/// Returns an error if a prompt fails or the selected action fails.
pub fn run(config: PipelineConfig, multi: &MultiProgress) -> Result<(), Box<dyn std::error::Error>> {
    println!("Traffic Link");
    println!();

    let labels: Vec<&str> = Action::ALL.iter().map(Action::label).collect();

    let idx = Select::new()
        .with_prompt("What would you like to do?")
        .items(&labels)
        .default(0)
        .interact()?;

    match Action::ALL[idx] {
        Action::Link => {
            let config = prompt_link_config(config)?;
            let output = pipeline::run(&config, multi, None)?;
            println!(
                "Wrote {} rows to {}",
                output.export.written,
                config.output_path().display()
            );
        }
        Action::Stations => {
            let year = prompt_year(config.year)?;
            let config = PipelineConfig { year, ..config };
            let catalog = pipeline::load_catalog(&config)?;
            print!("{}", pipeline::station_report(&catalog));
        }
        Action::ShowConfig => print!("{}", config.to_toml()?),
    }

    Ok(())
}

fn prompt_year(default: i32) -> Result<i32, dialoguer::Error> {
    Input::<i32>::new()
        .with_prompt("Year")
        .default(default)
        .interact_text()
}

/// Asks for the year, data directory, agencies and unmatched policy.
fn prompt_link_config(config: PipelineConfig) -> Result<PipelineConfig, dialoguer::Error> {
    let year = prompt_year(config.year)?;

    let data_dir: String = Input::new()
        .with_prompt("Data directory")
        .default(config.data_dir.display().to_string())
        .interact_text()?;

    let forces: Vec<&str> = police_forces().collect();
    let defaults = agency_defaults(&forces, &config);
    let selected = MultiSelect::new()
        .with_prompt("Agencies to export (space=toggle, a=all, enter=confirm; none = all)")
        .items(&forces)
        .defaults(&defaults)
        .max_length(20)
        .interact()?;

    let keep = Confirm::new()
        .with_prompt("Keep casualties with no matching count points?")
        .default(config.unmatched == UnmatchedPolicy::Keep)
        .interact()?;

    Ok(PipelineConfig {
        year,
        data_dir: PathBuf::from(data_dir),
        agencies: selected.iter().map(|&i| forces[i].to_string()).collect(),
        unmatched: if keep {
            UnmatchedPolicy::Keep
        } else {
            UnmatchedPolicy::Drop
        },
        ..config
    })
}

/// Pre-selection for the agency prompt: the configured agencies, or none
/// when every agency is exported.
fn agency_defaults(forces: &[&str], config: &PipelineConfig) -> Vec<bool> {
    forces
        .iter()
        .map(|force| config.agencies.iter().any(|a| a == force))
        .collect()
}
