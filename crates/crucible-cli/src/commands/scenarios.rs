//! The `scenarios` command: lists loadable scenarios.

use std::path::PathBuf;

use anyhow::Result;
use crucible_infrastructure::TomlScenarioRepository;

pub fn execute(scenarios_dir: PathBuf) -> Result<()> {
    let repository = TomlScenarioRepository::new(scenarios_dir);
    let summaries = repository.list();

    if summaries.is_empty() {
        println!("No scenarios found.");
        return Ok(());
    }

    println!("{:<28} {:<14} TITLE", "ID", "DOMAIN");
    for summary in summaries {
        println!("{:<28} {:<14} {}", summary.id, summary.domain, summary.title);
    }

    Ok(())
}
