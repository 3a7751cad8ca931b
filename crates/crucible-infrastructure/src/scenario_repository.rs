//! Scenario repository.
//!
//! Scenarios are TOML files in a directory, one per file, named `<id>.toml`.
//! A built-in default scenario is compiled into the binary so a session can
//! always start even with no scenario directory at all.

use crucible_core::error::{CrucibleError, Result};
use crucible_core::scenario::Scenario;
use std::fs;
use std::path::PathBuf;

/// Identifier of the compiled-in fallback scenario.
pub const DEFAULT_SCENARIO_ID: &str = "devops-redis-latency";

const DEFAULT_SCENARIO_TOML: &str = include_str!("default_scenario.toml");

/// A lightweight row for scenario listings.
#[derive(Debug, Clone)]
pub struct ScenarioSummary {
    pub id: String,
    pub title: String,
    pub domain: String,
}

/// Loads scenarios from a directory of TOML files.
pub struct TomlScenarioRepository {
    dir: Option<PathBuf>,
}

impl TomlScenarioRepository {
    /// Creates a repository over the given directory.
    pub fn new(dir: PathBuf) -> Self {
        Self { dir: Some(dir) }
    }

    /// Creates a repository that only serves the embedded default.
    pub fn embedded_only() -> Self {
        Self { dir: None }
    }

    /// Parses the compiled-in default scenario.
    pub fn embedded_default() -> Result<Scenario> {
        Ok(toml::from_str(DEFAULT_SCENARIO_TOML)?)
    }

    /// Loads a scenario by id.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no file for the id exists and the id is not the
    /// embedded default.
    pub fn get(&self, id: &str) -> Result<Scenario> {
        if let Some(dir) = &self.dir {
            let path = dir.join(format!("{id}.toml"));
            if path.exists() {
                let content = fs::read_to_string(&path)?;
                let scenario: Scenario = toml::from_str(&content)?;
                return Ok(scenario);
            }
        }

        if id == DEFAULT_SCENARIO_ID {
            return Self::embedded_default();
        }

        Err(CrucibleError::not_found("scenario", id))
    }

    /// Loads a scenario by id, falling back to the embedded default when the
    /// id is unknown.
    pub fn get_or_default(&self, id: &str) -> Result<Scenario> {
        match self.get(id) {
            Ok(scenario) => Ok(scenario),
            Err(err) if err.is_not_found() => {
                tracing::warn!(
                    "scenario '{}' not found, falling back to '{}'",
                    id,
                    DEFAULT_SCENARIO_ID
                );
                Self::embedded_default()
            }
            Err(err) => Err(err),
        }
    }

    /// Lists all loadable scenarios (directory files plus the embedded
    /// default). Unparseable files are skipped with a warning.
    pub fn list(&self) -> Vec<ScenarioSummary> {
        let mut summaries = Vec::new();

        if let Some(dir) = &self.dir {
            if let Ok(entries) = fs::read_dir(dir) {
                for entry in entries.flatten() {
                    let path = entry.path();
                    if path.extension().and_then(|e| e.to_str()) != Some("toml") {
                        continue;
                    }
                    match fs::read_to_string(&path)
                        .map_err(CrucibleError::from)
                        .and_then(|content| Ok(toml::from_str::<Scenario>(&content)?))
                    {
                        Ok(scenario) => summaries.push(ScenarioSummary {
                            id: scenario.id,
                            title: scenario.title,
                            domain: scenario.domain,
                        }),
                        Err(err) => {
                            tracing::warn!("skipping unparseable scenario {:?}: {}", path, err);
                        }
                    }
                }
            }
        }

        if !summaries.iter().any(|s| s.id == DEFAULT_SCENARIO_ID) {
            if let Ok(scenario) = Self::embedded_default() {
                summaries.push(ScenarioSummary {
                    id: scenario.id,
                    title: scenario.title,
                    domain: scenario.domain,
                });
            }
        }

        summaries
    }
}
