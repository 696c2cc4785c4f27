use super::traits::{invalid, ConfigSection};
use crate::error::EvolveError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    /// Shared directory for temporary artifacts and results
    pub results_dir: PathBuf,
    pub generation_log: PathBuf,
    pub boundary_report: PathBuf,
    /// Render the best organism of every generation
    pub snapshots: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            results_dir: PathBuf::from("results"),
            generation_log: PathBuf::from("generations.log"),
            boundary_report: PathBuf::from("boundary_report.json"),
            snapshots: false,
        }
    }
}

impl OutputConfig {
    /// Resolve a configured path; relative paths live in the results directory
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.results_dir.join(path)
        }
    }
}

impl ConfigSection for OutputConfig {
    fn section_name() -> &'static str {
        "output"
    }

    fn validate(&self) -> Result<(), EvolveError> {
        let section = Self::section_name();
        if self.results_dir.as_os_str().is_empty() {
            return Err(invalid(section, "results_dir must not be empty"));
        }
        if self.generation_log.as_os_str().is_empty() {
            return Err(invalid(section, "generation_log must not be empty"));
        }
        Ok(())
    }
}
