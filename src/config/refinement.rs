use super::traits::{invalid, ConfigSection};
use crate::error::EvolveError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RefinementConfig {
    pub enabled: bool,
    /// Write the refinement commands to a script instead of running them
    pub deferred: bool,
    pub candidates: usize,
    /// imfit threads per refinement job
    pub threads: usize,
    pub ftol: f64,
    pub script: PathBuf,
}

impl Default for RefinementConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            deferred: false,
            candidates: 3,
            threads: 4,
            ftol: 1e-8,
            script: PathBuf::from("refine_commands.sh"),
        }
    }
}

impl ConfigSection for RefinementConfig {
    fn section_name() -> &'static str {
        "refinement"
    }

    fn validate(&self) -> Result<(), EvolveError> {
        let section = Self::section_name();
        if self.candidates == 0 {
            return Err(invalid(section, "candidates must be positive"));
        }
        if self.threads == 0 {
            return Err(invalid(section, "threads must be positive"));
        }
        if self.ftol <= 0.0 || self.ftol >= 1.0 {
            return Err(invalid(section, "ftol must be between 0 and 1"));
        }
        Ok(())
    }
}
