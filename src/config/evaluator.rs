use super::traits::{invalid, ConfigSection};
use crate::error::EvolveError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Worker pool sizing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PoolConfig {
    pub workers: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self { workers: 4 }
    }
}

impl ConfigSection for PoolConfig {
    fn section_name() -> &'static str {
        "pool"
    }

    fn validate(&self) -> Result<(), EvolveError> {
        if self.workers == 0 {
            return Err(invalid(Self::section_name(), "workers must be positive"));
        }
        Ok(())
    }
}

/// How imfit and makeimage are invoked
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EvaluatorConfig {
    pub imfit: PathBuf,
    pub makeimage: PathBuf,
    /// Reference image being fitted
    pub data: PathBuf,
    pub psf: Option<PathBuf>,
    pub mask: Option<PathBuf>,
    pub noise: Option<PathBuf>,
    pub read_noise: Option<f64>,
    pub gain: Option<f64>,
    pub extra_flags: Vec<String>,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            imfit: PathBuf::from("imfit"),
            makeimage: PathBuf::from("makeimage"),
            data: PathBuf::new(),
            psf: None,
            mask: None,
            noise: None,
            read_noise: None,
            gain: None,
            extra_flags: Vec::new(),
        }
    }
}

impl ConfigSection for EvaluatorConfig {
    fn section_name() -> &'static str {
        "evaluator"
    }

    fn validate(&self) -> Result<(), EvolveError> {
        let section = Self::section_name();
        if self.data.as_os_str().is_empty() {
            return Err(invalid(section, "data image path is required"));
        }
        if self.imfit.as_os_str().is_empty() {
            return Err(invalid(section, "imfit path must not be empty"));
        }
        if let Some(gain) = self.gain {
            if gain <= 0.0 {
                return Err(invalid(section, "gain must be positive"));
            }
        }
        if let Some(read_noise) = self.read_noise {
            if read_noise < 0.0 {
                return Err(invalid(section, "read_noise must not be negative"));
            }
        }
        Ok(())
    }
}
