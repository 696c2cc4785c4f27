use super::{
    evaluator::{EvaluatorConfig, PoolConfig},
    evolution::EvolutionConfig,
    output::OutputConfig,
    refinement::RefinementConfig,
    traits::ConfigSection,
};
use crate::error::EvolveError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, RwLock};

/// Prefix for environment overrides, e.g. `IMFIT_EVOLVE__POOL__WORKERS=16`
pub const ENV_PREFIX: &str = "IMFIT_EVOLVE";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub pool: PoolConfig,
    pub evaluator: EvaluatorConfig,
    pub evolution: EvolutionConfig,
    pub refinement: RefinementConfig,
    pub output: OutputConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), EvolveError> {
        self.pool.validate()?;
        self.evaluator.validate()?;
        self.evolution.validate()?;
        self.refinement.validate()?;
        self.output.validate()?;
        Ok(())
    }
}

fn poisoned() -> EvolveError {
    EvolveError::Configuration("Configuration lock poisoned".to_string())
}

pub struct ConfigManager {
    config: Arc<RwLock<AppConfig>>,
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigManager {
    pub fn new() -> Self {
        Self {
            config: Arc::new(RwLock::new(AppConfig::default())),
        }
    }

    /// Load a TOML file, apply environment overrides and validate.
    /// Unknown keys are rejected.
    pub fn load_from_file<P: AsRef<Path>>(&self, path: P) -> Result<(), EvolveError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(EvolveError::Configuration(format!(
                "Failed to read config: {} is not a file",
                path.display()
            )));
        }

        let settings = config::Config::builder()
            .add_source(config::File::from(path).format(config::FileFormat::Toml))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| EvolveError::Configuration(format!("Failed to parse config: {}", e)))?;

        let config: AppConfig = settings
            .try_deserialize()
            .map_err(|e| EvolveError::Configuration(format!("Failed to parse config: {}", e)))?;

        config.validate()?;

        *self.config.write().map_err(|_| poisoned())? = config;
        Ok(())
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), EvolveError> {
        let config = self.config.read().map_err(|_| poisoned())?;
        let toml_str = toml::to_string_pretty(&*config)
            .map_err(|e| EvolveError::Configuration(format!("Failed to serialize: {}", e)))?;

        std::fs::write(path, toml_str)
            .map_err(|e| EvolveError::Configuration(format!("Failed to write config: {}", e)))?;

        Ok(())
    }

    pub fn get(&self) -> Result<AppConfig, EvolveError> {
        Ok(self.config.read().map_err(|_| poisoned())?.clone())
    }

    /// Apply an in-place change and re-validate; the change is discarded if invalid
    pub fn update<F>(&self, f: F) -> Result<(), EvolveError>
    where
        F: FnOnce(&mut AppConfig),
    {
        let mut config = self.config.write().map_err(|_| poisoned())?;
        let mut updated = config.clone();
        f(&mut updated);
        updated.validate()?;
        *config = updated;
        Ok(())
    }
}
