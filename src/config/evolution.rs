use super::traits::{invalid, ConfigSection};
use crate::error::EvolveError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EvolutionConfig {
    /// Size of generation 0
    pub initial_population: usize,
    /// Best organisms carried over unchanged
    pub survivors: usize,
    /// Offspring bred per generation
    pub children: usize,
    /// Fresh random organisms per generation
    pub immigrants: usize,
    pub tournament_size: usize,
    /// Per-gene mutation probability
    pub mutation_rate: f64,
    /// Largest mutation step as a fraction of the gene's range
    pub mutation_amount: f64,
    pub tolerance: f64,
    pub convergence_window: usize,
    pub max_generations: usize,
    pub seed: Option<u64>,
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            initial_population: 100,
            survivors: 20,
            children: 60,
            immigrants: 20,
            tournament_size: 3,
            mutation_rate: 0.1,
            mutation_amount: 0.1,
            tolerance: 1e-3,
            convergence_window: 10,
            max_generations: 200,
            seed: None,
        }
    }
}

impl EvolutionConfig {
    pub fn generation_size(&self) -> usize {
        self.survivors + self.children + self.immigrants
    }
}

impl ConfigSection for EvolutionConfig {
    fn section_name() -> &'static str {
        "evolution"
    }

    fn validate(&self) -> Result<(), EvolveError> {
        let section = Self::section_name();
        if self.initial_population == 0 {
            return Err(invalid(section, "initial_population must be positive"));
        }
        if self.survivors == 0 {
            return Err(invalid(section, "survivors must be at least 1 so the best organism is kept"));
        }
        if self.children + self.immigrants == 0 {
            return Err(invalid(section, "children + immigrants must be positive"));
        }
        if self.tournament_size == 0 {
            return Err(invalid(section, "tournament_size must be positive"));
        }
        if !(0.0..=1.0).contains(&self.mutation_rate) {
            return Err(invalid(section, "mutation_rate must be between 0 and 1"));
        }
        if self.mutation_amount <= 0.0 {
            return Err(invalid(section, "mutation_amount must be positive"));
        }
        if self.tolerance <= 0.0 {
            return Err(invalid(section, "tolerance must be positive"));
        }
        if self.convergence_window < 2 {
            return Err(invalid(section, "convergence_window must be at least 2"));
        }
        if self.max_generations == 0 {
            return Err(invalid(section, "max_generations must be positive"));
        }
        Ok(())
    }
}
