use crate::engines::generation::genome::Genome;
use serde::{Deserialize, Serialize};

/// Goodness-of-fit score, lower is better.
pub type Fitness = f64;

/// Fitness assigned to an evaluation that failed. Finite, so selection
/// culls the organism like any other bad fit.
pub const SENTINEL_FITNESS: Fitness = 1.0e20;

/// Fitness state of an organism
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum FitnessSlot {
    Pending,
    Resolved(Fitness),
}

impl FitnessSlot {
    pub fn value(&self) -> Option<Fitness> {
        match self {
            FitnessSlot::Pending => None,
            FitnessSlot::Resolved(value) => Some(*value),
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, FitnessSlot::Pending)
    }
}

/// One candidate solution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organism {
    pub genome: Genome,
    pub fitness: FitnessSlot,
}

impl Organism {
    pub fn new(genome: Genome) -> Self {
        Self {
            genome,
            fitness: FitnessSlot::Pending,
        }
    }

    /// Fitness used for ranking; pending organisms rank last.
    pub fn rank_fitness(&self) -> Fitness {
        self.fitness.value().unwrap_or(f64::INFINITY)
    }
}

impl PartialEq for Organism {
    fn eq(&self, other: &Self) -> bool {
        self.genome == other.genome
    }
}

/// Sort organisms ascending by fitness (best first)
pub fn sort_by_fitness(organisms: &mut [Organism]) {
    organisms.sort_by(|a, b| {
        a.rank_fitness()
            .partial_cmp(&b.rank_fitness())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationRecord {
    pub generation: usize,
    pub best_fitness: Fitness,
    pub average_fitness: Fitness,
}
