use crate::config::EvolutionConfig;
use crate::engines::generation::genome::{self, GeneDescriptor};
use crate::engines::generation::operators::{crossover, mutate, random_genome, tournament_selection};
use crate::model::Model;
use crate::types::{sort_by_fitness, Organism};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Breeding collaborator driven by the evolution loop.
///
/// The loop fills in fitness for every pending organism, then calls
/// `advance` to replace the population with the next generation.
pub trait Population: Send {
    fn organisms(&self) -> &[Organism];

    fn organisms_mut(&mut self) -> &mut [Organism];

    /// Produce the next generation from the evaluated one. The previous
    /// best organism must survive.
    fn advance(&mut self);
}

#[derive(Debug, Clone, Copy)]
pub struct BreedingSettings {
    pub initial: usize,
    pub survivors: usize,
    pub children: usize,
    pub immigrants: usize,
    pub tournament_size: usize,
    pub mutation_amount: f64,
}

impl From<&EvolutionConfig> for BreedingSettings {
    fn from(config: &EvolutionConfig) -> Self {
        Self {
            initial: config.initial_population,
            survivors: config.survivors,
            children: config.children,
            immigrants: config.immigrants,
            tournament_size: config.tournament_size,
            mutation_amount: config.mutation_amount,
        }
    }
}

/// Descriptor-driven genetic population over bounded reals
pub struct BreedingPool {
    settings: BreedingSettings,
    descriptors: Vec<GeneDescriptor>,
    organisms: Vec<Organism>,
    rng: StdRng,
}

impl BreedingPool {
    pub fn new(model: &Model, config: &EvolutionConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mut pool = Self {
            settings: BreedingSettings::from(config),
            descriptors: genome::descriptors(model, config.mutation_rate),
            organisms: Vec::new(),
            rng,
        };
        pool.initialize(model);
        pool
    }

    /// The model's own starting point plus uniform-random organisms
    fn initialize(&mut self, model: &Model) {
        let mut organisms = Vec::with_capacity(self.settings.initial);
        if self.settings.initial > 0 {
            organisms.push(Organism::new(genome::encode(model)));
        }
        while organisms.len() < self.settings.initial {
            organisms.push(Organism::new(random_genome(&self.descriptors, &mut self.rng)));
        }
        self.organisms = organisms;
    }

    pub fn descriptors(&self) -> &[GeneDescriptor] {
        &self.descriptors
    }

    pub fn generation_size(&self) -> usize {
        self.settings.survivors + self.settings.children + self.settings.immigrants
    }
}

impl Population for BreedingPool {
    fn organisms(&self) -> &[Organism] {
        &self.organisms
    }

    fn organisms_mut(&mut self) -> &mut [Organism] {
        &mut self.organisms
    }

    fn advance(&mut self) {
        let mut ranked = std::mem::take(&mut self.organisms);
        sort_by_fitness(&mut ranked);

        let mut next: Vec<Organism> = Vec::with_capacity(self.generation_size());

        // Survivors keep their resolved fitness and are not re-evaluated
        next.extend(ranked.iter().take(self.settings.survivors).cloned());
        while next.len() < self.settings.survivors {
            next.push(Organism::new(random_genome(&self.descriptors, &mut self.rng)));
        }

        for _ in 0..self.settings.children {
            let child = if ranked.is_empty() {
                random_genome(&self.descriptors, &mut self.rng)
            } else {
                let parent1 = tournament_selection(&ranked, self.settings.tournament_size, &mut self.rng);
                let parent2 = tournament_selection(&ranked, self.settings.tournament_size, &mut self.rng);
                let mut child = crossover(&parent1.genome, &parent2.genome, &mut self.rng);
                mutate(&mut child, &self.descriptors, self.settings.mutation_amount, &mut self.rng);
                child
            };
            next.push(Organism::new(child));
        }

        for _ in 0..self.settings.immigrants {
            next.push(Organism::new(random_genome(&self.descriptors, &mut self.rng)));
        }

        self.organisms = next;
    }
}
