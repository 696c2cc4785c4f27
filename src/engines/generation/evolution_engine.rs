use crate::engines::evaluation::{detect_fatal, FitnessOracle, PendingFitness, Renderer};
use crate::engines::generation::{
    convergence::ConvergenceTest,
    generation_log::GenerationLog,
    genome::{self, Genome},
    population::Population,
    progress::ProgressCallback,
};
use crate::error::{EvolveError, Result};
use crate::model::Model;
use crate::types::{sort_by_fitness, FitnessSlot, GenerationRecord, Organism};
use log::{error, info};
use std::path::PathBuf;

/// How the loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    Converged,
    MaxGeneration,
    NanAbort { generation: usize },
}

#[derive(Debug)]
pub struct LoopOutcome {
    pub termination: Termination,
    pub history: Vec<GenerationRecord>,
    /// Final population, best first
    pub population: Vec<Organism>,
}

impl LoopOutcome {
    pub fn best(&self) -> Option<&Organism> {
        self.population.first()
    }
}

enum LoopState {
    Init,
    Dispatch,
    Join(Vec<(usize, PendingFitness)>),
    Record(GenerationRecord),
    ConvergenceCheck,
    Done(Termination),
}

/// Per-generation image of the best organism
pub struct SnapshotSink {
    pub renderer: Renderer,
    pub dir: PathBuf,
}

pub struct EvolutionLoop<P: Population> {
    model: Model,
    population: P,
    oracle: FitnessOracle,
    convergence: ConvergenceTest,
    max_generations: usize,
    generation: usize,
    history: Vec<GenerationRecord>,
    log: Option<GenerationLog>,
    snapshots: Option<SnapshotSink>,
}

impl<P: Population> EvolutionLoop<P> {
    pub fn new(
        model: Model,
        population: P,
        oracle: FitnessOracle,
        convergence: ConvergenceTest,
        max_generations: usize,
    ) -> Self {
        Self {
            model,
            population,
            oracle,
            convergence,
            max_generations,
            generation: 0,
            history: Vec::new(),
            log: None,
            snapshots: None,
        }
    }

    pub fn with_log(mut self, log: GenerationLog) -> Self {
        self.log = Some(log);
        self
    }

    pub fn with_snapshots(mut self, snapshots: SnapshotSink) -> Self {
        self.snapshots = Some(snapshots);
        self
    }

    pub fn history(&self) -> &[GenerationRecord] {
        &self.history
    }

    /// Run generations until convergence, the generation ceiling, or a NaN
    /// fitness.
    pub fn run<C: ProgressCallback>(&mut self, mut callback: C) -> Result<LoopOutcome> {
        let mut state = LoopState::Init;

        loop {
            state = match state {
                LoopState::Init => {
                    info!(
                        "Starting evolution: {} organisms, {} free parameters, {} workers",
                        self.population.organisms().len(),
                        genome::encode(&self.model).len(),
                        self.oracle.pool().workers()
                    );
                    LoopState::Dispatch
                }
                LoopState::Dispatch => {
                    callback.on_generation_start(self.generation);
                    match self.dispatch() {
                        Ok(pending) => LoopState::Join(pending),
                        Err(e) => {
                            self.oracle.pool().drain();
                            return Err(e);
                        }
                    }
                }
                LoopState::Join(pending) => match self.join(pending, &mut callback)? {
                    Some(record) => LoopState::Record(record),
                    None => LoopState::Done(Termination::NanAbort {
                        generation: self.generation,
                    }),
                },
                LoopState::Record(record) => {
                    self.record(record)?;
                    callback.on_generation_complete(&record);
                    LoopState::ConvergenceCheck
                }
                LoopState::ConvergenceCheck => {
                    if self.convergence.is_converged(&self.history) {
                        LoopState::Done(Termination::Converged)
                    } else if self.generation + 1 >= self.max_generations {
                        LoopState::Done(Termination::MaxGeneration)
                    } else {
                        self.population.advance();
                        self.generation += 1;
                        LoopState::Dispatch
                    }
                }
                LoopState::Done(termination) => {
                    info!("Evolution finished after {} generation(s): {:?}", self.history.len(), termination);
                    return Ok(self.outcome(termination));
                }
            };
        }
    }

    /// Submit every pending organism before waiting on any of them
    fn dispatch(&mut self) -> Result<Vec<(usize, PendingFitness)>> {
        let mut pending = Vec::new();
        for (index, organism) in self.population.organisms().iter().enumerate() {
            if !organism.fitness.is_pending() {
                continue;
            }
            genome::decode(&organism.genome, &mut self.model)?;
            pending.push((index, self.oracle.submit(&self.model)?));
        }
        Ok(pending)
    }

    /// Wait for every submitted job. `None` means a NaN fitness was seen and
    /// the pool has been drained.
    fn join<C: ProgressCallback>(
        &mut self,
        pending: Vec<(usize, PendingFitness)>,
        callback: &mut C,
    ) -> Result<Option<GenerationRecord>> {
        let total = pending.len();
        for (done, (index, job)) in pending.into_iter().enumerate() {
            let fitness = self.oracle.resolve(job);
            if let Err(e) = detect_fatal(fitness, self.generation) {
                error!("{}; aborting", e);
                self.oracle.pool().drain();
                return Ok(None);
            }
            if let Some(organism) = self.population.organisms_mut().get_mut(index) {
                organism.fitness = FitnessSlot::Resolved(fitness);
            }
            callback.on_organism_evaluated(done + 1, total);
        }

        let organisms = self.population.organisms();
        if organisms.is_empty() {
            return Err(EvolveError::Configuration("Population is empty".to_string()));
        }
        let fitness: Vec<f64> = organisms.iter().map(Organism::rank_fitness).collect();
        let best = fitness.iter().copied().fold(f64::INFINITY, f64::min);
        let average = fitness.iter().sum::<f64>() / fitness.len() as f64;

        if best.is_nan() || average.is_nan() {
            error!("Generation {} produced a NaN summary; aborting", self.generation);
            self.oracle.pool().drain();
            return Ok(None);
        }

        Ok(Some(GenerationRecord {
            generation: self.generation,
            best_fitness: best,
            average_fitness: average,
        }))
    }

    fn best_genome(&self) -> Option<Genome> {
        self.population
            .organisms()
            .iter()
            .min_by(|a, b| {
                a.rank_fitness()
                    .partial_cmp(&b.rank_fitness())
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|o| o.genome.clone())
    }

    fn record(&mut self, record: GenerationRecord) -> Result<()> {
        self.history.push(record);
        let Some(best) = self.best_genome() else {
            return Ok(());
        };

        if let Some(log) = self.log.as_mut() {
            log.append(&record, &best)?;
        }

        if let Some(sink) = &self.snapshots {
            genome::decode(&best, &mut self.model)?;
            let output = sink.dir.join(format!("gen_{:04}_best.fits", record.generation));
            sink.renderer.snapshot(&self.model, &output);
        }
        Ok(())
    }

    fn outcome(&self, termination: Termination) -> LoopOutcome {
        let mut population = self.population.organisms().to_vec();
        sort_by_fitness(&mut population);
        LoopOutcome {
            termination,
            history: self.history.clone(),
            population,
        }
    }
}
