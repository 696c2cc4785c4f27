use crate::config::{EvaluatorConfig, RefinementConfig};
use crate::engines::evaluation::command::{self, RefinementOutputs};
use crate::engines::evaluation::oracle::run_and_parse;
use crate::engines::evaluation::{Evaluator, JobHandle, WorkerPool};
use crate::engines::generation::genome;
use crate::error::{EvolveError, Result};
use crate::model::Model;
use crate::types::{sort_by_fitness, Fitness, Organism, SENTINEL_FITNESS};
use log::{debug, info, warn};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

/// Canonical names of the winner's artifacts in the results directory
pub const BEST_INPUT: &str = "best_input.dat";
pub const BEST_RESULT: &str = "best_result.dat";
pub const BEST_MODEL_IMAGE: &str = "best_model.fits";
pub const BEST_RESIDUAL: &str = "best_residual.fits";

#[derive(Debug, Clone, PartialEq)]
pub struct CandidatePaths {
    pub input: PathBuf,
    pub log: PathBuf,
    pub outputs: RefinementOutputs,
}

impl CandidatePaths {
    fn in_dir(dir: &Path, stem: &str) -> Self {
        Self {
            input: dir.join(format!("{}_input.dat", stem)),
            log: dir.join(format!("{}.log", stem)),
            outputs: RefinementOutputs {
                params: dir.join(format!("{}_params.dat", stem)),
                model_image: dir.join(format!("{}_model.fits", stem)),
                residual: dir.join(format!("{}_residual.fits", stem)),
            },
        }
    }
}

/// A submitted refinement job and the scratch directory it owns
pub struct RefinementCandidate {
    pub index: usize,
    pub organism: Organism,
    pub model: Model,
    pub paths: CandidatePaths,
    dir: TempDir,
    handle: JobHandle<Fitness>,
}

#[derive(Debug, Clone)]
pub struct RefinementResult {
    pub index: usize,
    pub fitness: Fitness,
    pub organism: Organism,
    /// Decoded model with the limits handed to the refinement job
    pub model: Model,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WinnerArtifacts {
    pub input: PathBuf,
    pub result: PathBuf,
    pub model_image: PathBuf,
    pub residual: PathBuf,
}

#[derive(Debug)]
pub enum RefinementOutcome {
    Completed {
        winner: RefinementResult,
        artifacts: WinnerArtifacts,
        /// Final fitness of every candidate, by candidate index
        fitness: Vec<Fitness>,
    },
    Deferred {
        script: PathBuf,
        commands: usize,
    },
}

/// Rename, falling back to copy+remove across filesystems
fn move_file(from: &Path, to: &Path) -> std::io::Result<()> {
    if fs::rename(from, to).is_ok() {
        return Ok(());
    }
    fs::copy(from, to)?;
    fs::remove_file(from)
}

/// Runs K local optimisations in parallel and keeps the best one
pub struct RefinementStage {
    pool: Arc<WorkerPool>,
    evaluator: Arc<dyn Evaluator>,
    evaluator_config: EvaluatorConfig,
    config: RefinementConfig,
    results_dir: PathBuf,
}

impl RefinementStage {
    pub fn new(
        pool: Arc<WorkerPool>,
        evaluator: Arc<dyn Evaluator>,
        evaluator_config: EvaluatorConfig,
        config: RefinementConfig,
        results_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            pool,
            evaluator,
            evaluator_config,
            config,
            results_dir: results_dir.into(),
        }
    }

    pub fn winner_artifacts(&self) -> WinnerArtifacts {
        WinnerArtifacts {
            input: self.results_dir.join(BEST_INPUT),
            result: self.results_dir.join(BEST_RESULT),
            model_image: self.results_dir.join(BEST_MODEL_IMAGE),
            residual: self.results_dir.join(BEST_RESIDUAL),
        }
    }

    fn select(&self, population: &[Organism]) -> Result<Vec<Organism>> {
        let mut ranked = population.to_vec();
        sort_by_fitness(&mut ranked);
        ranked.truncate(self.config.candidates);
        if ranked.is_empty() {
            return Err(EvolveError::Refinement("No candidates to refine".to_string()));
        }
        Ok(ranked)
    }

    pub fn run(&self, template: &Model, population: &[Organism]) -> Result<RefinementOutcome> {
        let selected = self.select(population)?;
        if self.config.deferred {
            return self.defer(template, &selected);
        }

        // Every job is in flight before the first wait
        let mut candidates = Vec::with_capacity(selected.len());
        for (index, organism) in selected.into_iter().enumerate() {
            match self.submit(index, organism, template) {
                Ok(candidate) => candidates.push(candidate),
                Err(e) => {
                    self.pool.drain();
                    return Err(e);
                }
            }
        }
        info!("Refining {} candidate(s)", candidates.len());

        let mut resolved = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let RefinementCandidate {
                index,
                organism,
                model,
                paths,
                dir,
                handle,
            } = candidate;
            let mut fitness = handle.wait().unwrap_or(SENTINEL_FITNESS);
            if fitness.is_nan() {
                warn!("Refinement candidate {} returned NaN", index);
                fitness = SENTINEL_FITNESS;
            }
            info!("Refinement candidate {}: fitness {}", index, fitness);
            resolved.push((RefinementResult { index, fitness, organism, model }, paths, dir));
        }

        let fitness: Vec<Fitness> = resolved.iter().map(|(r, _, _)| r.fitness).collect();
        let winner_pos = fitness
            .iter()
            .enumerate()
            .min_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(pos, _)| pos)
            .unwrap_or(0);

        let artifacts = self.winner_artifacts();
        let mut winner = None;
        for (pos, (result, paths, dir)) in resolved.into_iter().enumerate() {
            if pos == winner_pos {
                self.promote(&paths, &artifacts);
                winner = Some(result);
            }
            let dir_path = dir.path().to_path_buf();
            if let Err(e) = dir.close() {
                warn!("Failed to remove {}: {}", dir_path.display(), e);
            }
        }

        let winner = winner.ok_or_else(|| EvolveError::Refinement("No refinement winner".to_string()))?;
        if winner.fitness >= SENTINEL_FITNESS {
            warn!("Every refinement job failed; winner carries the sentinel fitness");
        }
        info!("Refinement winner: candidate {} with fitness {}", winner.index, winner.fitness);

        Ok(RefinementOutcome::Completed {
            winner,
            artifacts,
            fitness,
        })
    }

    fn submit(&self, index: usize, organism: Organism, template: &Model) -> Result<RefinementCandidate> {
        let mut model = template.clone();
        genome::decode(&organism.genome, &mut model)?;

        let dir = tempfile::Builder::new()
            .prefix(&format!("refine_{}_", index))
            .tempdir_in(&self.results_dir)?;
        let paths = CandidatePaths::in_dir(dir.path(), "candidate");
        model.write_to(&paths.input, false)?;

        let invocation = command::refinement(
            &self.evaluator_config,
            &paths.input,
            self.config.ftol,
            self.config.threads,
            &paths.outputs,
        );
        debug!("Refinement candidate {}: {}", index, invocation.command_line());

        let evaluator = Arc::clone(&self.evaluator);
        let log = paths.log.clone();
        let handle = self
            .pool
            .submit(move |cancel| run_and_parse(evaluator.as_ref(), &invocation, &log, cancel));

        Ok(RefinementCandidate {
            index,
            organism,
            model,
            paths,
            dir,
            handle,
        })
    }

    fn promote(&self, paths: &CandidatePaths, artifacts: &WinnerArtifacts) {
        let moves = [
            (&paths.input, &artifacts.input),
            (&paths.outputs.params, &artifacts.result),
            (&paths.outputs.model_image, &artifacts.model_image),
            (&paths.outputs.residual, &artifacts.residual),
        ];
        for (from, to) in moves {
            if !from.exists() {
                warn!("Refinement artifact {} was not produced", from.display());
                continue;
            }
            if let Err(e) = move_file(from, to) {
                warn!("Failed to move {} to {}: {}", from.display(), to.display(), e);
            }
        }
    }

    /// Persist candidate inputs and append their commands to the script
    fn defer(&self, template: &Model, selected: &[Organism]) -> Result<RefinementOutcome> {
        let script = if self.config.script.is_absolute() {
            self.config.script.clone()
        } else {
            self.results_dir.join(&self.config.script)
        };
        let is_new = !script.exists();
        let mut file = OpenOptions::new().create(true).append(true).open(&script)?;
        if is_new {
            writeln!(file, "#!/bin/sh")?;
        }

        for (index, organism) in selected.iter().enumerate() {
            let mut model = template.clone();
            genome::decode(&organism.genome, &mut model)?;

            let paths = CandidatePaths::in_dir(&self.results_dir, &format!("refine_candidate_{}", index));
            model.write_to(&paths.input, false)?;
            let invocation = command::refinement(
                &self.evaluator_config,
                &paths.input,
                self.config.ftol,
                self.config.threads,
                &paths.outputs,
            );
            writeln!(
                file,
                "{} > {}",
                invocation.command_line(),
                paths.log.display()
            )?;
        }

        info!(
            "Refinement deferred: {} command(s) appended to {}",
            selected.len(),
            script.display()
        );
        Ok(RefinementOutcome::Deferred {
            script,
            commands: selected.len(),
        })
    }
}
