use super::command;
use super::evaluator::{Evaluator, ExitOutcome, Invocation};
use super::pool::{CancelToken, JobHandle, WorkerPool};
use crate::config::EvaluatorConfig;
use crate::error::{EvolveError, Result};
use crate::model::{serialize, Model};
use crate::types::{Fitness, SENTINEL_FITNESS};
use log::{debug, warn};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Marker of the line carrying the fit statistic in imfit's output
pub const FIT_STATISTIC_MARKER: &str = "Reduced Chi^2";

/// Fit statistic from evaluator output: the 4th token of the marker line,
/// e.g. `Reduced Chi^2 = 1.0234`
pub fn parse_fit_statistic(output: &str) -> Option<Fitness> {
    output
        .lines()
        .find(|line| line.contains(FIT_STATISTIC_MARKER))
        .and_then(|line| line.split_whitespace().nth(3))
        .and_then(|token| token.parse().ok())
}

/// NaN means a broken model or image, not a bad fit
pub fn detect_fatal(fitness: Fitness, generation: usize) -> Result<Fitness> {
    if fitness.is_nan() {
        Err(EvolveError::NanFitness { generation })
    } else {
        Ok(fitness)
    }
}

/// Run one evaluator job and read its fit statistic. Every failure maps to
/// the sentinel so the caller only ever sees a number.
pub(crate) fn run_and_parse(
    evaluator: &dyn Evaluator,
    invocation: &Invocation,
    log_path: &Path,
    cancel: &CancelToken,
) -> Fitness {
    match evaluator.execute(invocation, log_path, cancel) {
        Ok(ExitOutcome::Success) => {
            let output = match std::fs::read(log_path) {
                Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
                Err(e) => {
                    warn!("Failed to read evaluator log {}: {}", log_path.display(), e);
                    return SENTINEL_FITNESS;
                }
            };
            parse_fit_statistic(&output).unwrap_or_else(|| {
                warn!(
                    "No '{}' line in evaluator output {}",
                    FIT_STATISTIC_MARKER,
                    log_path.display()
                );
                SENTINEL_FITNESS
            })
        }
        Ok(ExitOutcome::Failed(code)) => {
            warn!("Evaluator exited with status {:?}", code);
            SENTINEL_FITNESS
        }
        Ok(ExitOutcome::Cancelled) => {
            debug!("Evaluator job cancelled");
            SENTINEL_FITNESS
        }
        Err(e) => {
            warn!("Failed to run {}: {}", invocation.program.display(), e);
            SENTINEL_FITNESS
        }
    }
}

/// Fitness of a submitted model, resolved with `FitnessOracle::resolve`
pub struct PendingFitness {
    handle: JobHandle<Fitness>,
}

/// Turns model snapshots into asynchronous evaluator jobs
pub struct FitnessOracle {
    pool: Arc<WorkerPool>,
    evaluator: Arc<dyn Evaluator>,
    config: EvaluatorConfig,
    work_dir: PathBuf,
}

impl FitnessOracle {
    pub fn new(
        pool: Arc<WorkerPool>,
        evaluator: Arc<dyn Evaluator>,
        config: EvaluatorConfig,
        work_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            pool,
            evaluator,
            config,
            work_dir: work_dir.into(),
        }
    }

    pub fn pool(&self) -> &Arc<WorkerPool> {
        &self.pool
    }

    /// Serialize the model with every parameter fixed and queue an
    /// evaluation of it. Does not wait for the evaluator.
    pub fn submit(&self, model: &Model) -> Result<PendingFitness> {
        let mut model_file = tempfile::Builder::new()
            .prefix("ga_model_")
            .suffix(".dat")
            .tempfile_in(&self.work_dir)?;
        model_file.write_all(serialize(model, true).as_bytes())?;
        model_file.flush()?;

        let log_file = tempfile::Builder::new()
            .prefix("ga_log_")
            .suffix(".txt")
            .tempfile_in(&self.work_dir)?;

        let invocation = command::fit_statistic(&self.config, model_file.path());
        let evaluator = Arc::clone(&self.evaluator);

        let handle = self.pool.submit(move |cancel| {
            let fitness = run_and_parse(evaluator.as_ref(), &invocation, log_file.path(), cancel);
            drop(model_file);
            drop(log_file);
            fitness
        });

        Ok(PendingFitness { handle })
    }

    /// Block until the job is done
    pub fn resolve(&self, pending: PendingFitness) -> Fitness {
        pending.handle.wait().unwrap_or_else(|e| {
            warn!("{}", e);
            SENTINEL_FITNESS
        })
    }
}
