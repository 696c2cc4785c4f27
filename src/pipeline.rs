use crate::config::AppConfig;
use crate::engines::evaluation::{locate_program, Evaluator, FitnessOracle, ProcessEvaluator, Renderer, WorkerPool};
use crate::engines::generation::{
    genome, BreedingPool, ConvergenceTest, EvolutionLoop, GenerationLog, ProgressCallback,
    SnapshotSink, Termination,
};
use crate::engines::refinement::{RefinementOutcome, RefinementStage};
use crate::engines::validation::{self, BoundaryReport};
use crate::error::{EvolveError, Result};
use crate::model::Model;
use crate::types::{Fitness, GenerationRecord};
use log::{info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug)]
pub struct RunSummary {
    pub termination: Termination,
    pub history: Vec<GenerationRecord>,
    pub best_fitness: Option<Fitness>,
    pub refinement: Option<RefinementOutcome>,
    pub boundary: Option<BoundaryReport>,
}

/// Evolution, refinement and boundary validation for one model
pub struct Pipeline {
    config: AppConfig,
    evaluator: Arc<dyn Evaluator>,
}

impl Pipeline {
    pub fn new(config: AppConfig) -> Self {
        Self::with_evaluator(config, Arc::new(ProcessEvaluator::default()))
    }

    pub fn with_evaluator(config: AppConfig, evaluator: Arc<dyn Evaluator>) -> Self {
        Self { config, evaluator }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Fail early when the imfit executable cannot be found
    pub fn check_evaluator(&self) -> Result<PathBuf> {
        let imfit = &self.config.evaluator.imfit;
        locate_program(imfit).ok_or_else(|| {
            EvolveError::EvaluatorUnavailable(format!("{} not found", imfit.display()))
        })
    }

    fn results_dir(&self) -> &Path {
        &self.config.output.results_dir
    }

    fn renderer(&self, pool: Arc<WorkerPool>) -> Renderer {
        Renderer::new(
            pool,
            Arc::clone(&self.evaluator),
            self.config.evaluator.clone(),
            self.results_dir(),
        )
    }

    pub fn run<C: ProgressCallback>(&self, model: Model, callback: C) -> Result<RunSummary> {
        self.config.validate()?;
        let output = &self.config.output;
        std::fs::create_dir_all(self.results_dir())?;

        let pool = Arc::new(WorkerPool::new(self.config.pool.workers)?);
        let oracle = FitnessOracle::new(
            Arc::clone(&pool),
            Arc::clone(&self.evaluator),
            self.config.evaluator.clone(),
            self.results_dir(),
        );
        let population = BreedingPool::new(&model, &self.config.evolution);
        let keys: Vec<String> = genome::encode(&model).into_keys().collect();
        let log = GenerationLog::create(output.resolve(&output.generation_log), keys)?;

        let mut evolution = EvolutionLoop::new(
            model.clone(),
            population,
            oracle,
            ConvergenceTest::from(&self.config.evolution),
            self.config.evolution.max_generations,
        )
        .with_log(log);
        if output.snapshots {
            evolution = evolution.with_snapshots(SnapshotSink {
                renderer: self.renderer(Arc::clone(&pool)),
                dir: self.results_dir().to_path_buf(),
            });
        }

        let outcome = evolution.run(callback)?;
        if let Termination::NanAbort { generation } = outcome.termination {
            return Err(EvolveError::NanFitness { generation });
        }

        let mut summary = RunSummary {
            termination: outcome.termination,
            history: outcome.history.clone(),
            best_fitness: outcome.best().and_then(|o| o.fitness.value()),
            refinement: None,
            boundary: None,
        };

        if !self.config.refinement.enabled {
            info!("Refinement disabled");
            return Ok(summary);
        }

        let stage = RefinementStage::new(
            Arc::clone(&pool),
            Arc::clone(&self.evaluator),
            self.config.evaluator.clone(),
            self.config.refinement.clone(),
            self.results_dir(),
        );
        let refinement = stage.run(&model, &outcome.population)?;
        if let RefinementOutcome::Completed { winner, artifacts, .. } = &refinement {
            summary.boundary = self.check_boundaries(&winner.model, &artifacts.result)?;
        }
        summary.refinement = Some(refinement);

        Ok(summary)
    }

    fn check_boundaries(&self, original: &Model, result: &Path) -> Result<Option<BoundaryReport>> {
        if !result.exists() {
            warn!("No refined parameters at {}; skipping boundary check", result.display());
            return Ok(None);
        }
        let refined = match Model::load(result) {
            Ok(model) => model,
            Err(e) => {
                warn!("Could not read refined parameters: {}", e);
                return Ok(None);
            }
        };

        let report = validation::validate(original, &refined);
        let output = &self.config.output;
        let path = output.resolve(&output.boundary_report);
        report.save(&path)?;
        if report.is_clean() {
            info!("No refined parameter is at its limit ({} checked)", report.checked);
        } else {
            warn!(
                "{} parameter(s) at their limits, see {}",
                report.hits.len(),
                path.display()
            );
        }
        Ok(Some(report))
    }

    /// Render each function of the model into its own image
    pub fn subcomponents(&self, model: &Model, out_dir: &Path) -> Result<Vec<PathBuf>> {
        std::fs::create_dir_all(self.results_dir())?;
        let pool = Arc::new(WorkerPool::new(self.config.pool.workers)?);
        self.renderer(pool).subcomponents(model, out_dir)
    }
}
