mod common;

use common::{
    entries_with_prefix, targets, test_config, three_function_model, FailingEvaluator, StubEvaluator,
};
use imfit_evolve::engines::evaluation::{Evaluator, FitnessOracle, WorkerPool};
use imfit_evolve::engines::generation::{
    BreedingPool, ChannelProgressCallback, ConsoleProgressCallback, ConvergenceTest, EvolutionLoop,
    Population, ProgressMessage, Termination,
};
use imfit_evolve::types::{FitnessSlot, SENTINEL_FITNESS};
use imfit_evolve::{EvolveError, Pipeline};
use std::path::Path;
use std::sync::mpsc::channel;
use std::sync::Arc;

fn build_loop_with_pool(
    dir: &Path,
    evaluator: Arc<dyn Evaluator>,
    max_generations: usize,
    convergence: ConvergenceTest,
) -> (EvolutionLoop<BreedingPool>, Arc<WorkerPool>) {
    let config = test_config(dir);
    let model = three_function_model();
    let pool = Arc::new(WorkerPool::new(config.pool.workers).unwrap());
    let oracle = FitnessOracle::new(Arc::clone(&pool), evaluator, config.evaluator.clone(), dir);
    let population = BreedingPool::new(&model, &config.evolution);
    let evolution = EvolutionLoop::new(model, population, oracle, convergence, max_generations);
    (evolution, pool)
}

fn build_loop(
    dir: &Path,
    evaluator: Arc<dyn Evaluator>,
    max_generations: usize,
    convergence: ConvergenceTest,
) -> EvolutionLoop<BreedingPool> {
    build_loop_with_pool(dir, evaluator, max_generations, convergence).0
}

#[test]
fn test_five_generations_write_header_and_rows() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let stub = Arc::new(StubEvaluator::new(targets()));
    let pipeline = Pipeline::with_evaluator(config, stub.clone());

    let summary = pipeline.run(three_function_model(), ConsoleProgressCallback).unwrap();

    assert_eq!(summary.termination, Termination::MaxGeneration);
    assert_eq!(summary.history.len(), 5);
    assert!(summary.refinement.is_none());
    // 12 organisms first, then 6 children + 2 immigrants per generation
    assert_eq!(stub.fitstat_calls(), 12 + 4 * 8);

    let log = std::fs::read_to_string(dir.path().join("generations.log")).unwrap();
    let lines: Vec<&str> = log.lines().collect();
    assert_eq!(lines.len(), 6);

    let header: Vec<&str> = lines[0].split_whitespace().collect();
    assert_eq!(header[0], "generation");
    assert_eq!(header[1], "best_fitness");
    assert_eq!(header.len(), 2 + 6);
    assert!(header.contains(&"Gaussian.2:sigma"));
    assert!(!header.iter().any(|h| h.ends_with(":ell") || h.ends_with(":X0")));

    let best: Vec<f64> = lines[1..]
        .iter()
        .map(|row| row.split_whitespace().nth(1).unwrap().parse().unwrap())
        .collect();
    assert!(best.windows(2).all(|w| w[1] <= w[0]), "best fitness increased: {:?}", best);

    for (i, row) in lines[1..].iter().enumerate() {
        assert_eq!(row.split_whitespace().count(), header.len());
        assert!(row.starts_with(&format!("{} ", i)));
    }

    // Scoped artifacts are gone once every job has resolved
    assert!(entries_with_prefix(dir.path(), "ga_model_").is_empty());
    assert!(entries_with_prefix(dir.path(), "ga_log_").is_empty());
}

#[test]
fn test_convergence_fires_only_when_both_ratios_settle() {
    let dir = tempfile::tempdir().unwrap();
    let convergence = ConvergenceTest {
        window: 3,
        tolerance: 0.05,
    };
    let stub: Arc<dyn Evaluator> = Arc::new(StubEvaluator::new(targets()));
    let mut evolution = build_loop(dir.path(), stub, 60, convergence);

    let outcome = evolution.run(ConsoleProgressCallback).unwrap();
    let history = &outcome.history;

    let best: Vec<f64> = history.iter().map(|r| r.best_fitness).collect();
    assert!(best.windows(2).all(|w| w[1] <= w[0]));

    // No earlier prefix passes the test, the final one passes iff converged
    for end in 1..history.len() {
        assert!(!convergence.is_converged(&history[..end]));
    }
    assert_eq!(
        convergence.is_converged(history),
        outcome.termination == Termination::Converged
    );
    if outcome.termination == Termination::MaxGeneration {
        assert_eq!(history.len(), 60);
    } else {
        assert!(history.last().unwrap().generation > convergence.window);
    }
}

#[test]
fn test_failed_evaluations_resolve_to_sentinel() {
    let dir = tempfile::tempdir().unwrap();
    let convergence = ConvergenceTest {
        window: 10,
        tolerance: 1e-3,
    };
    let mut evolution = build_loop(dir.path(), Arc::new(FailingEvaluator), 1, convergence);

    let outcome = evolution.run(ConsoleProgressCallback).unwrap();

    assert_eq!(outcome.termination, Termination::MaxGeneration);
    assert_eq!(outcome.history.len(), 1);
    assert_eq!(outcome.history[0].best_fitness, SENTINEL_FITNESS);
    assert_eq!(outcome.history[0].average_fitness, SENTINEL_FITNESS);
    assert_eq!(outcome.population.len(), 12);
    assert!(outcome
        .population
        .iter()
        .all(|o| o.fitness == FitnessSlot::Resolved(SENTINEL_FITNESS)));
    assert!(entries_with_prefix(dir.path(), "ga_model_").is_empty());
}

#[cfg(unix)]
#[test]
fn test_nonzero_exit_process_resolves_to_sentinel() {
    use imfit_evolve::engines::evaluation::ProcessEvaluator;
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().unwrap();
    let script = dir.path().join("broken-imfit");
    std::fs::write(&script, "#!/bin/sh\necho 'image not found'\nexit 2\n").unwrap();
    std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

    let mut config = test_config(dir.path());
    config.evaluator.imfit = script;
    config.evolution.max_generations = 1;
    let pipeline = Pipeline::with_evaluator(config, Arc::new(ProcessEvaluator::default()));

    let summary = pipeline.run(three_function_model(), ConsoleProgressCallback).unwrap();
    assert_eq!(summary.history.len(), 1);
    assert_eq!(summary.best_fitness, Some(SENTINEL_FITNESS));
    assert!(entries_with_prefix(dir.path(), "ga_log_").is_empty());
}

#[test]
fn test_nan_aborts_loop_without_refinement() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path());
    config.refinement.enabled = true;
    config.evolution.max_generations = 10;

    // Generation 0 makes 12 calls and generation 1 makes 8, so call 20
    // is the first of generation 2
    let stub = Arc::new(StubEvaluator::new(targets()).with_nan_from_call(20));
    let pipeline = Pipeline::with_evaluator(config, stub.clone());

    let err = pipeline.run(three_function_model(), ConsoleProgressCallback).unwrap_err();
    assert!(matches!(err, EvolveError::NanFitness { generation: 2 }));
    assert_eq!(stub.refine_calls(), 0);
    assert!(!dir.path().join("best_result.dat").exists());

    let log = std::fs::read_to_string(dir.path().join("generations.log")).unwrap();
    assert_eq!(log.lines().count(), 1 + 2);
}

#[test]
fn test_nan_abort_status_and_drained_pool() {
    let dir = tempfile::tempdir().unwrap();
    let convergence = ConvergenceTest {
        window: 10,
        tolerance: 1e-3,
    };
    let stub: Arc<dyn Evaluator> = Arc::new(StubEvaluator::new(targets()).with_nan_from_call(20));
    let (mut evolution, pool) = build_loop_with_pool(dir.path(), stub, 10, convergence);

    let (tx, rx) = channel();
    let outcome = evolution.run(ChannelProgressCallback::new(tx)).unwrap();

    assert_eq!(outcome.termination, Termination::NanAbort { generation: 2 });
    assert_eq!(outcome.history.len(), 2);
    assert!(pool.is_cancelled());
    assert_eq!(pool.in_flight(), 0);
    assert!(entries_with_prefix(dir.path(), "ga_model_").is_empty());

    let messages: Vec<ProgressMessage> = rx.try_iter().collect();
    let completed = messages
        .iter()
        .filter(|m| matches!(m, ProgressMessage::GenerationComplete(_)))
        .count();
    assert_eq!(completed, 2);
    assert!(messages.contains(&ProgressMessage::GenerationStart(2)));
}

#[test]
fn test_population_size_is_constant_across_generations() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let model = three_function_model();
    let mut population = BreedingPool::new(&model, &config.evolution);
    assert_eq!(population.organisms().len(), config.evolution.initial_population);

    for generation in 0..10 {
        for (i, organism) in population.organisms_mut().iter_mut().enumerate() {
            if organism.fitness.is_pending() {
                organism.fitness = FitnessSlot::Resolved((generation * 100 + i) as f64);
            }
        }
        let best = population
            .organisms()
            .iter()
            .min_by(|a, b| a.rank_fitness().partial_cmp(&b.rank_fitness()).unwrap())
            .unwrap()
            .clone();

        population.advance();

        assert_eq!(population.organisms().len(), config.evolution.generation_size());
        assert!(population.organisms().contains(&best));
        let pending = population.organisms().iter().filter(|o| o.fitness.is_pending()).count();
        assert_eq!(pending, config.evolution.children + config.evolution.immigrants);
    }
}
