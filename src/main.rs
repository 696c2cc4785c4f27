use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use imfit_evolve::config::ConfigManager;
use imfit_evolve::engines::generation::ConsoleProgressCallback;
use imfit_evolve::engines::refinement::RefinementOutcome;
use imfit_evolve::model::Model;
use imfit_evolve::{EvolveError, Pipeline};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "imfit-evolve")]
#[command(about = "Genetic search over imfit model parameters with parallel refinement")]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, global = true, default_value = "imfit-evolve.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evolve the model, refine the best candidates and check their limits
    Run {
        /// imfit model file with starting values and limits
        model: PathBuf,
        /// Override the worker pool size
        #[arg(short, long)]
        workers: Option<usize>,
        /// Seed for reproducible breeding
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Render every function of a model into its own image
    Subcomponents {
        model: PathBuf,
        /// Directory for the rendered images
        #[arg(short, long, default_value = "subcomponents")]
        out: PathBuf,
    },
}

fn exit_code(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<EvolveError>() {
        Some(e) if e.is_bad_input() => 2,
        Some(EvolveError::NanFitness { .. }) => 3,
        Some(EvolveError::EvaluatorUnavailable(_)) => 4,
        _ => 1,
    }
}

fn run(cli: Cli) -> Result<()> {
    let manager = ConfigManager::new();
    manager.load_from_file(&cli.config)?;

    match cli.command {
        Commands::Run { model, workers, seed } => {
            manager.update(|config| {
                if let Some(workers) = workers {
                    config.pool.workers = workers;
                }
                if seed.is_some() {
                    config.evolution.seed = seed;
                }
            })?;
            let model = Model::load(&model)?;
            let pipeline = Pipeline::new(manager.get()?);
            let imfit = pipeline.check_evaluator()?;
            log::info!("Using evaluator {}", imfit.display());

            let summary = pipeline.run(model, ConsoleProgressCallback)?;
            log::info!(
                "Search ended with {:?} after {} generation(s), best fitness {:?}",
                summary.termination,
                summary.history.len(),
                summary.best_fitness
            );
            match summary.refinement {
                Some(RefinementOutcome::Completed { winner, artifacts, .. }) => log::info!(
                    "Refined winner: candidate {} with fitness {} ({})",
                    winner.index,
                    winner.fitness,
                    artifacts.result.display()
                ),
                Some(RefinementOutcome::Deferred { script, commands }) => log::info!(
                    "{} refinement command(s) written to {}",
                    commands,
                    script.display()
                ),
                None => {}
            }
        }
        Commands::Subcomponents { model, out } => {
            let model = Model::load(&model)?;
            let pipeline = Pipeline::new(manager.get()?);
            let rendered = pipeline
                .subcomponents(&model, &out)
                .with_context(|| format!("rendering subcomponents into {}", out.display()))?;
            for path in rendered {
                println!("{}", path.display());
            }
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            match err.downcast_ref::<EvolveError>() {
                Some(EvolveError::NanFitness { .. }) => eprintln!("Aborted due to NaN fitness: {:#}", err),
                Some(e) if e.is_bad_input() => eprintln!("Bad input: {:#}", err),
                Some(EvolveError::EvaluatorUnavailable(_)) => eprintln!("Evaluator unavailable: {:#}", err),
                _ => eprintln!("Error: {:#}", err),
            }
            ExitCode::from(exit_code(&err))
        }
    }
}
