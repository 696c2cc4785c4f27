#![allow(dead_code)]

use imfit_evolve::config::{AppConfig, EvaluatorConfig};
use imfit_evolve::engines::evaluation::{CancelToken, Evaluator, ExitOutcome, Invocation};
use imfit_evolve::engines::generation::genome::genome_key;
use imfit_evolve::model::{parse_model, serialize, Model};
use std::collections::BTreeMap;
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Three functions with two free parameters each; coordinates are fixed
pub const THREE_FUNCTIONS: &str = "\
GAIN 4.5
X0   50   fixed
Y0   50   fixed
FUNCTION Sersic
PA    10    0,90
ell   0.2   fixed
n     2     0.5,8

X0   50   fixed
Y0   50   fixed
FUNCTION Exponential
PA    10    0,90
h     10    1,50

X0   40   fixed
Y0   60   fixed
FUNCTION Gaussian
PA    10    0,90
sigma 1     0.5,10
";

pub fn three_function_model() -> Model {
    parse_model(THREE_FUNCTIONS).unwrap()
}

pub fn targets() -> BTreeMap<String, f64> {
    [
        ("Sersic.0:PA", 30.0),
        ("Sersic.0:n", 4.0),
        ("Exponential.1:PA", 45.0),
        ("Exponential.1:h", 20.0),
        ("Gaussian.2:PA", 60.0),
        ("Gaussian.2:sigma", 3.0),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect()
}

pub fn test_config(results_dir: &Path) -> AppConfig {
    let mut config = AppConfig::default();
    config.pool.workers = 4;
    config.evaluator = EvaluatorConfig {
        data: "galaxy.fits".into(),
        ..EvaluatorConfig::default()
    };
    config.evolution.initial_population = 12;
    config.evolution.survivors = 4;
    config.evolution.children = 6;
    config.evolution.immigrants = 2;
    config.evolution.max_generations = 5;
    config.evolution.convergence_window = 10;
    config.evolution.seed = Some(42);
    config.refinement.enabled = false;
    config.output.results_dir = results_dir.to_path_buf();
    config
}

/// Sum of squared distances to the targets over every listed parameter
pub fn distance(model: &Model, targets: &BTreeMap<String, f64>) -> f64 {
    model
        .functions()
        .iter()
        .flat_map(|f| {
            let unique = f.unique_name();
            f.params
                .iter()
                .map(move |p| (genome_key(&unique, &p.name), p.value))
        })
        .filter_map(|(key, value)| targets.get(&key).map(|t| (value - t).powi(2)))
        .sum()
}

type RefineFn = Box<dyn Fn(&Model) -> Option<f64> + Send + Sync>;

/// In-process imfit stand-in.
///
/// Fit-statistic jobs score the model with `distance`; refinement jobs use
/// `refine` (returning `None` means the job fails) and write every output
/// file imfit would.
pub struct StubEvaluator {
    pub targets: BTreeMap<String, f64>,
    /// Fit-statistic calls from this index on report NaN
    pub nan_from_call: Option<usize>,
    pub refine: Option<RefineFn>,
    pub fitstat_calls: AtomicUsize,
    pub refine_calls: AtomicUsize,
}

impl StubEvaluator {
    pub fn new(targets: BTreeMap<String, f64>) -> Self {
        Self {
            targets,
            nan_from_call: None,
            refine: None,
            fitstat_calls: AtomicUsize::new(0),
            refine_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_nan_from_call(mut self, call: usize) -> Self {
        self.nan_from_call = Some(call);
        self
    }

    pub fn with_refine<F>(mut self, refine: F) -> Self
    where
        F: Fn(&Model) -> Option<f64> + Send + Sync + 'static,
    {
        self.refine = Some(Box::new(refine));
        self
    }

    pub fn fitstat_calls(&self) -> usize {
        self.fitstat_calls.load(Ordering::SeqCst)
    }

    pub fn refine_calls(&self) -> usize {
        self.refine_calls.load(Ordering::SeqCst)
    }
}

fn write_statistic(log_path: &Path, value: f64) -> io::Result<()> {
    std::fs::write(
        log_path,
        format!("Fitting model...\n  Reduced Chi^2 = {}\nDone.\n", value),
    )
}

fn read_model(invocation: &Invocation) -> io::Result<Model> {
    let path = invocation
        .value_after("-c")
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "no -c argument"))?;
    let text = std::fs::read_to_string(path)?;
    parse_model(&text).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))
}

impl Evaluator for StubEvaluator {
    fn execute(
        &self,
        invocation: &Invocation,
        log_path: &Path,
        _cancel: &CancelToken,
    ) -> io::Result<ExitOutcome> {
        let model = read_model(invocation)?;

        if invocation.has_flag("--ftol") {
            self.refine_calls.fetch_add(1, Ordering::SeqCst);
            let fitness = self
                .refine
                .as_ref()
                .map(|refine| refine(&model))
                .unwrap_or_else(|| Some(distance(&model, &self.targets)));
            let Some(fitness) = fitness else {
                return Ok(ExitOutcome::Failed(Some(1)));
            };
            for flag in ["--save-params", "--save-model", "--save-residual"] {
                if let Some(path) = invocation.value_after(flag) {
                    let contents = if flag == "--save-params" {
                        serialize(&model, true)
                    } else {
                        format!("image for {}", flag)
                    };
                    std::fs::write(path, contents)?;
                }
            }
            write_statistic(log_path, fitness)?;
            return Ok(ExitOutcome::Success);
        }

        let call = self.fitstat_calls.fetch_add(1, Ordering::SeqCst);
        let fitness = match self.nan_from_call {
            Some(from) if call >= from => f64::NAN,
            _ => distance(&model, &self.targets),
        };
        write_statistic(log_path, fitness)?;
        Ok(ExitOutcome::Success)
    }
}

/// Every job exits non-zero without output
pub struct FailingEvaluator;

impl Evaluator for FailingEvaluator {
    fn execute(
        &self,
        _invocation: &Invocation,
        _log_path: &Path,
        _cancel: &CancelToken,
    ) -> io::Result<ExitOutcome> {
        Ok(ExitOutcome::Failed(Some(1)))
    }
}

/// Files directly inside `dir` whose name starts with `prefix`
pub fn entries_with_prefix(dir: &Path, prefix: &str) -> Vec<String> {
    std::fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|name| name.starts_with(prefix))
        .collect()
}
