pub mod command;
pub mod evaluator;
pub mod oracle;
pub mod pool;
pub mod render;

pub use evaluator::{locate_program, Evaluator, ExitOutcome, Invocation, ProcessEvaluator};
pub use oracle::{detect_fatal, parse_fit_statistic, FitnessOracle, PendingFitness};
pub use pool::{CancelToken, JobHandle, WorkerPool};
pub use render::Renderer;
