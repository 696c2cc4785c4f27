pub mod convergence;
pub mod evolution_engine;
pub mod generation_log;
pub mod genome;
pub mod operators;
pub mod population;
pub mod progress;

pub use convergence::ConvergenceTest;
pub use evolution_engine::{EvolutionLoop, LoopOutcome, SnapshotSink, Termination};
pub use generation_log::GenerationLog;
pub use genome::{GeneDescriptor, Genome};
pub use population::{BreedingPool, Population};
pub use progress::{ChannelProgressCallback, ConsoleProgressCallback, ProgressCallback, ProgressMessage};
