pub mod traits;
pub mod evaluator;
pub mod evolution;
pub mod refinement;
pub mod output;
pub mod manager;

pub use manager::{AppConfig, ConfigManager};
pub use evaluator::{EvaluatorConfig, PoolConfig};
pub use evolution::EvolutionConfig;
pub use refinement::RefinementConfig;
pub use output::OutputConfig;
pub use traits::ConfigSection;
