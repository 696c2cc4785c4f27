use thiserror::Error;

#[derive(Error, Debug)]
pub enum EvolveError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Model parse error at line {line}: {message}")]
    ModelParse { line: usize, message: String },

    #[error("Genome key '{0}' does not resolve to a free parameter")]
    Lookup(String),

    #[error("Evaluator returned NaN fitness at generation {generation}")]
    NanFitness { generation: usize },

    #[error("Evaluator unavailable: {0}")]
    EvaluatorUnavailable(String),

    #[error("Worker pool error: {0}")]
    Pool(String),

    #[error("Refinement error: {0}")]
    Refinement(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serde error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl EvolveError {
    /// Input problems are reported before any evaluation starts.
    pub fn is_bad_input(&self) -> bool {
        matches!(
            self,
            EvolveError::Configuration(_) | EvolveError::ModelParse { .. } | EvolveError::Lookup(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, EvolveError>;
