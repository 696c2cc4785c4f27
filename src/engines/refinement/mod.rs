pub mod stage;

pub use stage::{
    CandidatePaths, RefinementCandidate, RefinementOutcome, RefinementResult, RefinementStage,
    WinnerArtifacts,
};
