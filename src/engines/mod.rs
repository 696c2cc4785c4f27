pub mod evaluation;
pub mod generation;
pub mod refinement;
pub mod validation;
