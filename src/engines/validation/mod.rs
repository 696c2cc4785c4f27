pub mod boundary;

pub use boundary::{validate, BoundaryHit, BoundaryReport};
