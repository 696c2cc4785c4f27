//! Genome representation for the parameter search
//!
//! A genome maps a qualified free-parameter key (`<unique_name>:<param>`,
//! e.g. `Sersic.0:r_e`) to a real value. The key set is a pure function of
//! the model's fixed/free partition:
//! - every free parameter of the model has exactly one key
//! - fixed parameters never appear
//! - an X0/Y0 pair shared by several functions is keyed under the first
//!   function of the block
//!
//! # Why a flat map instead of the model itself?
//!
//! Breeding operators only need a flat list of bounded reals:
//! - **Crossover**: pick each key from one of two parents
//! - **Mutation**: perturb a value inside its descriptor's bounds
//! - **Logging**: the ordered key set doubles as the generation-log header
//!
//! # Conversion
//!
//! Use `encode()` for Model -> Genome and `decode()` to write a genome back
//! into a model before it is serialized for the evaluator.

use crate::error::{EvolveError, Result};
use crate::model::Model;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub type Genome = BTreeMap<String, f64>;

/// Bounds and mutation rate for one genome key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneDescriptor {
    pub key: String,
    pub lower: f64,
    pub upper: f64,
    pub mutation_rate: f64,
}

pub fn genome_key(unique_name: &str, param_name: &str) -> String {
    format!("{}:{}", unique_name, param_name)
}

/// Genome holding the current value of every free parameter
pub fn encode(model: &Model) -> Genome {
    model
        .free_parameters()
        .map(|(unique, param)| (genome_key(&unique, &param.name), param.value))
        .collect()
}

/// Descriptors for every genome key, built from the model's current limits
pub fn descriptors(model: &Model, mutation_rate: f64) -> Vec<GeneDescriptor> {
    model
        .free_parameters()
        .filter_map(|(unique, param)| {
            param.limits.map(|limits| GeneDescriptor {
                key: genome_key(&unique, &param.name),
                lower: limits.lower,
                upper: limits.upper,
                mutation_rate,
            })
        })
        .collect()
}

/// Write genome values into the model.
///
/// Every key is resolved before anything is written, so a bad key leaves
/// the model untouched. A shared coordinate moves every function of its
/// block.
pub fn decode(genome: &Genome, model: &mut Model) -> Result<()> {
    let mut resolved = Vec::with_capacity(genome.len());

    for (key, value) in genome {
        let (function_name, param_name) = key
            .split_once(':')
            .ok_or_else(|| EvolveError::Lookup(key.clone()))?;
        let is_free = model
            .function(function_name)
            .and_then(|f| f.param(param_name))
            .map(|p| !p.is_fixed())
            .unwrap_or(false);
        if !is_free {
            return Err(EvolveError::Lookup(key.clone()));
        }
        resolved.push((function_name, param_name, *value));
    }

    for (function_name, param_name, value) in resolved {
        model.change_value(function_name, param_name, value);
    }

    Ok(())
}
