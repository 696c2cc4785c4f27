use crate::error::Result;
use crate::model::Model;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A refined parameter sitting on one of its original limits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundaryHit {
    pub function: String,
    pub parameter: String,
    pub value: f64,
    pub lower: f64,
    pub upper: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoundaryReport {
    pub timestamp: String,
    pub checked: usize,
    pub hits: Vec<BoundaryHit>,
}

impl BoundaryReport {
    pub fn is_clean(&self) -> bool {
        self.hits.is_empty()
    }

    /// `(function, parameter)` pairs of every hit
    pub fn flagged(&self) -> Vec<(String, String)> {
        self.hits
            .iter()
            .map(|h| (h.function.clone(), h.parameter.clone()))
            .collect()
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

/// Compare refined values against the limits they were refined within.
///
/// A parameter is flagged when its refined value lies closer than
/// `(upper - lower) / 1000` to either limit. Purely diagnostic.
pub fn validate(original: &Model, refined: &Model) -> BoundaryReport {
    let mut hits = Vec::new();
    let mut checked = 0;

    for (index, function) in original.functions().iter().enumerate() {
        let unique = function.unique_name();
        let Some(refined_function) = refined.function(&unique) else {
            log::debug!("Refined model has no function {}", unique);
            continue;
        };

        for param in &function.params {
            let Some(limits) = param.limits else {
                continue;
            };
            if original.is_shared_alias(index, &param.name) {
                continue;
            }
            let Some(refined_param) = refined_function.param(&param.name) else {
                log::debug!("Refined model has no parameter {}:{}", unique, param.name);
                continue;
            };
            checked += 1;

            let eps = limits.range() / 1000.0;
            let value = refined_param.value;
            if (value - limits.lower).abs() < eps || (value - limits.upper).abs() < eps {
                log::warn!(
                    "{}:{} = {} is at its limit [{}, {}]",
                    unique,
                    param.name,
                    value,
                    limits.lower,
                    limits.upper
                );
                hits.push(BoundaryHit {
                    function: unique.clone(),
                    parameter: param.name.clone(),
                    value,
                    lower: limits.lower,
                    upper: limits.upper,
                });
            }
        }
    }

    BoundaryReport {
        timestamp: chrono::Utc::now().to_rfc3339(),
        checked,
        hits,
    }
}
