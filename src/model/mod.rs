pub mod parameter;
pub mod parser;
pub mod serialize;

pub use parameter::{Limits, Parameter};
pub use parser::parse_model;
pub use serialize::serialize;

use crate::error::{EvolveError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Image-description keywords that may precede the first function block.
pub const IMAGE_OPTIONS: [&str; 5] = ["GAIN", "READNOISE", "ORIGINAL_SKY", "EXPTIME", "NCOMBINE"];

/// Names of the coordinate parameters every function starts with
pub const COORDINATES: [&str; 2] = ["X0", "Y0"];

pub fn is_coordinate(param_name: &str) -> bool {
    COORDINATES.contains(&param_name)
}

/// One imfit function: the coordinate parameters X0 and Y0 followed by the
/// function's own parameters.
///
/// Functions with the same `block` share one X0/Y0 pair. Each member holds a
/// copy of the coordinates; `Model::change_value` keeps the copies equal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Function {
    pub kind: String,
    pub id: usize,
    pub block: usize,
    pub params: Vec<Parameter>,
}

impl Function {
    /// A function with its own coordinate block
    pub fn new(kind: impl Into<String>, id: usize, x0: Parameter, y0: Parameter) -> Self {
        Self {
            kind: kind.into(),
            id,
            block: id,
            params: vec![x0, y0],
        }
    }

    pub fn in_block(mut self, block: usize) -> Self {
        self.block = block;
        self
    }

    pub fn unique_name(&self) -> String {
        format!("{}.{}", self.kind, self.id)
    }

    pub fn param(&self, name: &str) -> Option<&Parameter> {
        self.params.iter().find(|p| p.name == name)
    }

    pub fn param_mut(&mut self, name: &str) -> Option<&mut Parameter> {
        self.params.iter_mut().find(|p| p.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Model {
    pub options: Vec<(String, String)>,
    functions: Vec<Function>,
    param_count: usize,
}

impl Model {
    pub fn new(options: Vec<(String, String)>, functions: Vec<Function>) -> Self {
        let param_count = functions.iter().map(|f| f.params.len()).sum();
        Self {
            options,
            functions,
            param_count,
        }
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            EvolveError::Configuration(format!("Failed to read model {}: {}", path.display(), e))
        })?;
        parse_model(&text)
    }

    pub fn write_to<P: AsRef<Path>>(&self, path: P, fix_all: bool) -> Result<()> {
        std::fs::write(path, serialize(self, fix_all))?;
        Ok(())
    }

    pub fn functions(&self) -> &[Function] {
        &self.functions
    }

    pub fn function(&self, unique_name: &str) -> Option<&Function> {
        self.functions.iter().find(|f| f.unique_name() == unique_name)
    }

    pub fn function_mut(&mut self, unique_name: &str) -> Option<&mut Function> {
        self.functions.iter_mut().find(|f| f.unique_name() == unique_name)
    }

    pub fn param_count(&self) -> usize {
        self.param_count
    }

    /// Whether the function at `index` is the first member of its block
    pub fn leads_block(&self, index: usize) -> bool {
        match self.functions.get(index) {
            Some(function) => self.functions[..index].iter().all(|f| f.block != function.block),
            None => false,
        }
    }

    /// A coordinate owned by an earlier function of the same block
    pub fn is_shared_alias(&self, index: usize, param_name: &str) -> bool {
        is_coordinate(param_name) && !self.leads_block(index)
    }

    /// Free parameters in model order, paired with their function's unique
    /// name. Shared coordinates appear once, under the block's first function.
    pub fn free_parameters(&self) -> impl Iterator<Item = (String, &Parameter)> {
        self.functions.iter().enumerate().flat_map(move |(index, f)| {
            let unique = f.unique_name();
            f.params
                .iter()
                .filter(move |p| !p.is_fixed() && !self.is_shared_alias(index, &p.name))
                .map(move |p| (unique.clone(), p))
        })
    }

    /// Set a parameter through `Parameter::change_value`. A coordinate is
    /// written to every function of its block. Returns false when the
    /// parameter does not exist.
    pub fn change_value(&mut self, unique_name: &str, param_name: &str, value: f64) -> bool {
        let Some(block) = self.function(unique_name).map(|f| f.block) else {
            return false;
        };
        if self.function(unique_name).and_then(|f| f.param(param_name)).is_none() {
            return false;
        }

        for function in &mut self.functions {
            let member = function.unique_name() == unique_name
                || (is_coordinate(param_name) && function.block == block);
            if !member {
                continue;
            }
            if let Some(param) = function.param_mut(param_name) {
                param.change_value(value);
            }
        }
        true
    }

    /// A model holding only the function at `index`, keeping the image options
    pub fn single_function(&self, index: usize) -> Option<Model> {
        let function = self.functions.get(index)?.clone();
        Some(Model::new(self.options.clone(), vec![function]))
    }
}
