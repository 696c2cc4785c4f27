use serde::{Deserialize, Serialize};

/// Fraction of the new value by which a violated bound is pushed outwards.
const BOUND_WIDENING: f64 = 0.001;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Limits {
    pub lower: f64,
    pub upper: f64,
}

impl Limits {
    pub fn range(&self) -> f64 {
        self.upper - self.lower
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.lower && value <= self.upper
    }
}

/// A single named model parameter. No limits means the parameter is fixed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub value: f64,
    pub limits: Option<Limits>,
}

impl Parameter {
    pub fn free(name: impl Into<String>, value: f64, lower: f64, upper: f64) -> Self {
        Self {
            name: name.into(),
            value,
            limits: Some(Limits { lower, upper }),
        }
    }

    pub fn fixed(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value,
            limits: None,
        }
    }

    pub fn is_fixed(&self) -> bool {
        self.limits.is_none()
    }

    /// Set a new value. A value that escapes the limits drags the violated
    /// limit along with it, 0.1% of the value further out. Fixed parameters
    /// are left untouched.
    pub fn change_value(&mut self, new_value: f64) {
        let Some(limits) = self.limits.as_mut() else {
            return;
        };
        let margin = new_value.abs() * BOUND_WIDENING;
        if new_value < limits.lower {
            limits.lower = new_value - margin;
        }
        if new_value > limits.upper {
            limits.upper = new_value + margin;
        }
        self.value = new_value;
    }
}
