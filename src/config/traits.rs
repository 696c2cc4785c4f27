use crate::error::EvolveError;
use serde::{Deserialize, Serialize};

/// Trait for configuration sections
pub trait ConfigSection: Serialize + for<'de> Deserialize<'de> + Default + Clone {
    fn section_name() -> &'static str;
    fn validate(&self) -> Result<(), EvolveError>;
}

pub(crate) fn invalid(section: &str, message: impl AsRef<str>) -> EvolveError {
    EvolveError::Configuration(format!("[{}] {}", section, message.as_ref()))
}
