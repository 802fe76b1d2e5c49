//! Container-model configuration.
//!
//! The model names the methods that read, write, and clear a container.
//! Defaults match the common dictionary surface; hosts override them from
//! a TOML document.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A mutating method together with the argument count it is recognized at.
/// Calls with a different arity are skipped and logged rather than guessed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodSpec {
    pub name: String,
    pub arity: usize,
}

impl MethodSpec {
    pub fn new(name: impl Into<String>, arity: usize) -> Self {
        Self {
            name: name.into(),
            arity,
        }
    }
}

/// Which method names count as reads, keyed writes, and whole-container
/// clears. Single-key element access is always a read and element
/// assignment always a write, independent of this model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ContainerModel {
    pub read_methods: Vec<String>,
    pub write_methods: Vec<MethodSpec>,
    pub clear_methods: Vec<String>,
}

impl Default for ContainerModel {
    fn default() -> Self {
        Self {
            read_methods: vec![
                "Contains".to_string(),
                "ContainsKey".to_string(),
                "TryGetValue".to_string(),
            ],
            write_methods: vec![MethodSpec::new("Add", 2)],
            clear_methods: vec!["Clear".to_string()],
        }
    }
}

impl ContainerModel {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let model: ContainerModel = toml::from_str(text)?;
        log::debug!(
            "container model loaded: {} read, {} write, {} clear methods",
            model.read_methods.len(),
            model.write_methods.len(),
            model.clear_methods.len()
        );
        Ok(model)
    }

    pub fn is_read_method(&self, name: &str) -> bool {
        self.read_methods.iter().any(|m| m == name)
    }

    /// Recognized arity of a write method, or `None` if `name` is not one.
    pub fn write_method_arity(&self, name: &str) -> Option<usize> {
        self.write_methods
            .iter()
            .find(|m| m.name == name)
            .map(|m| m.arity)
    }

    pub fn is_clear_method(&self, name: &str) -> bool {
        self.clear_methods.iter().any(|m| m == name)
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid container model: {0}")]
    Parse(#[from] toml::de::Error),
}
