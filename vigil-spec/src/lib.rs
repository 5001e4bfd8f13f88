//! Specification model for vigil.
//!
//! This crate provides the data types shared between the monitor front-end,
//! event adapters and the execution engine: the monitor description
//! (monitors, states, transitions, patterns, constraints), scalar values and
//! events.
//!
//! Specifications are either built in code (see [`model`]) or loaded from a
//! YAML or JSON document with the same shape as the serde derives.

pub mod error;
pub mod event;
pub mod model;
pub mod value;

pub use error::SpecError;
pub use event::Event;
pub use model::{
    Condition, Constraint, Modifier, Monitor, Pattern, Polarity, Range, Specification, State,
    Transition, ACCEPT_EFFECT, ERROR_EFFECT, WILDCARD,
};
pub use value::Value;

use std::path::Path;

impl Specification {
    /// Parse a specification from YAML.
    pub fn from_yaml_str(source: &str) -> Result<Self, SpecError> {
        Ok(serde_yaml::from_str(source)?)
    }

    /// Parse a specification from JSON.
    pub fn from_json_str(source: &str) -> Result<Self, SpecError> {
        Ok(serde_json::from_str(source)?)
    }

    /// Load a specification file; `.json` files are read as JSON, anything else as YAML.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SpecError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json_str(&contents),
            _ => Self::from_yaml_str(&contents),
        }
    }
}
