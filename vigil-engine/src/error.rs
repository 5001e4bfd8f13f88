//! Error types for the vigil engine.

use std::fmt;
use thiserror::Error;
use vigil_spec::SpecError;

/// Location of a transition in the source specification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Site {
    pub monitor: String,
    pub state: String,
    /// Declaration index of the transition within its state.
    pub transition: usize,
}

impl Site {
    pub fn new(monitor: impl Into<String>, state: impl Into<String>, transition: usize) -> Self {
        Self {
            monitor: monitor.into(),
            state: state.into(),
            transition,
        }
    }
}

impl fmt::Display for Site {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}#{}", self.monitor, self.state, self.transition)
    }
}

/// Malformed monitor definitions, detected before any event is processed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    #[error("Monitor {monitor} is defined more than once")]
    DuplicateMonitor { monitor: String },

    #[error("State {state} is defined more than once in monitor {monitor}")]
    DuplicateState { monitor: String, state: String },

    #[error("State {state} in monitor {monitor} uses the reserved effect name")]
    ReservedStateName { monitor: String, state: String },

    #[error("Parameter {parameter} is declared twice by {monitor}/{state}")]
    DuplicateParameter {
        monitor: String,
        state: String,
        parameter: String,
    },

    #[error("Init state {monitor}/{state} cannot declare parameters")]
    InitWithParameters { monitor: String, state: String },

    #[error("{site}: guard event {event} is not declared by the monitor")]
    UndeclaredEvent { site: Site, event: String },

    #[error("{site}: no state named {target}")]
    UnknownState { site: Site, target: String },

    #[error("{site}: condition cannot reference the effect marker {name}")]
    SentinelCondition { site: Site, name: String },

    #[error("{site}: {target} has no parameter {field}")]
    UnknownParameter {
        site: Site,
        target: String,
        field: String,
    },

    #[error("{site}: effect {target} leaves parameter {parameter} unassigned")]
    MissingParameter {
        site: Site,
        target: String,
        parameter: String,
    },

    #[error("{site}: effect {target} assigns field {field} from a wildcard")]
    WildcardEffect {
        site: Site,
        target: String,
        field: String,
    },

    #[error("{site}: effect {target} uses unbound variable {variable}")]
    UnboundVariable {
        site: Site,
        target: String,
        variable: String,
    },
}

/// Engine configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    ParseError(#[from] serde_yaml::Error),
}

/// Top-level engine error
#[derive(Debug, Error)]
pub enum Error {
    /// Specification document could not be read
    #[error("Specification error: {0}")]
    Spec(#[from] SpecError),

    /// Specification was read but is malformed
    #[error("Load error: {0}")]
    Load(#[from] LoadError),

    /// Engine configuration could not be read
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type using the engine [`Error`]
pub type Result<T> = std::result::Result<T, Error>;
