//! Engine configuration.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use vigil_spec::{ACCEPT_EFFECT, ERROR_EFFECT};

/// What happens when several transitions of one instance are eligible for the same event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmbiguityPolicy {
    /// Fire every eligible transition.
    #[default]
    FireAll,
    /// Fire the first eligible transition in declaration order and log the rest.
    FirstMatch,
}

/// Which instances see an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventVisibility {
    /// Only instances live when the event arrived react to it.
    #[default]
    Consumed,
    /// Instances born while processing an event are also matched against it,
    /// round after round, until nothing fires.
    Cascade,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub ambiguity: AmbiguityPolicy,

    #[serde(default)]
    pub visibility: EventVisibility,

    /// Effect name recording an explicit violation.
    #[serde(default = "default_error_marker")]
    pub error_marker: String,

    /// Effect names that end an instance without asserting a fact.
    #[serde(default = "default_accept_markers")]
    pub accept_markers: Vec<String>,

    /// Reject guards on events the monitor does not declare.
    #[serde(default = "default_true")]
    pub require_declared_events: bool,
}

fn default_error_marker() -> String {
    ERROR_EFFECT.to_string()
}

fn default_accept_markers() -> Vec<String> {
    vec![ACCEPT_EFFECT.to_string()]
}

fn default_true() -> bool {
    true
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ambiguity: AmbiguityPolicy::default(),
            visibility: EventVisibility::default(),
            error_marker: default_error_marker(),
            accept_markers: default_accept_markers(),
            require_declared_events: default_true(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml_str(&contents)
    }

    pub fn from_yaml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(source)?)
    }

    pub fn with_ambiguity(mut self, ambiguity: AmbiguityPolicy) -> Self {
        self.ambiguity = ambiguity;
        self
    }

    pub fn with_visibility(mut self, visibility: EventVisibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn with_accept_marker(mut self, marker: impl Into<String>) -> Self {
        let marker = marker.into();
        if !self.accept_markers.contains(&marker) {
            self.accept_markers.push(marker);
        }
        self
    }

    pub fn with_undeclared_events(mut self) -> Self {
        self.require_declared_events = false;
        self
    }

    pub fn is_error_marker(&self, name: &str) -> bool {
        self.error_marker == name
    }

    pub fn is_accept_marker(&self, name: &str) -> bool {
        self.accept_markers.iter().any(|m| m == name)
    }

    /// True for any effect name that does not denote a state.
    pub fn is_sentinel(&self, name: &str) -> bool {
        self.is_error_marker(name) || self.is_accept_marker(name)
    }
}
