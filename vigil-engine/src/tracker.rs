//! Violation records collected during a run.

use crate::binding::Substitution;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use vigil_spec::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ViolationKind {
    /// An `error` effect fired.
    Explicit,
    /// A hot instance was still live at end of stream.
    Liveness,
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViolationKind::Explicit => write!(f, "explicit"),
            ViolationKind::Liveness => write!(f, "liveness"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub monitor: String,
    pub kind: ViolationKind,
    /// Source state of the firing transition, or the hot state.
    pub state: String,
    /// Declaration index of the firing transition within `state`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transition: Option<usize>,
    /// Kind of the event that fired the transition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
    /// Zero-based event index; for liveness, the number of events processed.
    pub position: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    pub bindings: BTreeMap<String, Value>,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} violation in {}", self.monitor, self.kind, self.state)?;
        if let Some(transition) = self.transition {
            write!(f, "#{}", transition)?;
        }
        match &self.event {
            Some(event) => write!(f, " on {} at event {}", event, self.position)?,
            None => write!(f, " at end of stream ({} events)", self.position)?,
        }
        if !self.bindings.is_empty() {
            write!(f, " with ")?;
            for (i, (name, value)) in self.bindings.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}={}", name, value)?;
            }
        }
        Ok(())
    }
}

/// Context of an explicit violation, as known by the firing engine.
#[derive(Debug, Clone, Copy)]
pub(crate) struct FiringSite<'a> {
    pub monitor: &'a str,
    pub state: &'a str,
    pub transition: usize,
    pub event: &'a str,
    pub position: usize,
    pub timestamp: Option<DateTime<Utc>>,
}

/// Ordered log of violations for one run.
#[derive(Debug, Clone, Default)]
pub struct ViolationTracker {
    violations: Vec<Violation>,
}

impl ViolationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_explicit(&mut self, site: FiringSite<'_>, subst: &Substitution) {
        self.violations.push(Violation {
            monitor: site.monitor.to_string(),
            kind: ViolationKind::Explicit,
            state: site.state.to_string(),
            transition: Some(site.transition),
            event: Some(site.event.to_string()),
            position: site.position,
            timestamp: site.timestamp,
            bindings: subst.clone().into_map(),
        });
    }

    pub(crate) fn record_liveness(
        &mut self,
        monitor: &str,
        state: &str,
        position: usize,
        bindings: BTreeMap<String, Value>,
    ) {
        self.violations.push(Violation {
            monitor: monitor.to_string(),
            kind: ViolationKind::Liveness,
            state: state.to_string(),
            transition: None,
            event: None,
            position,
            timestamp: None,
            bindings,
        });
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    pub fn len(&self) -> usize {
        self.violations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn count(&self, kind: ViolationKind) -> usize {
        self.violations.iter().filter(|v| v.kind == kind).count()
    }

    pub fn into_violations(self) -> Vec<Violation> {
        self.violations
    }
}
