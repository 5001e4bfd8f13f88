//! Specification model: monitors, states, transitions, patterns and constraints.
//!
//! This is the data produced by the LogScope front-end. It is plain, owned data;
//! the engine validates it and turns it into an indexed program before a run.
//!
//! The builder-style methods mirror the shape of the generated construction code:
//!
//! ```
//! use vigil_spec::{Monitor, Pattern, State, Transition};
//!
//! let monitor = Monitor::new("M1")
//!     .event("command")
//!     .event("succeed")
//!     .state(
//!         State::new("INTERNAL__1")
//!             .always()
//!             .init()
//!             .transition(
//!                 Transition::on(Pattern::new("command").bind("cmd", "x").literal("kind", "FSW"))
//!                     .effect(Pattern::new("Succeed").bind("c", "x")),
//!             ),
//!     )
//!     .state(
//!         State::new("Succeed")
//!             .hot()
//!             .param("c")
//!             .transition(Transition::on(Pattern::new("succeed").bind("cmd", "c")).effect(Pattern::ok())),
//!     );
//! assert_eq!(monitor.states.len(), 2);
//! ```

use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Effect name that records an explicit violation.
pub const ERROR_EFFECT: &str = "error";

/// Effect name that ends an instance without creating a fact.
pub const ACCEPT_EFFECT: &str = "ok";

/// Variable or field name that matches anything and binds nothing.
pub const WILDCARD: &str = "_";

/// State modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modifier {
    /// An instance exists from the start of processing, without bindings.
    Init,
    /// The instance is never retracted.
    Always,
    /// A live instance at end of stream is a liveness violation.
    Hot,
}

/// Whether a condition requires a fact to exist or to be absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Polarity {
    /// A matching fact must exist; it is consumed when the transition fires.
    Present,
    /// No matching fact may exist.
    Absent,
}

/// Right-hand side of a constraint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Range {
    /// Binds on first sight, requires equality afterwards.
    Var(String),
    /// Requires exact equality.
    Value(Value),
    Wildcard,
}

impl Range {
    /// A variable reference; `_` becomes [`Range::Wildcard`].
    pub fn var(name: impl Into<String>) -> Self {
        let name = name.into();
        if name == WILDCARD {
            Range::Wildcard
        } else {
            Range::Var(name)
        }
    }

    pub fn value(value: impl Into<Value>) -> Self {
        Range::Value(value.into())
    }

    /// True for [`Range::Wildcard`] and for a variable literally named `_`.
    pub fn is_wildcard(&self) -> bool {
        match self {
            Range::Wildcard => true,
            Range::Var(name) => name == WILDCARD,
            Range::Value(_) => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Constraint {
    pub field: String,
    pub range: Range,
}

impl Constraint {
    pub fn new(field: impl Into<String>, range: Range) -> Self {
        Self {
            field: field.into(),
            range,
        }
    }

    /// True when the constraint can never fail nor bind.
    pub fn is_wildcard(&self) -> bool {
        self.field == WILDCARD || self.range.is_wildcard()
    }
}

/// An event or state name with field constraints.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pattern {
    pub name: String,

    #[serde(default)]
    pub constraints: Vec<Constraint>,
}

impl Pattern {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            constraints: Vec::new(),
        }
    }

    /// The `error` effect.
    pub fn error() -> Self {
        Self::new(ERROR_EFFECT)
    }

    /// The `ok` accept effect.
    pub fn ok() -> Self {
        Self::new(ACCEPT_EFFECT)
    }

    pub fn constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    /// Constrain `field` by the variable `var` (`_` is a wildcard).
    pub fn bind(self, field: impl Into<String>, var: impl Into<String>) -> Self {
        self.constraint(Constraint::new(field, Range::var(var)))
    }

    pub fn literal(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.constraint(Constraint::new(field, Range::value(value)))
    }

    pub fn wildcard(self, field: impl Into<String>) -> Self {
        self.constraint(Constraint::new(field, Range::Wildcard))
    }

    /// Variables referenced by this pattern, in order of first use.
    pub fn variables(&self) -> impl Iterator<Item = &str> {
        self.constraints.iter().filter_map(|c| match &c.range {
            Range::Var(name) if name != WILDCARD && c.field != WILDCARD => Some(name.as_str()),
            _ => None,
        })
    }
}

/// A fact-store check gating a transition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Condition {
    pub polarity: Polarity,

    #[serde(flatten)]
    pub pattern: Pattern,
}

impl Condition {
    pub fn present(pattern: Pattern) -> Self {
        Self {
            polarity: Polarity::Present,
            pattern,
        }
    }

    pub fn absent(pattern: Pattern) -> Self {
        Self {
            polarity: Polarity::Absent,
            pattern,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    /// Matches the current event.
    pub guard: Pattern,

    #[serde(default)]
    pub conditions: Vec<Condition>,

    #[serde(default)]
    pub effects: Vec<Pattern>,
}

impl Transition {
    pub fn on(guard: Pattern) -> Self {
        Self {
            guard,
            conditions: Vec::new(),
            effects: Vec::new(),
        }
    }

    /// Require a matching fact, consumed on firing.
    pub fn requires(mut self, pattern: Pattern) -> Self {
        self.conditions.push(Condition::present(pattern));
        self
    }

    /// Require that no matching fact exists.
    pub fn unless(mut self, pattern: Pattern) -> Self {
        self.conditions.push(Condition::absent(pattern));
        self
    }

    pub fn effect(mut self, pattern: Pattern) -> Self {
        self.effects.push(pattern);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct State {
    pub name: String,

    #[serde(default)]
    pub modifiers: BTreeSet<Modifier>,

    /// Names bound when an instance is created; with the name they form the instance key.
    #[serde(default)]
    pub parameters: Vec<String>,

    #[serde(default)]
    pub transitions: Vec<Transition>,
}

impl State {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            modifiers: BTreeSet::new(),
            parameters: Vec::new(),
            transitions: Vec::new(),
        }
    }

    pub fn modifier(mut self, modifier: Modifier) -> Self {
        self.modifiers.insert(modifier);
        self
    }

    pub fn init(self) -> Self {
        self.modifier(Modifier::Init)
    }

    pub fn always(self) -> Self {
        self.modifier(Modifier::Always)
    }

    pub fn hot(self) -> Self {
        self.modifier(Modifier::Hot)
    }

    pub fn param(mut self, name: impl Into<String>) -> Self {
        self.parameters.push(name.into());
        self
    }

    pub fn transition(mut self, transition: Transition) -> Self {
        self.transitions.push(transition);
        self
    }

    pub fn has(&self, modifier: Modifier) -> bool {
        self.modifiers.contains(&modifier)
    }

    pub fn is_init(&self) -> bool {
        self.has(Modifier::Init)
    }

    pub fn is_always(&self) -> bool {
        self.has(Modifier::Always)
    }

    pub fn is_hot(&self) -> bool {
        self.has(Modifier::Hot)
    }
}

/// A named parametric automaton.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Monitor {
    pub name: String,

    /// Event names this monitor reacts to.
    #[serde(default)]
    pub events: BTreeSet<String>,

    pub states: Vec<State>,
}

impl Monitor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            events: BTreeSet::new(),
            states: Vec::new(),
        }
    }

    pub fn event(mut self, name: impl Into<String>) -> Self {
        self.events.insert(name.into());
        self
    }

    pub fn state(mut self, state: State) -> Self {
        self.states.push(state);
        self
    }
}

/// An ordered collection of monitors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Specification {
    pub monitors: Vec<Monitor>,
}

impl Specification {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn monitor(mut self, monitor: Monitor) -> Self {
        self.monitors.push(monitor);
        self
    }

    /// Union of event names referenced by guard patterns across all monitors.
    pub fn event_alphabet(&self) -> BTreeSet<&str> {
        self.monitors
            .iter()
            .flat_map(|m| m.states.iter())
            .flat_map(|s| s.transitions.iter())
            .map(|t| t.guard.name.as_str())
            .collect()
    }
}
