//! Constraint unification against events and stored facts.
//!
//! Matching is a pure function: a pattern's constraints, a candidate exposing
//! named fields, and a base substitution either produce an extended
//! substitution or fail on the first unsatisfiable constraint.

use serde::Serialize;
use std::collections::BTreeMap;
use vigil_spec::{Constraint, Event, Range, Value};

/// Anything whose fields can be matched by name.
pub trait FieldSource {
    fn field(&self, name: &str) -> Option<&Value>;
}

impl FieldSource for Event {
    fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }
}

/// A stored fact seen through its state's parameter names.
#[derive(Debug, Clone, Copy)]
pub struct FactFields<'a> {
    params: &'a [String],
    values: &'a [Value],
}

impl<'a> FactFields<'a> {
    pub fn new(params: &'a [String], values: &'a [Value]) -> Self {
        Self { params, values }
    }
}

impl FieldSource for FactFields<'_> {
    fn field(&self, name: &str) -> Option<&Value> {
        self.params
            .iter()
            .position(|p| p == name)
            .and_then(|i| self.values.get(i))
    }
}

/// Variable-to-value mapping built up during one transition attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Substitution(BTreeMap<String, Value>);

impl Substitution {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a substitution with an instance's own bindings.
    pub fn seeded(params: &[String], values: &[Value]) -> Self {
        Self(
            params
                .iter()
                .cloned()
                .zip(values.iter().cloned())
                .collect(),
        )
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Bind `name` unless it is already bound; returns false on a conflicting value.
    pub fn bind(&mut self, name: impl Into<String>, value: Value) -> bool {
        let name = name.into();
        match self.0.get(&name) {
            Some(existing) => *existing == value,
            None => {
                self.0.insert(name, value);
                true
            }
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn into_map(self) -> BTreeMap<String, Value> {
        self.0
    }
}

impl FromIterator<(String, Value)> for Substitution {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Match `constraints` against `candidate`, extending `base`.
///
/// A missing field fails the match unless the constraint is a wildcard.
pub fn unify<C: FieldSource + ?Sized>(
    constraints: &[Constraint],
    candidate: &C,
    base: &Substitution,
) -> Option<Substitution> {
    let mut subst = base.clone();
    for constraint in constraints {
        if constraint.is_wildcard() {
            continue;
        }
        let value = candidate.field(&constraint.field)?;
        match &constraint.range {
            Range::Value(literal) => {
                if value != literal {
                    return None;
                }
            }
            Range::Var(name) => {
                if !subst.bind(name.as_str(), value.clone()) {
                    return None;
                }
            }
            Range::Wildcard => {}
        }
    }
    Some(subst)
}

/// Materialise effect arguments under the final substitution.
///
/// Returns `None` if a variable is unbound; programs that passed loading never do this.
pub fn resolve(args: &[Range], subst: &Substitution) -> Option<Vec<Value>> {
    args.iter()
        .map(|range| match range {
            Range::Value(literal) => Some(literal.clone()),
            Range::Var(name) => subst.get(name).cloned(),
            Range::Wildcard => None,
        })
        .collect()
}
