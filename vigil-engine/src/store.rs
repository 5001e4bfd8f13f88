//! Working memory of live instance facts.
//!
//! The store maps each state to the binding tuples currently live for it.
//! Tuples are kept in insertion order so that enumeration (and therefore
//! firing order) is deterministic across runs.

use crate::binding::{unify, FactFields, Substitution};
use crate::types::StateId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use vigil_spec::{Constraint, Value};

/// Binding values of one instance, ordered like its state's parameters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Tuple(pub Vec<Value>);

impl Tuple {
    /// The tuple of a parameterless state.
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    pub fn values(&self) -> &[Value] {
        &self.0
    }
}

impl From<Vec<Value>> for Tuple {
    fn from(values: Vec<Value>) -> Self {
        Self(values)
    }
}

/// An owned view of a live fact, for inspection and reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Fact {
    pub monitor: String,
    pub state: String,
    /// Parameter name and value pairs, in declaration order.
    pub bindings: Vec<(String, Value)>,
}

#[derive(Debug, Clone, Default)]
struct Partition {
    by_seq: BTreeMap<u64, Tuple>,
    index: HashMap<Tuple, u64>,
}

/// Live facts partitioned by state.
#[derive(Debug, Clone, Default)]
pub struct FactStore {
    partitions: HashMap<StateId, Partition>,
    next_seq: u64,
    len: usize,
}

impl FactStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a fact; returns false if it was already live.
    pub fn assert(&mut self, state: StateId, tuple: Tuple) -> bool {
        let partition = self.partitions.entry(state).or_default();
        if partition.index.contains_key(&tuple) {
            return false;
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        partition.index.insert(tuple.clone(), seq);
        partition.by_seq.insert(seq, tuple);
        self.len += 1;
        true
    }

    /// Remove an exact fact; returns false if it was not live.
    pub fn retract(&mut self, state: StateId, tuple: &Tuple) -> bool {
        let Some(partition) = self.partitions.get_mut(&state) else {
            return false;
        };
        match partition.index.remove(tuple) {
            Some(seq) => {
                partition.by_seq.remove(&seq);
                self.len -= 1;
                true
            }
            None => false,
        }
    }

    /// Whether this exact fact is live.
    pub fn exists(&self, state: StateId, tuple: &Tuple) -> bool {
        self.partitions
            .get(&state)
            .is_some_and(|p| p.index.contains_key(tuple))
    }

    /// Live tuples of `state`, oldest first.
    pub fn instances_of(&self, state: StateId) -> impl Iterator<Item = &Tuple> + '_ {
        self.partitions
            .get(&state)
            .into_iter()
            .flat_map(|p| p.by_seq.values())
    }

    /// Live tuples of `state` that unify with `constraints` under `base`,
    /// each with the substitution it produces.
    pub fn select<'s>(
        &'s self,
        state: StateId,
        params: &'s [String],
        constraints: &'s [Constraint],
        base: &'s Substitution,
    ) -> impl Iterator<Item = (&'s Tuple, Substitution)> + 's {
        self.instances_of(state).filter_map(move |tuple| {
            unify(constraints, &FactFields::new(params, tuple.values()), base)
                .map(|subst| (tuple, subst))
        })
    }

    /// Number of live instances of `state`.
    pub fn count(&self, state: StateId) -> usize {
        self.partitions.get(&state).map_or(0, |p| p.index.len())
    }

    /// Number of live facts across all states.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// All live facts as `(state, tuple)` pairs, ordered by state then age.
    pub fn iter(&self) -> impl Iterator<Item = (StateId, &Tuple)> + '_ {
        let mut states: Vec<_> = self.partitions.keys().copied().collect();
        states.sort();
        states
            .into_iter()
            .flat_map(move |state| self.instances_of(state).map(move |tuple| (state, tuple)))
    }

    /// Drop every fact. Sequence numbers keep counting.
    pub fn clear(&mut self) {
        self.partitions.clear();
        self.len = 0;
    }
}
