//! Index types addressing the compiled program arena.
//!
//! Identifiers are plain indices into a [`Program`](crate::program::Program).
//! They are only meaningful for the program that produced them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Monitor index, in specification order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MonitorId(pub usize);

impl MonitorId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for MonitorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "m{}", self.0)
    }
}

/// State index across the whole program.
///
/// States of one monitor occupy a contiguous range, so ordering by `StateId`
/// follows monitor order and then declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StateId(pub usize);

impl StateId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s{}", self.0)
    }
}

/// A transition, addressed by its source state and declaration index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TransitionId {
    pub state: StateId,
    pub index: usize,
}

impl TransitionId {
    pub fn new(state: StateId, index: usize) -> Self {
        Self { state, index }
    }
}

impl fmt::Display for TransitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.state, self.index)
    }
}
