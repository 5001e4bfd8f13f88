//! Trace driver.
//!
//! An [`Engine`] owns a compiled [`Program`] and starts independent [`Run`]s
//! over it. A run feeds events to the firing engine one at a time and, when
//! finished, checks hot instances and returns a [`Report`].

use crate::config::EngineConfig;
use crate::error::{LoadError, Result};
use crate::firing::{EventOutcome, FiringEngine};
use crate::program::Program;
use crate::store::{Fact, FactStore, Tuple};
use crate::tracker::{Violation, ViolationKind, ViolationTracker};
use futures_util::{Stream, StreamExt};
use serde::Serialize;
use std::borrow::Borrow;
use std::path::Path;
use std::sync::Arc;
use vigil_spec::{Event, Specification};

/// A loaded monitor program, cheap to clone and share between threads.
#[derive(Debug, Clone)]
pub struct Engine {
    program: Arc<Program>,
    config: Arc<EngineConfig>,
}

impl Engine {
    /// Compile `spec` with the default configuration
    pub fn load(spec: &Specification) -> std::result::Result<Self, LoadError> {
        Self::with_config(spec, EngineConfig::default())
    }

    /// Compile `spec` under `config`. The configuration also affects
    /// validation, see [`EngineConfig::require_declared_events`].
    pub fn with_config(
        spec: &Specification,
        config: EngineConfig,
    ) -> std::result::Result<Self, LoadError> {
        let program = Program::compile(spec, &config)?;
        Ok(Self {
            program: Arc::new(program),
            config: Arc::new(config),
        })
    }

    /// Read and compile a specification document
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let spec = Specification::from_file(path)?;
        Ok(Self::load(&spec)?)
    }

    /// Read a specification document and a YAML engine configuration
    pub fn from_files<P: AsRef<Path>, Q: AsRef<Path>>(spec: P, config: Q) -> Result<Self> {
        let spec = Specification::from_file(spec)?;
        let config = EngineConfig::from_file(config)?;
        Ok(Self::with_config(&spec, config)?)
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Begin a run with a fresh store holding the default facts.
    pub fn start(&self) -> Run {
        let mut store = FactStore::new();
        for state in self.program.default_states() {
            store.assert(state.id, Tuple::empty());
        }
        Run {
            program: Arc::clone(&self.program),
            config: Arc::clone(&self.config),
            store,
            tracker: ViolationTracker::new(),
            position: 0,
        }
    }

    /// Process a complete trace
    pub fn run<I>(&self, events: I) -> Report
    where
        I: IntoIterator,
        I::Item: Borrow<Event>,
    {
        let mut run = self.start();
        for event in events {
            run.process(event.borrow());
        }
        run.finish()
    }

    /// Process a trace delivered as an async stream
    pub async fn run_stream<S>(&self, events: S) -> Report
    where
        S: Stream<Item = Event>,
    {
        let mut run = self.start();
        let mut events = std::pin::pin!(events);
        while let Some(event) = events.next().await {
            run.process(&event);
        }
        run.finish()
    }
}

/// One pass of a program over one event stream.
///
/// Dropping a run abandons it without a liveness check.
#[derive(Debug)]
pub struct Run {
    program: Arc<Program>,
    config: Arc<EngineConfig>,
    store: FactStore,
    tracker: ViolationTracker,
    position: usize,
}

impl Run {
    /// Feed the next event of the stream.
    pub fn process(&mut self, event: &Event) -> EventOutcome {
        let engine = FiringEngine::new(&self.program, &self.config);
        let outcome = engine.step(&mut self.store, &mut self.tracker, event, self.position);
        self.position += 1;
        outcome
    }

    /// Live facts, ordered by state declaration then age.
    pub fn facts(&self) -> Vec<Fact> {
        self.store
            .iter()
            .map(|(sid, tuple)| {
                let state = self.program.state(sid);
                Fact {
                    monitor: self.program.monitor(state.monitor).name.clone(),
                    state: state.name.clone(),
                    bindings: state
                        .parameters
                        .iter()
                        .cloned()
                        .zip(tuple.values().iter().cloned())
                        .collect(),
                }
            })
            .collect()
    }

    /// Raw working memory, addressed by [`crate::StateId`].
    pub fn store(&self) -> &FactStore {
        &self.store
    }

    /// Explicit violations recorded so far.
    pub fn violations(&self) -> &[Violation] {
        self.tracker.violations()
    }

    /// Number of events processed so far.
    pub fn position(&self) -> usize {
        self.position
    }

    /// End the stream: report every live hot instance, then discard all facts.
    pub fn finish(mut self) -> Report {
        for state in self.program.states().iter().filter(|s| s.hot) {
            let monitor = &self.program.monitor(state.monitor).name;
            for tuple in self.store.instances_of(state.id) {
                tracing::debug!(
                    monitor = %monitor,
                    state = %state.name,
                    "hot instance live at end of stream"
                );
                let bindings = state
                    .parameters
                    .iter()
                    .cloned()
                    .zip(tuple.values().iter().cloned())
                    .collect();
                self.tracker
                    .record_liveness(monitor, &state.name, self.position, bindings);
            }
        }
        self.store.clear();

        let report = Report {
            events_processed: self.position,
            violations: self.tracker.into_violations(),
        };
        tracing::info!(
            events = report.events_processed,
            violations = report.violations.len(),
            "run finished"
        );
        report
    }
}

/// Outcome of a finished run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    pub events_processed: usize,
    /// Explicit violations in firing order, then liveness violations.
    pub violations: Vec<Violation>,
}

impl Report {
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn explicit(&self) -> impl Iterator<Item = &Violation> + '_ {
        self.of_kind(ViolationKind::Explicit)
    }

    pub fn liveness(&self) -> impl Iterator<Item = &Violation> + '_ {
        self.of_kind(ViolationKind::Liveness)
    }

    fn of_kind(&self, kind: ViolationKind) -> impl Iterator<Item = &Violation> + '_ {
        self.violations.iter().filter(move |v| v.kind == kind)
    }
}
