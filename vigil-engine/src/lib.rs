//! Vigil - execution engine for parametric runtime-verification monitors.
//!
//! This crate runs monitors described by [`vigil_spec::Specification`] over a
//! stream of [`Event`]s and reports every violation: explicit ones raised by
//! `error` effects and liveness ones for obligations still open when the
//! stream ends.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                          Engine                             │
//! │   (Arc<Program> + Arc<EngineConfig>, shared by every run)   │
//! ├─────────────────────────────────────────────────────────────┤
//! │                                                             │
//! │   events ──▶ ┌──────────────────────────────────────────┐   │
//! │              │                  Run                     │   │
//! │              │  ┌──────────────┐     ┌───────────────┐  │   │
//! │              │  │ FiringEngine │────▶│   FactStore   │  │   │
//! │              │  │   (rounds)   │◀────│ (live facts)  │  │   │
//! │              │  └──────┬───────┘     └───────────────┘  │   │
//! │              │         │ error / liveness               │   │
//! │              │         ▼                                │   │
//! │              │  ┌──────────────────┐                    │   │
//! │              │  │ ViolationTracker │ ──▶ Report         │   │
//! │              │  └──────────────────┘                    │   │
//! │              └──────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Core Concepts
//!
//! ## Program
//!
//! A [`Program`] is the validated, index-addressed form of a specification.
//! Loading rejects malformed monitors with a [`LoadError`] before any event
//! is seen.
//!
//! ## Facts
//!
//! Each live monitor instance is a fact: a state plus one value per state
//! parameter. `init` states, and `always` states without parameters, start
//! with one fact. `always` facts are never retracted, and an `init` instance
//! keeps its fact when it fires.
//!
//! ## Firing
//!
//! For each event, every instance of every monitor that declares the event
//! tries its transitions: the guard is unified with the event, then
//! conditions are checked against the store. Firing retracts the instance
//! and the facts its conditions consumed, then asserts its effects. `error`
//! effects are recorded as violations.
//!
//! # Example
//!
//! ```rust
//! use vigil_engine::Engine;
//! use vigil_spec::{Event, Monitor, Pattern, Specification, State, Transition};
//!
//! let spec = Specification::new().monitor(
//!     Monitor::new("M1")
//!         .event("command")
//!         .event("succeed")
//!         .state(
//!             State::new("Start").init().always().transition(
//!                 Transition::on(Pattern::new("command").bind("cmd", "x"))
//!                     .effect(Pattern::new("Succeed").bind("c", "x")),
//!             ),
//!         )
//!         .state(
//!             State::new("Succeed").hot().param("c").transition(
//!                 Transition::on(Pattern::new("succeed").bind("cmd", "c"))
//!                     .effect(Pattern::ok()),
//!             ),
//!         ),
//! );
//!
//! let engine = Engine::load(&spec).unwrap();
//! let report = engine.run([
//!     Event::new("command").with("cmd", "A"),
//!     Event::new("command").with("cmd", "B"),
//!     Event::new("succeed").with("cmd", "A"),
//! ]);
//!
//! // B never succeeded.
//! assert_eq!(report.liveness().count(), 1);
//! ```

// Modules
pub mod binding;
pub mod config;
pub mod driver;
pub mod error;
pub mod firing;
pub mod program;
pub mod store;
pub mod tracker;
pub mod types;

// Re-exports for convenience
pub use binding::{unify, FieldSource, Substitution};
pub use config::{AmbiguityPolicy, EngineConfig, EventVisibility};
pub use driver::{Engine, Report, Run};
pub use error::{ConfigError, Error, LoadError, Result, Site};
pub use firing::{EventOutcome, FiringEngine};
pub use program::Program;
pub use store::{Fact, FactStore, Tuple};
pub use tracker::{Violation, ViolationKind, ViolationTracker};
pub use types::{MonitorId, StateId, TransitionId};

pub use vigil_spec::{Event, Specification, Value};
