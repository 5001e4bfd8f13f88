//! Transition firing.
//!
//! One event is processed in rounds. A round collects every eligible firing
//! against the store as it stood when the round began, then applies them:
//! first all retractions, then all assertions and violation records. With
//! [`EventVisibility::Consumed`] a single round runs; with
//! [`EventVisibility::Cascade`] rounds repeat until nothing fires or a round
//! leaves the store unchanged. An instance fires at most once per event, but
//! one whose conditions failed is tried again in the next round.
//!
//! Firing retracts the instance's own fact unless its state is `init` or
//! `always`, and retracts every fact consumed by a present condition unless
//! that fact's state is `always`.

use crate::binding::{resolve, unify, Substitution};
use crate::config::{AmbiguityPolicy, EngineConfig, EventVisibility};
use crate::program::{ConditionDef, EffectDef, MonitorDef, Program, TransitionDef};
use crate::store::{FactStore, Tuple};
use crate::tracker::{FiringSite, ViolationTracker};
use crate::types::StateId;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use vigil_spec::{Event, Polarity};

/// Counters for one processed event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EventOutcome {
    /// Transitions fired.
    pub fired: usize,
    /// Rounds in which at least one transition fired.
    pub rounds: usize,
    pub asserted: usize,
    pub retracted: usize,
    /// Explicit violations recorded.
    pub violations: usize,
}

impl EventOutcome {
    pub fn is_noop(&self) -> bool {
        self.fired == 0
    }
}

/// An eligible transition, with everything needed to apply it.
#[derive(Debug)]
struct Firing<'p> {
    source: StateId,
    tuple: Tuple,
    transition: &'p TransitionDef,
    substitution: Substitution,
    consumed: Vec<(StateId, Tuple)>,
}

/// Instance keys that already fired for the current event.
#[derive(Debug, Default)]
struct Fired(HashMap<StateId, HashSet<Tuple>>);

impl Fired {
    fn contains(&self, state: StateId, tuple: &Tuple) -> bool {
        self.0.get(&state).is_some_and(|set| set.contains(tuple))
    }

    fn insert(&mut self, state: StateId, tuple: Tuple) {
        self.0.entry(state).or_default().insert(tuple);
    }
}

pub struct FiringEngine<'p> {
    program: &'p Program,
    config: &'p EngineConfig,
}

impl<'p> FiringEngine<'p> {
    pub fn new(program: &'p Program, config: &'p EngineConfig) -> Self {
        Self { program, config }
    }

    /// Process one event against `store`, recording violations in `tracker`.
    pub fn step(
        &self,
        store: &mut FactStore,
        tracker: &mut ViolationTracker,
        event: &Event,
        position: usize,
    ) -> EventOutcome {
        let mut outcome = EventOutcome::default();
        let program: &'p Program = self.program;
        let monitors: Vec<&'p MonitorDef> = program
            .monitors()
            .iter()
            .filter(|m| m.reacts_to(&event.kind))
            .collect();
        if monitors.is_empty() || !program.alphabet().contains(&event.kind) {
            tracing::trace!(event = %event.kind, position, "no monitor handles event");
            return outcome;
        }

        let mut fired = Fired::default();
        loop {
            let firings = self.collect(store, &monitors, event, &fired);
            if firings.is_empty() {
                break;
            }
            for firing in &firings {
                fired.insert(firing.source, firing.tuple.clone());
            }
            outcome.rounds += 1;
            let before = (outcome.asserted, outcome.retracted);
            self.apply(store, tracker, firings, event, position, &mut outcome);
            if self.config.visibility == EventVisibility::Consumed
                || before == (outcome.asserted, outcome.retracted)
            {
                break;
            }
        }

        tracing::trace!(
            event = %event.kind,
            position,
            fired = outcome.fired,
            rounds = outcome.rounds,
            "event processed"
        );
        outcome
    }

    /// Find every eligible firing among instances that have not fired yet.
    fn collect(
        &self,
        store: &FactStore,
        monitors: &[&'p MonitorDef],
        event: &Event,
        fired: &Fired,
    ) -> Vec<Firing<'p>> {
        let program: &'p Program = self.program;
        let mut firings = Vec::new();
        for monitor in monitors {
            for &sid in &monitor.states {
                let state = program.state(sid);
                let pending: Vec<Tuple> = store
                    .instances_of(sid)
                    .filter(|tuple| !fired.contains(sid, tuple))
                    .cloned()
                    .collect();

                for tuple in pending {
                    let base = Substitution::seeded(&state.parameters, tuple.values());
                    let mut eligible = Vec::new();
                    for transition in &state.transitions {
                        if transition.guard.name != event.kind {
                            continue;
                        }
                        let Some(subst) = unify(&transition.guard.constraints, event, &base)
                        else {
                            continue;
                        };
                        let mut consumed = Vec::new();
                        if let Some(substitution) =
                            self.satisfy(store, &transition.conditions, subst, &mut consumed)
                        {
                            eligible.push(Firing {
                                source: sid,
                                tuple: tuple.clone(),
                                transition,
                                substitution,
                                consumed,
                            });
                        }
                    }

                    if eligible.len() > 1 && self.config.ambiguity == AmbiguityPolicy::FirstMatch {
                        tracing::warn!(
                            monitor = %monitor.name,
                            state = %state.name,
                            eligible = eligible.len(),
                            event = %event.kind,
                            "ambiguous transitions, firing the first"
                        );
                        eligible.truncate(1);
                    }
                    firings.extend(eligible);
                }
            }
        }
        firings
    }

    /// Check `conditions` left to right, backtracking over the facts chosen
    /// for present conditions. Chosen facts are left in `consumed`.
    fn satisfy(
        &self,
        store: &FactStore,
        conditions: &[ConditionDef],
        subst: Substitution,
        consumed: &mut Vec<(StateId, Tuple)>,
    ) -> Option<Substitution> {
        let Some((condition, rest)) = conditions.split_first() else {
            return Some(subst);
        };
        let params = &self.program.state(condition.state).parameters;
        match condition.polarity {
            Polarity::Absent => {
                let blocked = store
                    .select(condition.state, params, &condition.constraints, &subst)
                    .next()
                    .is_some();
                if blocked {
                    return None;
                }
                self.satisfy(store, rest, subst, consumed)
            }
            Polarity::Present => {
                for (tuple, extended) in
                    store.select(condition.state, params, &condition.constraints, &subst)
                {
                    consumed.push((condition.state, tuple.clone()));
                    if let Some(done) = self.satisfy(store, rest, extended, consumed) {
                        return Some(done);
                    }
                    consumed.pop();
                }
                None
            }
        }
    }

    fn apply(
        &self,
        store: &mut FactStore,
        tracker: &mut ViolationTracker,
        firings: Vec<Firing<'p>>,
        event: &Event,
        position: usize,
        outcome: &mut EventOutcome,
    ) {
        for firing in &firings {
            if !self.program.state(firing.source).retained_on_fire()
                && store.retract(firing.source, &firing.tuple)
            {
                outcome.retracted += 1;
            }
            for (state, tuple) in &firing.consumed {
                if !self.program.state(*state).always && store.retract(*state, tuple) {
                    outcome.retracted += 1;
                }
            }
        }

        for firing in &firings {
            let source = self.program.state(firing.source);
            let monitor = self.program.monitor(source.monitor).name.as_str();
            outcome.fired += 1;
            tracing::debug!(
                monitor = %monitor,
                state = %source.name,
                transition = firing.transition.id.index,
                event = %event.kind,
                position,
                "transition fired"
            );

            for effect in &firing.transition.effects {
                match effect {
                    EffectDef::Assert { state, args } => {
                        match resolve(args, &firing.substitution) {
                            Some(values) => {
                                if store.assert(*state, Tuple(values)) {
                                    outcome.asserted += 1;
                                }
                            }
                            None => tracing::warn!(
                                monitor = %monitor,
                                state = %source.name,
                                target = %self.program.state(*state).name,
                                "effect arguments could not be resolved"
                            ),
                        }
                    }
                    EffectDef::Error => {
                        let site = FiringSite {
                            monitor,
                            state: &source.name,
                            transition: firing.transition.id.index,
                            event: &event.kind,
                            position,
                            timestamp: event.timestamp,
                        };
                        tracker.record_explicit(site, &firing.substitution);
                        outcome.violations += 1;
                        tracing::debug!(
                            monitor = %monitor,
                            state = %source.name,
                            position,
                            "explicit violation"
                        );
                    }
                    EffectDef::Accept { .. } => {}
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_spec::{Monitor, Pattern, Specification, State, Transition};

    struct Harness {
        program: Program,
        config: EngineConfig,
        store: FactStore,
        tracker: ViolationTracker,
        position: usize,
    }

    impl Harness {
        fn new(spec: Specification, config: EngineConfig) -> Self {
            let program = Program::compile(&spec, &config).unwrap();
            let mut store = FactStore::new();
            for state in program.default_states() {
                store.assert(state.id, Tuple::empty());
            }
            Self {
                program,
                config,
                store,
                tracker: ViolationTracker::new(),
                position: 0,
            }
        }

        fn send(&mut self, event: Event) -> EventOutcome {
            let engine = FiringEngine::new(&self.program, &self.config);
            let outcome = engine.step(&mut self.store, &mut self.tracker, &event, self.position);
            self.position += 1;
            outcome
        }

        fn live(&self, state: &str) -> Vec<Tuple> {
            let id = self.program.find_state("M", state).unwrap();
            self.store.instances_of(id).cloned().collect()
        }
    }

    fn text(values: &[&str]) -> Tuple {
        Tuple(values.iter().map(|v| vigil_spec::Value::text(*v)).collect())
    }

    /// Pending(c) is created per command and resolved by a matching succeed.
    fn request_reply() -> Specification {
        Specification::new().monitor(
            Monitor::new("M")
                .event("command")
                .event("succeed")
                .state(
                    State::new("Root").init().always().transition(
                        Transition::on(Pattern::new("command").bind("cmd", "c"))
                            .effect(Pattern::new("Pending").bind("pc", "c")),
                    ),
                )
                .state(
                    State::new("Pending").hot().param("pc").transition(
                        Transition::on(Pattern::new("succeed").bind("cmd", "pc"))
                            .effect(Pattern::ok()),
                    ),
                ),
        )
    }

    #[test]
    fn instances_are_created_and_consumed() {
        let mut h = Harness::new(request_reply(), EngineConfig::default());
        let out = h.send(Event::new("command").with("cmd", "A"));
        assert_eq!((out.fired, out.asserted, out.retracted), (1, 1, 0));
        assert_eq!(h.live("Pending"), vec![text(&["A"])]);
        assert_eq!(h.live("Root"), vec![Tuple::empty()]);

        let out = h.send(Event::new("succeed").with("cmd", "B"));
        assert!(out.is_noop());

        let out = h.send(Event::new("succeed").with("cmd", "A"));
        assert_eq!((out.fired, out.retracted), (1, 1));
        assert!(h.live("Pending").is_empty());
    }

    #[test]
    fn unobserved_event_is_skipped() {
        let mut h = Harness::new(request_reply(), EngineConfig::default());
        let out = h.send(Event::new("telemetry").with("cmd", "A"));
        assert_eq!(out, EventOutcome::default());
        assert_eq!(h.store.len(), 1);
    }

    #[test]
    fn absent_condition_blocks_duplicates() {
        let spec = Specification::new().monitor(
            Monitor::new("M")
                .event("command")
                .state(
                    State::new("Root").init().always().transition(
                        Transition::on(Pattern::new("command").bind("cmd", "c"))
                            .unless(Pattern::new("Seen").bind("sc", "c"))
                            .effect(Pattern::new("Seen").bind("sc", "c")),
                    ),
                )
                .state(
                    State::new("Root2").init().always().transition(
                        Transition::on(Pattern::new("command").bind("cmd", "c"))
                            .requires(Pattern::new("Seen").bind("sc", "c"))
                            .effect(Pattern::error()),
                    ),
                )
                .state(State::new("Seen").always().param("sc")),
        );
        let mut h = Harness::new(spec, EngineConfig::default());
        let first = h.send(Event::new("command").with("cmd", "A"));
        assert_eq!(first.violations, 0);
        let second = h.send(Event::new("command").with("cmd", "A"));
        assert_eq!(second.violations, 1);
        // `always` facts survive being consumed by a present condition.
        assert_eq!(h.live("Seen"), vec![text(&["A"])]);
        assert_eq!(h.tracker.violations()[0].position, 1);
    }

    #[test]
    fn present_conditions_backtrack() {
        // Link requires A(x) and then B(x); the first A fact has no partner.
        let spec = Specification::new().monitor(
            Monitor::new("M")
                .event("a")
                .event("b")
                .event("link")
                .state(
                    State::new("Root")
                        .init()
                        .always()
                        .transition(
                            Transition::on(Pattern::new("a").bind("v", "x"))
                                .effect(Pattern::new("A").bind("av", "x")),
                        )
                        .transition(
                            Transition::on(Pattern::new("b").bind("v", "x"))
                                .effect(Pattern::new("B").bind("bv", "x")),
                        )
                        .transition(
                            Transition::on(Pattern::new("link"))
                                .requires(Pattern::new("A").bind("av", "x"))
                                .requires(Pattern::new("B").bind("bv", "x"))
                                .effect(Pattern::new("Linked").bind("lv", "x")),
                        ),
                )
                .state(State::new("A").param("av"))
                .state(State::new("B").param("bv"))
                .state(State::new("Linked").param("lv")),
        );
        let mut h = Harness::new(spec, EngineConfig::default());
        h.send(Event::new("a").with("v", 1));
        h.send(Event::new("a").with("v", 2));
        h.send(Event::new("b").with("v", 2));
        let out = h.send(Event::new("link"));
        assert_eq!(out.fired, 1);
        assert_eq!(h.live("Linked"), vec![Tuple(vec![2.into()])]);
        assert_eq!(h.live("A"), vec![Tuple(vec![1.into()])]);
        assert!(h.live("B").is_empty());
    }

    fn ambiguous() -> Specification {
        Specification::new().monitor(
            Monitor::new("M")
                .event("go")
                .state(
                    State::new("Root")
                        .init()
                        .transition(Transition::on(Pattern::new("go")).effect(Pattern::new("Left")))
                        .transition(Transition::on(Pattern::new("go")).effect(Pattern::new("Right"))),
                )
                .state(State::new("Left"))
                .state(State::new("Right")),
        )
    }

    #[test]
    fn fire_all_takes_every_eligible_transition() {
        let mut h = Harness::new(ambiguous(), EngineConfig::default());
        let out = h.send(Event::new("go"));
        assert_eq!((out.fired, out.asserted, out.retracted), (2, 2, 0));
        assert_eq!(h.live("Root"), vec![Tuple::empty()]);
        assert_eq!(h.live("Left").len() + h.live("Right").len(), 2);
    }

    #[test]
    fn first_match_takes_the_first_declared() {
        let config = EngineConfig::default().with_ambiguity(AmbiguityPolicy::FirstMatch);
        let mut h = Harness::new(ambiguous(), config);
        let out = h.send(Event::new("go"));
        assert_eq!(out.fired, 1);
        assert_eq!(h.live("Left").len(), 1);
        assert!(h.live("Right").is_empty());
    }

    fn chain() -> Specification {
        Specification::new().monitor(
            Monitor::new("M")
                .event("tick")
                .state(
                    State::new("First")
                        .init()
                        .transition(Transition::on(Pattern::new("tick")).effect(Pattern::new("Second"))),
                )
                .state(
                    State::new("Second")
                        .transition(Transition::on(Pattern::new("tick")).effect(Pattern::new("Third"))),
                )
                .state(State::new("Third")),
        )
    }

    #[test]
    fn consumed_visibility_hides_event_from_newborns() {
        let mut h = Harness::new(chain(), EngineConfig::default());
        let out = h.send(Event::new("tick"));
        assert_eq!(out.rounds, 1);
        assert_eq!(h.live("Second").len(), 1);
        assert!(h.live("Third").is_empty());
    }

    #[test]
    fn cascade_visibility_lets_newborns_react() {
        let config = EngineConfig::default().with_visibility(EventVisibility::Cascade);
        let mut h = Harness::new(chain(), config);
        let out = h.send(Event::new("tick"));
        assert_eq!((out.rounds, out.fired), (2, 2));
        assert!(h.live("Second").is_empty());
        assert_eq!(h.live("Third").len(), 1);
    }

    #[test]
    fn cascade_self_loop_terminates() {
        let spec = Specification::new().monitor(
            Monitor::new("M").event("tick").state(
                State::new("Loop")
                    .init()
                    .transition(Transition::on(Pattern::new("tick")).effect(Pattern::new("Loop"))),
            ),
        );
        let config = EngineConfig::default().with_visibility(EventVisibility::Cascade);
        let mut h = Harness::new(spec, config);
        let out = h.send(Event::new("tick"));
        assert_eq!((out.fired, out.rounds), (1, 1));
        assert_eq!(h.live("Loop").len(), 1);
    }

    /// Waiter needs a Token that Root only mints on the same event.
    fn token_on_go() -> Specification {
        Specification::new().monitor(
            Monitor::new("M")
                .event("go")
                .state(
                    State::new("Root")
                        .init()
                        .always()
                        .transition(Transition::on(Pattern::new("go")).effect(Pattern::new("Token"))),
                )
                .state(
                    State::new("Waiter").init().transition(
                        Transition::on(Pattern::new("go"))
                            .requires(Pattern::new("Token"))
                            .effect(Pattern::new("Done")),
                    ),
                )
                .state(State::new("Token"))
                .state(State::new("Done")),
        )
    }

    #[test]
    fn cascade_enables_conditions_within_the_event() {
        let config = EngineConfig::default().with_visibility(EventVisibility::Cascade);
        let mut h = Harness::new(token_on_go(), config);
        let out = h.send(Event::new("go"));
        assert_eq!((out.fired, out.rounds), (2, 2));
        assert_eq!(h.live("Done"), vec![Tuple::empty()]);
        assert!(h.live("Token").is_empty());
        assert_eq!(h.live("Waiter"), vec![Tuple::empty()]);
    }

    #[test]
    fn consumed_visibility_checks_conditions_once() {
        let mut h = Harness::new(token_on_go(), EngineConfig::default());
        let out = h.send(Event::new("go"));
        assert_eq!((out.fired, out.rounds), (1, 1));
        assert_eq!(h.live("Token"), vec![Tuple::empty()]);
        assert!(h.live("Done").is_empty());
    }

    #[test]
    fn cascade_stops_when_a_round_changes_nothing() {
        // Both states only raise errors; nothing is asserted or retracted.
        let spec = Specification::new().monitor(
            Monitor::new("M")
                .event("tick")
                .state(
                    State::new("Left")
                        .init()
                        .always()
                        .transition(Transition::on(Pattern::new("tick")).effect(Pattern::error())),
                )
                .state(
                    State::new("Right").init().transition(
                        Transition::on(Pattern::new("tick"))
                            .requires(Pattern::new("Missing"))
                            .effect(Pattern::error()),
                    ),
                )
                .state(State::new("Missing")),
        );
        let config = EngineConfig::default().with_visibility(EventVisibility::Cascade);
        let mut h = Harness::new(spec, config);
        let out = h.send(Event::new("tick"));
        assert_eq!((out.fired, out.rounds, out.violations), (1, 1, 1));
    }

    #[test]
    fn init_instance_survives_firing() {
        let spec = Specification::new().monitor(
            Monitor::new("M").event("tick").state(
                State::new("Start")
                    .init()
                    .transition(Transition::on(Pattern::new("tick")).effect(Pattern::error())),
            ),
        );
        let mut h = Harness::new(spec, EngineConfig::default());
        let first = h.send(Event::new("tick"));
        let second = h.send(Event::new("tick"));
        assert_eq!((first.violations, second.violations), (1, 1));
        assert_eq!(first.retracted + second.retracted, 0);
        assert_eq!(h.tracker.violations().len(), 2);
        assert_eq!(h.live("Start"), vec![Tuple::empty()]);
    }

    #[test]
    fn snapshot_lets_two_instances_share_a_fact() {
        let spec = Specification::new().monitor(
            Monitor::new("M")
                .event("mint")
                .event("go")
                .state(
                    State::new("Root")
                        .init()
                        .always()
                        .transition(Transition::on(Pattern::new("mint")).effect(Pattern::new("Token"))),
                )
                .state(
                    State::new("First").init().transition(
                        Transition::on(Pattern::new("go"))
                            .requires(Pattern::new("Token"))
                            .effect(Pattern::new("DoneFirst")),
                    ),
                )
                .state(
                    State::new("Second").init().transition(
                        Transition::on(Pattern::new("go"))
                            .requires(Pattern::new("Token"))
                            .effect(Pattern::new("DoneSecond")),
                    ),
                )
                .state(State::new("Token"))
                .state(State::new("DoneFirst"))
                .state(State::new("DoneSecond")),
        );
        let mut h = Harness::new(spec, EngineConfig::default());
        h.send(Event::new("mint"));
        let out = h.send(Event::new("go"));
        // Both firings see the single Token; it is retracted once.
        assert_eq!((out.fired, out.asserted, out.retracted), (2, 2, 1));
        let token = h.program.find_state("M", "Token").unwrap();
        assert_eq!(h.store.count(token), 0);
        assert_eq!(h.live("DoneFirst").len(), 1);
        assert_eq!(h.live("DoneSecond").len(), 1);
    }

    #[test]
    fn declared_event_without_guard_is_skipped() {
        let monitors = request_reply()
            .monitors
            .into_iter()
            .map(|m| m.event("heartbeat"))
            .collect();
        let spec = Specification { monitors };
        let mut h = Harness::new(spec, EngineConfig::default());
        assert!(!h.program.alphabet().contains("heartbeat"));
        let out = h.send(Event::new("heartbeat"));
        assert_eq!(out, EventOutcome::default());
    }

    #[test]
    fn reasserted_instance_survives_its_own_retraction() {
        // The dispatcher re-creates Pending(A) while Pending(A) errors on a repeat.
        let spec = Specification::new().monitor(
            Monitor::new("M")
                .event("command")
                .state(
                    State::new("Root").init().always().transition(
                        Transition::on(Pattern::new("command").bind("cmd", "c"))
                            .effect(Pattern::new("Pending").bind("pc", "c")),
                    ),
                )
                .state(
                    State::new("Pending").hot().param("pc").transition(
                        Transition::on(Pattern::new("command").bind("cmd", "pc"))
                            .effect(Pattern::error()),
                    ),
                ),
        );
        let mut h = Harness::new(spec, EngineConfig::default());
        h.send(Event::new("command").with("cmd", "A"));
        let out = h.send(Event::new("command").with("cmd", "A"));
        assert_eq!(out.violations, 1);
        assert_eq!(h.live("Pending"), vec![text(&["A"])]);
    }
}
