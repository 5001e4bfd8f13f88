//! Compiled, index-addressed form of a [`Specification`].
//!
//! Compilation resolves every state name used by conditions and effects into a
//! [`StateId`], aligns effect constraints with the target state's parameters,
//! and rejects malformed monitors with a [`LoadError`]. The result is immutable
//! and shared by every run of an engine.

use crate::config::EngineConfig;
use crate::error::{LoadError, Site};
use crate::types::{MonitorId, StateId, TransitionId};
use std::collections::{BTreeSet, HashMap, HashSet};
use vigil_spec::{Constraint, Monitor, Pattern, Polarity, Range, Specification, State, WILDCARD};

#[derive(Debug, Clone)]
pub struct MonitorDef {
    pub id: MonitorId,
    pub name: String,
    pub events: BTreeSet<String>,
    /// States in declaration order.
    pub states: Vec<StateId>,
}

impl MonitorDef {
    pub fn reacts_to(&self, event: &str) -> bool {
        self.events.contains(event)
    }
}

#[derive(Debug, Clone)]
pub struct StateDef {
    pub id: StateId,
    pub monitor: MonitorId,
    pub name: String,
    pub parameters: Vec<String>,
    pub init: bool,
    pub always: bool,
    pub hot: bool,
    pub transitions: Vec<TransitionDef>,
}

impl StateDef {
    /// States whose fact exists before the first event.
    pub fn has_default_fact(&self) -> bool {
        self.init || (self.always && self.parameters.is_empty())
    }

    /// Whether an instance keeps its own fact after firing.
    pub fn retained_on_fire(&self) -> bool {
        self.init || self.always
    }
}

#[derive(Debug, Clone)]
pub struct TransitionDef {
    pub id: TransitionId,
    pub guard: Pattern,
    pub conditions: Vec<ConditionDef>,
    pub effects: Vec<EffectDef>,
}

#[derive(Debug, Clone)]
pub struct ConditionDef {
    pub polarity: Polarity,
    pub state: StateId,
    pub constraints: Vec<Constraint>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EffectDef {
    /// Instantiate `state`; `args` holds one range per target parameter, in order.
    Assert { state: StateId, args: Vec<Range> },
    /// Record an explicit violation.
    Error,
    /// End the instance without creating a fact.
    Accept { marker: String },
}

/// The validated arena of monitors, states and transitions.
#[derive(Debug, Clone)]
pub struct Program {
    monitors: Vec<MonitorDef>,
    states: Vec<StateDef>,
    alphabet: BTreeSet<String>,
}

impl Program {
    pub fn compile(spec: &Specification, config: &EngineConfig) -> Result<Self, LoadError> {
        let mut seen_monitors = HashSet::new();
        for monitor in &spec.monitors {
            if !seen_monitors.insert(monitor.name.as_str()) {
                return Err(LoadError::DuplicateMonitor {
                    monitor: monitor.name.clone(),
                });
            }
        }

        let mut monitors = Vec::with_capacity(spec.monitors.len());
        let mut states = Vec::new();

        for (index, monitor) in spec.monitors.iter().enumerate() {
            let id = MonitorId(index);
            let names = declare_states(monitor, states.len(), config)?;
            let mut ids = Vec::with_capacity(monitor.states.len());
            for state in &monitor.states {
                ids.push(StateId(states.len()));
                states.push(StateDef {
                    id: StateId(states.len()),
                    monitor: id,
                    name: state.name.clone(),
                    parameters: state.parameters.clone(),
                    init: state.is_init(),
                    always: state.is_always(),
                    hot: state.is_hot(),
                    transitions: Vec::new(),
                });
            }

            // Parameters of every state in this monitor, needed to check
            // conditions and effects that reference later-declared states.
            let params: HashMap<StateId, Vec<String>> = ids
                .iter()
                .map(|s| (*s, states[s.index()].parameters.clone()))
                .collect();

            for (state, sid) in monitor.states.iter().zip(&ids) {
                let resolver = Resolver {
                    monitor,
                    state,
                    config,
                    names: &names,
                    params: &params,
                };
                states[sid.index()].transitions = resolver.transitions(*sid)?;
            }

            let mut events = monitor.events.clone();
            if !config.require_declared_events {
                // Guards then declare their own events.
                events.extend(
                    monitor
                        .states
                        .iter()
                        .flat_map(|s| &s.transitions)
                        .map(|t| t.guard.name.clone()),
                );
            }

            monitors.push(MonitorDef {
                id,
                name: monitor.name.clone(),
                events,
                states: ids,
            });
        }

        let alphabet = spec
            .event_alphabet()
            .into_iter()
            .map(str::to_string)
            .collect();

        tracing::info!(
            monitors = monitors.len(),
            states = states.len(),
            "program compiled"
        );

        Ok(Self {
            monitors,
            states,
            alphabet,
        })
    }

    pub fn monitors(&self) -> &[MonitorDef] {
        &self.monitors
    }

    pub fn monitor(&self, id: MonitorId) -> &MonitorDef {
        &self.monitors[id.index()]
    }

    pub fn states(&self) -> &[StateDef] {
        &self.states
    }

    pub fn state(&self, id: StateId) -> &StateDef {
        &self.states[id.index()]
    }

    pub fn transition(&self, id: TransitionId) -> &TransitionDef {
        &self.state(id.state).transitions[id.index]
    }

    /// Look up a state by monitor and state name.
    pub fn find_state(&self, monitor: &str, state: &str) -> Option<StateId> {
        let monitor = self.monitors.iter().find(|m| m.name == monitor)?;
        monitor
            .states
            .iter()
            .copied()
            .find(|id| self.state(*id).name == state)
    }

    /// Event names referenced by any guard.
    pub fn alphabet(&self) -> &BTreeSet<String> {
        &self.alphabet
    }

    /// States that receive a fact before the first event.
    pub fn default_states(&self) -> impl Iterator<Item = &StateDef> {
        self.states.iter().filter(|s| s.has_default_fact())
    }
}

/// Build the name table of one monitor and check per-state declarations.
fn declare_states(
    monitor: &Monitor,
    offset: usize,
    config: &EngineConfig,
) -> Result<HashMap<String, StateId>, LoadError> {
    let mut names = HashMap::new();
    for (i, state) in monitor.states.iter().enumerate() {
        if config.is_sentinel(&state.name) {
            return Err(LoadError::ReservedStateName {
                monitor: monitor.name.clone(),
                state: state.name.clone(),
            });
        }
        if names
            .insert(state.name.clone(), StateId(offset + i))
            .is_some()
        {
            return Err(LoadError::DuplicateState {
                monitor: monitor.name.clone(),
                state: state.name.clone(),
            });
        }
        let mut seen = HashSet::new();
        for param in &state.parameters {
            if !seen.insert(param.as_str()) {
                return Err(LoadError::DuplicateParameter {
                    monitor: monitor.name.clone(),
                    state: state.name.clone(),
                    parameter: param.clone(),
                });
            }
        }
        if state.is_init() && !state.parameters.is_empty() {
            return Err(LoadError::InitWithParameters {
                monitor: monitor.name.clone(),
                state: state.name.clone(),
            });
        }
    }
    Ok(names)
}

struct Resolver<'a> {
    monitor: &'a Monitor,
    state: &'a State,
    config: &'a EngineConfig,
    names: &'a HashMap<String, StateId>,
    params: &'a HashMap<StateId, Vec<String>>,
}

impl Resolver<'_> {
    fn transitions(&self, sid: StateId) -> Result<Vec<TransitionDef>, LoadError> {
        let mut out = Vec::with_capacity(self.state.transitions.len());
        for (index, transition) in self.state.transitions.iter().enumerate() {
            let site = Site::new(&self.monitor.name, &self.state.name, index);

            let event = &transition.guard.name;
            if self.config.require_declared_events && !self.monitor.events.contains(event) {
                return Err(LoadError::UndeclaredEvent {
                    site,
                    event: event.clone(),
                });
            }

            let mut bound: HashSet<&str> =
                self.state.parameters.iter().map(String::as_str).collect();
            bound.extend(transition.guard.variables());

            let mut conditions = Vec::with_capacity(transition.conditions.len());
            for condition in &transition.conditions {
                let name = &condition.pattern.name;
                if self.config.is_sentinel(name) {
                    return Err(LoadError::SentinelCondition {
                        site,
                        name: name.clone(),
                    });
                }
                let target = self.lookup(&site, name)?;
                for constraint in &condition.pattern.constraints {
                    if constraint.field != WILDCARD
                        && !self.params[&target].contains(&constraint.field)
                    {
                        return Err(LoadError::UnknownParameter {
                            site,
                            target: name.clone(),
                            field: constraint.field.clone(),
                        });
                    }
                }
                // Absent conditions are existential; their variables stay local.
                if condition.polarity == Polarity::Present {
                    bound.extend(condition.pattern.variables());
                }
                conditions.push(ConditionDef {
                    polarity: condition.polarity,
                    state: target,
                    constraints: condition.pattern.constraints.clone(),
                });
            }

            let mut effects = Vec::with_capacity(transition.effects.len());
            for effect in &transition.effects {
                effects.push(self.effect(&site, effect, &bound)?);
            }

            out.push(TransitionDef {
                id: TransitionId::new(sid, index),
                guard: transition.guard.clone(),
                conditions,
                effects,
            });
        }
        Ok(out)
    }

    fn lookup(&self, site: &Site, name: &str) -> Result<StateId, LoadError> {
        self.names
            .get(name)
            .copied()
            .ok_or_else(|| LoadError::UnknownState {
                site: site.clone(),
                target: name.to_string(),
            })
    }

    fn effect(
        &self,
        site: &Site,
        effect: &Pattern,
        bound: &HashSet<&str>,
    ) -> Result<EffectDef, LoadError> {
        let name = &effect.name;
        if self.config.is_error_marker(name) {
            return Ok(EffectDef::Error);
        }
        if self.config.is_accept_marker(name) {
            return Ok(EffectDef::Accept {
                marker: name.clone(),
            });
        }

        let target = self.lookup(site, name)?;
        let params = &self.params[&target];

        for constraint in &effect.constraints {
            if constraint.is_wildcard() {
                return Err(LoadError::WildcardEffect {
                    site: site.clone(),
                    target: name.clone(),
                    field: constraint.field.clone(),
                });
            }
            if !params.contains(&constraint.field) {
                return Err(LoadError::UnknownParameter {
                    site: site.clone(),
                    target: name.clone(),
                    field: constraint.field.clone(),
                });
            }
            if let Range::Var(variable) = &constraint.range {
                if !bound.contains(variable.as_str()) {
                    return Err(LoadError::UnboundVariable {
                        site: site.clone(),
                        target: name.clone(),
                        variable: variable.clone(),
                    });
                }
            }
        }

        let mut args = Vec::with_capacity(params.len());
        for param in params {
            let range = effect
                .constraints
                .iter()
                .find(|c| &c.field == param)
                .map(|c| c.range.clone())
                .ok_or_else(|| LoadError::MissingParameter {
                    site: site.clone(),
                    target: name.clone(),
                    parameter: param.clone(),
                })?;
            args.push(range);
        }

        Ok(EffectDef::Assert {
            state: target,
            args,
        })
    }
}
