//! Shared contract monitors and event helpers for the integration tests.

#![allow(dead_code)]

use vigil_spec::{Event, Monitor, Pattern, Specification, State, Transition};

/// A command must succeed before it is issued again.
pub fn monitor_m1() -> Monitor {
    Monitor::new("M1")
        .event("command")
        .event("succeed")
        .state(
            State::new("INTERNAL__1")
                .always()
                .init()
                .transition(
                    Transition::on(Pattern::new("command").bind("cmd", "x").literal("kind", "FSW"))
                        .effect(Pattern::new("Succeed").bind("c", "x")),
                )
                .transition(
                    Transition::on(Pattern::new("succeed").bind("cmd", "x"))
                        .unless(Pattern::new("Succeed").bind("c", "x"))
                        .effect(Pattern::error()),
                ),
        )
        .state(
            State::new("Succeed")
                .hot()
                .param("c")
                .transition(
                    Transition::on(Pattern::new("succeed").bind("cmd", "c")).effect(Pattern::ok()),
                )
                .transition(
                    Transition::on(Pattern::new("command").bind("cmd", "c"))
                        .effect(Pattern::error()),
                ),
        )
}

fn dispatch_state() -> State {
    State::new("Dispatch")
        .hot()
        .param("dc")
        .param("dn")
        .transition(
            Transition::on(Pattern::new("cancel").bind("cmd", "dc").bind("nr", "dn"))
                .effect(Pattern::ok()),
        )
        .transition(
            Transition::on(Pattern::new("dispatch").bind("cmd", "dc").bind("nr", "dn"))
                .effect(Pattern::new("Succeed").bind("sc", "dc").bind("sn", "dn")),
        )
}

fn close_on(state: State) -> State {
    state.transition(
        Transition::on(Pattern::new("close").bind("cmd", "cc").bind("nr", "cn"))
            .effect(Pattern::ok()),
    )
}

/// Dispatched commands succeed once and are then closed.
pub fn monitor_m2() -> Monitor {
    Monitor::new("M2")
        .event("command")
        .event("cancel")
        .event("dispatch")
        .event("fail")
        .event("succeed")
        .event("close")
        .state(
            State::new("INTERNAL__1")
                .always()
                .init()
                .transition(
                    Transition::on(
                        Pattern::new("command")
                            .bind("cmd", "c")
                            .bind("nr", "n")
                            .literal("kind", "FSW"),
                    )
                    .effect(Pattern::new("Dispatch").bind("dc", "c").bind("dn", "n")),
                )
                .transition(
                    Transition::on(Pattern::new("succeed").bind("cmd", "c").bind("nr", "n"))
                        .unless(Pattern::new("Succeed").bind("sc", "c").bind("sn", "n"))
                        .effect(Pattern::error()),
                ),
        )
        .state(dispatch_state())
        .state(
            State::new("Succeed")
                .hot()
                .param("sc")
                .param("sn")
                .transition(
                    Transition::on(Pattern::new("succeed").bind("cmd", "sc").bind("nr", "sn"))
                        .effect(Pattern::new("NoMoreSuccess").bind("nc", "sc").bind("nn", "sn"))
                        .effect(Pattern::new("Close").bind("cc", "sc").bind("cn", "sn")),
                )
                .transition(
                    Transition::on(
                        Pattern::new("command")
                            .bind("cmd", "sc")
                            .bind("nr", "_")
                            .literal("kind", "FSW"),
                    )
                    .effect(Pattern::error()),
                )
                .transition(
                    Transition::on(Pattern::new("fail").bind("cmd", "sc").bind("nr", "sn"))
                        .effect(Pattern::error()),
                ),
        )
        .state(
            State::new("NoMoreSuccess").param("nc").param("nn").transition(
                Transition::on(Pattern::new("succeed").bind("cmd", "nc").bind("nr", "nn"))
                    .effect(Pattern::error()),
            ),
        )
        .state(close_on(State::new("Close").hot().param("cc").param("cn")))
}

/// Like M2, but a second success while closing is an error and there is no
/// `NoMoreSuccess` state.
pub fn monitor_m4() -> Monitor {
    Monitor::new("M4")
        .event("command")
        .event("cancel")
        .event("dispatch")
        .event("fail")
        .event("succeed")
        .event("close")
        .state(
            State::new("INTERNAL__1").always().init().transition(
                Transition::on(
                    Pattern::new("command")
                        .bind("cmd", "c")
                        .bind("nr", "n")
                        .literal("kind", "FSW"),
                )
                .effect(Pattern::new("Dispatch").bind("dc", "c").bind("dn", "n")),
            ),
        )
        .state(dispatch_state())
        .state(
            State::new("Succeed")
                .hot()
                .param("sc")
                .param("sn")
                .transition(
                    Transition::on(Pattern::new("succeed").bind("cmd", "sc").bind("nr", "sn"))
                        .effect(Pattern::new("Close").bind("cc", "sc").bind("cn", "sn")),
                )
                .transition(
                    Transition::on(
                        Pattern::new("command")
                            .bind("cmd", "sc")
                            .bind("nr", "_")
                            .literal("kind", "FSW"),
                    )
                    .effect(Pattern::error()),
                )
                .transition(
                    Transition::on(Pattern::new("fail").bind("cmd", "sc").bind("nr", "sn"))
                        .effect(Pattern::error()),
                ),
        )
        .state(close_on(
            State::new("Close").hot().param("cc").param("cn").transition(
                Transition::on(Pattern::new("succeed").bind("cmd", "cc").bind("nr", "cn"))
                    .effect(Pattern::error()),
            ),
        ))
}

pub fn contract() -> Specification {
    Specification::new().monitor(monitor_m1()).monitor(monitor_m2())
}

pub fn only(monitor: Monitor) -> Specification {
    Specification::new().monitor(monitor)
}

pub fn command(cmd: &str, nr: i64) -> Event {
    Event::new("command")
        .with("cmd", cmd)
        .with("nr", nr)
        .with("kind", "FSW")
}

/// An event of `kind` carrying `cmd` and `nr`.
pub fn step(kind: &str, cmd: &str, nr: i64) -> Event {
    Event::new(kind).with("cmd", cmd).with("nr", nr)
}
