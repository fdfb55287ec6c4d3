// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use proptest::prelude::*;

#[yare::parameterized(
    pending_starting  = { SessionStatus::Pending, SessionStatus::Starting },
    pending_crashed   = { SessionStatus::Pending, SessionStatus::Crashed },
    pending_lost      = { SessionStatus::Pending, SessionStatus::Lost },
    starting_running  = { SessionStatus::Starting, SessionStatus::Running },
    starting_stopping = { SessionStatus::Starting, SessionStatus::Stopping },
    running_stopping  = { SessionStatus::Running, SessionStatus::Stopping },
    running_crashed   = { SessionStatus::Running, SessionStatus::Crashed },
    running_completed = { SessionStatus::Running, SessionStatus::Completed },
    stopping_stopped  = { SessionStatus::Stopping, SessionStatus::Stopped },
    stopping_crashed  = { SessionStatus::Stopping, SessionStatus::Crashed },
    lost_stopping     = { SessionStatus::Lost, SessionStatus::Stopping },
    lost_stopped      = { SessionStatus::Lost, SessionStatus::Stopped },
)]
fn allowed_transitions(from: SessionStatus, to: SessionStatus) {
    assert!(from.can_transition(to), "{from} -> {to} should be allowed");
}

#[yare::parameterized(
    running_pending    = { SessionStatus::Running, SessionStatus::Pending },
    stopped_running    = { SessionStatus::Stopped, SessionStatus::Running },
    crashed_running    = { SessionStatus::Crashed, SessionStatus::Running },
    completed_stopping = { SessionStatus::Completed, SessionStatus::Stopping },
    pending_running    = { SessionStatus::Pending, SessionStatus::Running },
    lost_running       = { SessionStatus::Lost, SessionStatus::Running },
    lost_crashed       = { SessionStatus::Lost, SessionStatus::Crashed },
)]
fn rejected_transitions(from: SessionStatus, to: SessionStatus) {
    assert!(!from.can_transition(to), "{from} -> {to} should be rejected");
}

#[test]
fn terminal_states_accept_nothing() {
    for from in SessionStatus::all() {
        if !from.is_terminal() {
            continue;
        }
        for to in SessionStatus::all() {
            assert!(!from.can_transition(to), "{from} is terminal, -> {to}");
        }
    }
}

#[test]
fn live_states_can_become_lost() {
    for from in SessionStatus::all() {
        if from.is_live() {
            assert!(from.can_transition(SessionStatus::Lost), "{from} -> lost");
        }
    }
}

#[test]
fn wire_form_round_trips() {
    for status in SessionStatus::all() {
        let parsed: SessionStatus = status.as_str().parse().unwrap();
        assert_eq!(parsed, status);
        let json = serde_json::to_string(&status).unwrap();
        assert_eq!(json, format!("\"{}\"", status.as_str()));
    }
}

#[test]
fn unknown_status_string_is_an_error() {
    assert!("exploded".parse::<SessionStatus>().is_err());
}

#[test]
fn stats_observe_counts_each_bucket() {
    let mut stats = SessionStats::default();
    stats.observe(SessionStatus::Running);
    stats.observe(SessionStatus::Running);
    stats.observe(SessionStatus::Crashed);
    assert_eq!(stats.total, 3);
    assert_eq!(stats.running, 2);
    assert_eq!(stats.crashed, 1);
    assert_eq!(stats.pending, 0);
}

fn arb_status() -> impl Strategy<Value = SessionStatus> {
    prop::sample::select(SessionStatus::all().to_vec())
}

proptest! {
    /// Any walk through the transition table that reaches a terminal
    /// state stays there, and every intermediate hop is individually
    /// allowed by the table.
    #[test]
    fn walks_never_leave_terminal_states(steps in prop::collection::vec(arb_status(), 1..20)) {
        let mut current = SessionStatus::Pending;
        for next in steps {
            if current.can_transition(next) {
                current = next;
            }
            if current.is_terminal() {
                for to in SessionStatus::all() {
                    prop_assert!(!current.can_transition(to));
                }
            }
        }
    }
}
