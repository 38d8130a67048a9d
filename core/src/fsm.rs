//! Table-Driven Widget State Machines
//!
//! Every widget owns one finite state machine. States are dense indices
//! into parallel sigil and state-function tables; transitions are an
//! ordered list of `(src, rc, dst)` triples resolved by first match in
//! insertion order, so insertion order is semantically significant when
//! duplicate `(src, rc)` pairs exist.
//!
//! A state function consumes either a raw backend input event or an
//! already-abstracted toolkit event, and returns an output [`Event`]
//! whose return code the caller feeds back into [`FiniteStateMachine::next_state`].
//! Transition lookup failures are reported, non-fatal, and leave the
//! current state unchanged.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::backend::{MouseButton, RawEvent};
use crate::event::Event;
use crate::style::Sigil;

/// Errors from transition lookup.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FsmError {
    /// No transition entry matches the current state and return code.
    #[error("no transition from state {state} for {rc:?}")]
    NoTransition {
        /// The machine's current state.
        state: StateId,
        /// The offered return code.
        rc: RetCode,
    },
    /// The matched entry names a destination outside the state table.
    #[error("transition destination {dst} out of range (states: {states})")]
    DestinationOutOfRange {
        /// The out-of-range destination.
        dst: StateId,
        /// Number of states in the table.
        states: usize,
    },
}

/// The vocabulary a state function uses to request its own machine's
/// transition.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RetCode {
    /// Transition to the exit state.
    Fail = -1,
    /// Advance; in a round-robin machine, move to the next active state.
    #[default]
    Ok = 0,
    /// Stay in (or re-enter) the current state.
    Repeat = 1,
    /// Like `Repeat`, but the widget produces no output event.
    Nop = 2,
}

/// A dense state index. Negative values mean "no state"; an empty
/// machine's entry point is [`StateId::NONE`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StateId(pub i32);

impl StateId {
    /// The "no state" sentinel.
    pub const NONE: StateId = StateId(-1);

    /// The table index for this state, when it names one.
    #[must_use]
    pub fn index(self) -> Option<usize> {
        usize::try_from(self.0).ok()
    }
}

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One transition rule.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Transition {
    /// Source state.
    pub src: StateId,
    /// Return code that triggers this rule.
    pub rc: RetCode,
    /// Destination state.
    pub dst: StateId,
}

/// A state function consuming a raw backend input event.
pub type InputFn = Arc<dyn Fn(&RawEvent) -> Event + Send + Sync>;

/// A state function consuming an abstract toolkit event.
pub type LogicFn = Arc<dyn Fn(&Event) -> Event + Send + Sync>;

/// A state's behavior, polymorphic over the two input flavors.
#[derive(Clone)]
pub enum StateFn {
    /// Reacts to raw backend input.
    Input(InputFn),
    /// Reacts to abstract toolkit events.
    Logic(LogicFn),
}

impl StateFn {
    /// Wrap a closure over raw backend input.
    pub fn on_input<F>(f: F) -> Self
    where
        F: Fn(&RawEvent) -> Event + Send + Sync + 'static,
    {
        StateFn::Input(Arc::new(f))
    }

    /// Wrap a closure over abstract toolkit events.
    pub fn on_event<F>(f: F) -> Self
    where
        F: Fn(&Event) -> Event + Send + Sync + 'static,
    {
        StateFn::Logic(Arc::new(f))
    }
}

impl fmt::Debug for StateFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateFn::Input(_) => f.write_str("StateFn::Input"),
            StateFn::Logic(_) => f.write_str("StateFn::Logic"),
        }
    }
}

/// A table-driven finite state machine mapping `(current state, return
/// code)` to the next state, with one sigil per state for drawing.
#[derive(Clone, Debug)]
pub struct FiniteStateMachine {
    current: StateId,
    entry: StateId,
    exit: StateId,
    sigils: Vec<Sigil>,
    state_fns: Vec<StateFn>,
    transitions: Vec<Transition>,
}

impl FiniteStateMachine {
    /// An empty machine: no states, no transitions, entry point
    /// [`StateId::NONE`]. Populate it with [`Self::add_state`] and
    /// [`Self::add_transition`] for behavior richer than the round-robin
    /// default.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            current: StateId::NONE,
            entry: StateId::NONE,
            exit: StateId::NONE,
            sigils: Vec::new(),
            state_fns: Vec::new(),
            transitions: Vec::new(),
        }
    }

    /// Build the default round-robin machine from a widget's active-state
    /// sigils (e.g. a toggle's positions).
    ///
    /// Synthesizes an entry state (`Ok` → first active, `Fail` → exit), a
    /// terminal exit state with no outgoing transitions, and one active
    /// state per sigil wired so `Repeat`/`Nop` self-loop, `Fail` goes to
    /// exit, and `Ok` advances to the next active state, wrapping from
    /// the last back to the first. Active states treat a left mouse press
    /// as `Ok` (advance) and everything else as `Nop`.
    ///
    /// With no sigils this returns [`Self::empty`].
    #[must_use]
    pub fn round_robin(active_sigils: &[Sigil]) -> Self {
        let mut fsm = Self::empty();
        if active_sigils.is_empty() {
            return fsm;
        }

        let entry_fn = StateFn::on_input(|_| Event::output(RetCode::Ok));
        let exit_fn = StateFn::on_input(|_| Event::output(RetCode::Ok));
        let active_fn = StateFn::on_input(|raw| match raw {
            RawEvent::Mouse(m) if m.button == MouseButton::Left => {
                Event::output(RetCode::Ok).with_ints([1])
            }
            _ => Event::output(RetCode::Nop),
        });

        let glyph = active_sigils[0];
        let entry = fsm.add_state(entry_fn, glyph);
        let exit = fsm.add_state(exit_fn, glyph);

        let first_active = fsm.add_state(active_fn.clone(), glyph);
        fsm.add_transition(entry, RetCode::Ok, first_active);
        fsm.add_transition(entry, RetCode::Fail, exit);
        // The exit state is terminal: no outgoing transitions.

        fsm.add_transition(first_active, RetCode::Fail, exit);
        fsm.add_transition(first_active, RetCode::Repeat, first_active);
        fsm.add_transition(first_active, RetCode::Nop, first_active);

        let mut active = first_active;
        for sigil in &active_sigils[1..] {
            let next = fsm.add_state(active_fn.clone(), *sigil);
            fsm.add_transition(active, RetCode::Ok, next);
            fsm.add_transition(next, RetCode::Fail, exit);
            fsm.add_transition(next, RetCode::Repeat, next);
            fsm.add_transition(next, RetCode::Nop, next);
            active = next;
        }
        fsm.add_transition(active, RetCode::Ok, first_active);

        fsm.entry = entry;
        fsm.exit = exit;
        fsm.current = entry;
        fsm
    }

    /// Append a state, returning its dense index.
    pub fn add_state(&mut self, f: StateFn, sigil: Sigil) -> StateId {
        let id = StateId(i32::try_from(self.sigils.len()).unwrap_or(i32::MAX));
        self.state_fns.push(f);
        self.sigils.push(sigil);
        id
    }

    /// Append a transition rule.
    ///
    /// The destination is not validated here; a dangling destination is
    /// reported by [`Self::next_state`] when the rule matches. A dangling
    /// source simply never matches.
    pub fn add_transition(&mut self, src: StateId, rc: RetCode, dst: StateId) {
        self.transitions.push(Transition { src, rc, dst });
    }

    /// Resolve the next state for a return code: the first transition in
    /// insertion order matching `(current, rc)`.
    ///
    /// # Errors
    ///
    /// [`FsmError::NoTransition`] when no entry matches,
    /// [`FsmError::DestinationOutOfRange`] when the matched destination
    /// exceeds the state table. The current state is unchanged either way.
    pub fn next_state(&self, rc: RetCode) -> Result<StateId, FsmError> {
        for t in &self.transitions {
            if t.src == self.current && t.rc == rc {
                let in_range = t.dst.index().is_some_and(|i| i < self.state_fns.len());
                if !in_range {
                    return Err(FsmError::DestinationOutOfRange {
                        dst: t.dst,
                        states: self.state_fns.len(),
                    });
                }
                return Ok(t.dst);
            }
        }
        Err(FsmError::NoTransition {
            state: self.current,
            rc,
        })
    }

    /// Resolve and commit the next state.
    ///
    /// # Errors
    ///
    /// As [`Self::next_state`]; the current state is unchanged on error.
    pub fn advance(&mut self, rc: RetCode) -> Result<StateId, FsmError> {
        let next = self.next_state(rc)?;
        self.current = next;
        Ok(next)
    }

    /// The current state.
    #[must_use]
    pub fn state(&self) -> StateId {
        self.current
    }

    /// Force the current state.
    pub fn set_state(&mut self, s: StateId) {
        self.current = s;
    }

    /// The entry state.
    #[must_use]
    pub fn entry(&self) -> StateId {
        self.entry
    }

    /// The exit state.
    #[must_use]
    pub fn exit_state(&self) -> StateId {
        self.exit
    }

    /// The sigil for a state.
    #[must_use]
    pub fn sigil(&self, s: StateId) -> Option<&Sigil> {
        self.sigils.get(s.index()?)
    }

    /// The full per-state sigil table.
    #[must_use]
    pub fn sigils(&self) -> &[Sigil] {
        &self.sigils
    }

    /// The state function for a state.
    #[must_use]
    pub fn state_fn(&self, s: StateId) -> Option<&StateFn> {
        self.state_fns.get(s.index()?)
    }

    /// Number of states in the table.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state_fns.len()
    }

    /// Whether the machine has no states.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state_fns.is_empty()
    }
}
