//! The Generic State-Machine-Driven Widget
//!
//! A [`Widget`] is a leaf of the tree: a region, a color pair, and a
//! finite state machine fixed at construction. Once managed, its handler
//! task turns raw input into abstract output events: the current state's
//! function runs, its return code drives the machine, and anything but a
//! `Nop` bubbles up the fabric tagged with the widget's id and new state
//! so the runtime can redraw the right sigil.
//!
//! Transition-table errors are surfaced to the widget's owner as `Error`
//! events and leave the machine's state unchanged.

use tokio::sync::mpsc;
use tracing::trace;

use crate::backend::RawEvent;
use crate::event::{Event, EventKind, Payload};
use crate::fabric::{CompletionGuard, Multiplexer};
use crate::fsm::{FiniteStateMachine, RetCode, StateFn};
use crate::layout::Region;
use crate::node::WidgetId;
use crate::style::{Attribute, Color};

/// A detached generic widget, ready for [`crate::session::Session::insert`].
#[derive(Debug)]
pub struct Widget {
    region: Region,
    color: Color,
    fsm: FiniteStateMachine,
    clickable: bool,
    focusable: bool,
}

impl Widget {
    /// Create a widget over a region, with the machine that drives it.
    #[must_use]
    pub fn new(region: &Region, fsm: FiniteStateMachine) -> Self {
        Self {
            region: *region,
            color: Color::new(Attribute::WHITE, Attribute::BLACK),
            fsm,
            clickable: false,
            focusable: false,
        }
    }

    /// Override the color pair.
    #[must_use]
    pub fn with_colors(mut self, fg: Attribute, bg: Attribute) -> Self {
        self.color = Color::new(fg, bg);
        self
    }

    /// Register a clickable region with the router at init.
    #[must_use]
    pub fn clickable(mut self) -> Self {
        self.clickable = true;
        self
    }

    /// Request keyboard focus at init.
    #[must_use]
    pub fn accepts_focus(mut self) -> Self {
        self.focusable = true;
        self
    }

    pub(crate) fn into_parts(self) -> (Region, Color, FiniteStateMachine, bool, bool) {
        (
            self.region,
            self.color,
            self.fsm,
            self.clickable,
            self.focusable,
        )
    }
}

/// The handler task of one managed widget.
pub(crate) struct WidgetTask {
    pub id: WidgetId,
    pub fsm: FiniteStateMachine,
    pub mux: Multiplexer,
    pub up: mpsc::Sender<Event>,
    pub raw_rx: Option<mpsc::Receiver<RawEvent>>,
    pub focus_rx: Option<mpsc::Receiver<RawEvent>>,
}

/// Receive from an optional channel; a widget without one parks here
/// forever while the other select branches stay live.
async fn next_raw(rx: &mut Option<mpsc::Receiver<RawEvent>>) -> Option<RawEvent> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

impl WidgetTask {
    pub(crate) async fn run(mut self, _guard: CompletionGuard) {
        loop {
            tokio::select! {
                fab = self.mux.recv() => {
                    match fab {
                        None => break,
                        Some((_, ev)) => {
                            if !self.on_fabric(ev).await {
                                break;
                            }
                        }
                    }
                }
                raw = next_raw(&mut self.raw_rx) => {
                    match raw {
                        Some(raw) => {
                            if !self.on_raw(&raw).await {
                                break;
                            }
                        }
                        None => self.raw_rx = None,
                    }
                }
                raw = next_raw(&mut self.focus_rx) => {
                    match raw {
                        Some(raw) => {
                            if !self.on_raw(&raw).await {
                                break;
                            }
                        }
                        None => {
                            // The router dropped our channel: focus was
                            // handed to someone else.
                            trace!(widget = %self.id, "keyboard focus revoked");
                            self.focus_rx = None;
                        }
                    }
                }
            }
        }
        trace!(widget = %self.id, "widget handler exited");
    }

    /// An event arrived on the fabric (from the parent). Returns `false`
    /// when the handler must stop.
    async fn on_fabric(&mut self, ev: Event) -> bool {
        match ev.kind {
            EventKind::Exit => false,
            EventKind::Init => {
                if let Payload::Channel(rx) = ev.outcome.payload {
                    self.focus_rx = Some(rx);
                }
                true
            }
            _ => self.on_event(&ev).await,
        }
    }

    /// Dispatch a raw backend event to the current state's function.
    async fn on_raw(&mut self, raw: &RawEvent) -> bool {
        let out = match self.fsm.state_fn(self.fsm.state()) {
            Some(StateFn::Input(f)) => f(raw),
            Some(StateFn::Logic(f)) => {
                f(&Event::new(EventKind::Output).with_passthru(raw.clone()))
            }
            None => return true,
        };
        self.step(out).await
    }

    /// Dispatch an abstract event to the current state's function.
    async fn on_event(&mut self, ev: &Event) -> bool {
        let out = match self.fsm.state_fn(self.fsm.state()) {
            Some(StateFn::Logic(f)) => f(ev),
            Some(StateFn::Input(f)) => match &ev.outcome.payload {
                Payload::PassThru(raw) => f(raw),
                _ => return true,
            },
            None => return true,
        };
        self.step(out).await
    }

    /// Feed a state function's result back into the machine and bubble
    /// the outcome.
    async fn step(&mut self, out: Event) -> bool {
        let rc = out.rc();
        match self.fsm.advance(rc) {
            Ok(next) => {
                if rc == RetCode::Nop {
                    return true;
                }
                let out = out.with_arg_ints([self.id.as_i32(), next.0]);
                self.up.send(out).await.is_ok()
            }
            Err(e) => {
                // The machine's state is unchanged; report upward.
                let mut ev = Event::new(EventKind::Error)
                    .with_strs([e.to_string()])
                    .with_arg_ints([self.id.as_i32(), self.fsm.state().0]);
                ev.outcome.rc = RetCode::Fail;
                self.up.send(ev).await.is_ok()
            }
        }
    }
}
