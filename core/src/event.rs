//! Toolkit Events
//!
//! Events are what flows through the communication fabric: input routed
//! down from a container to its children, and widget output bubbling
//! back up. An event's payload is a tagged variant — exactly one slot
//! kind is populated, selected by the producer's first non-default
//! argument, and [`Payload::kind`] reports which.

use tokio::sync::mpsc;

use crate::backend::RawEvent;
use crate::fsm::RetCode;

/// What kind of event this is.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EventKind {
    /// No particular meaning; placeholder.
    #[default]
    None,
    /// Delivered to a handler when it is composed into the tree, and
    /// used to hand a widget an input channel (focus grant).
    Init,
    /// The receiver should wind down.
    Exit,
    /// Something went wrong; the payload describes it.
    Error,
    /// The receiver should reset itself.
    Restart,
    /// A widget produced a result.
    Output,
    /// The sender moved.
    Move,
    /// The sender was resized.
    Resize,
}

/// Which payload slot an event populates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PayloadKind {
    /// Integer values.
    Int,
    /// String values.
    Str,
    /// A raw-input channel endpoint.
    Channel,
    /// A raw backend event passed through unchanged.
    PassThru,
    /// Nothing.
    #[default]
    None,
}

/// The payload of an event: a tagged variant with exactly one populated
/// slot kind.
#[derive(Debug, Default)]
pub enum Payload {
    /// Nothing.
    #[default]
    None,
    /// Integer values.
    Int(Vec<i32>),
    /// String values.
    Str(Vec<String>),
    /// The receiving end of a raw-input channel, e.g. a focus grant.
    Channel(mpsc::Receiver<RawEvent>),
    /// A raw backend event passed through as a widget's result.
    PassThru(RawEvent),
}

impl Payload {
    /// The tag of this payload.
    #[must_use]
    pub fn kind(&self) -> PayloadKind {
        match self {
            Payload::None => PayloadKind::None,
            Payload::Int(_) => PayloadKind::Int,
            Payload::Str(_) => PayloadKind::Str,
            Payload::Channel(_) => PayloadKind::Channel,
            Payload::PassThru(_) => PayloadKind::PassThru,
        }
    }

    /// The integer values, when populated.
    #[must_use]
    pub fn ints(&self) -> Option<&[i32]> {
        match self {
            Payload::Int(v) => Some(v),
            _ => None,
        }
    }

    /// The string values, when populated.
    #[must_use]
    pub fn strs(&self) -> Option<&[String]> {
        match self {
            Payload::Str(v) => Some(v),
            _ => None,
        }
    }
}

/// The result a state function hands back: the return code that drives
/// the state machine, plus whatever payload the widget produced.
#[derive(Debug, Default)]
pub struct Outcome {
    /// State machine transition request.
    pub rc: RetCode,
    /// Produced values.
    pub payload: Payload,
}

/// One toolkit event.
#[derive(Debug, Default)]
pub struct Event {
    /// What kind of event.
    pub kind: EventKind,
    /// Arguments attached by the sender (the runtime tags bubbled widget
    /// output with the source widget id here).
    pub args: Payload,
    /// The result carried by the event.
    pub outcome: Outcome,
}

impl Event {
    /// An event of the given kind with no payload.
    #[must_use]
    pub fn new(kind: EventKind) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }

    /// An [`EventKind::Output`] event carrying a return code, the way a
    /// widget state function reports its result.
    #[must_use]
    pub fn output(rc: RetCode) -> Self {
        Self {
            kind: EventKind::Output,
            args: Payload::None,
            outcome: Outcome {
                rc,
                payload: Payload::None,
            },
        }
    }

    /// Populate the result slot with integers, if still empty.
    #[must_use]
    pub fn with_ints<I: IntoIterator<Item = i32>>(mut self, vals: I) -> Self {
        if self.outcome.payload.kind() == PayloadKind::None {
            self.outcome.payload = Payload::Int(vals.into_iter().collect());
        }
        self
    }

    /// Populate the result slot with strings, if still empty.
    #[must_use]
    pub fn with_strs<I, S>(mut self, vals: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if self.outcome.payload.kind() == PayloadKind::None {
            self.outcome.payload = Payload::Str(vals.into_iter().map(Into::into).collect());
        }
        self
    }

    /// Populate the result slot with a passed-through backend event, if
    /// still empty.
    #[must_use]
    pub fn with_passthru(mut self, raw: RawEvent) -> Self {
        if self.outcome.payload.kind() == PayloadKind::None {
            self.outcome.payload = Payload::PassThru(raw);
        }
        self
    }

    /// Populate the result slot with a raw-input channel, if still empty.
    #[must_use]
    pub fn with_channel(mut self, rx: mpsc::Receiver<RawEvent>) -> Self {
        if self.outcome.payload.kind() == PayloadKind::None {
            self.outcome.payload = Payload::Channel(rx);
        }
        self
    }

    /// Attach argument integers (sender-side tagging).
    #[must_use]
    pub fn with_arg_ints<I: IntoIterator<Item = i32>>(mut self, vals: I) -> Self {
        self.args = Payload::Int(vals.into_iter().collect());
        self
    }

    /// The return code carried by this event.
    #[must_use]
    pub fn rc(&self) -> RetCode {
        self.outcome.rc
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{Key, RawEvent};

    #[test]
    fn test_output_event_defaults() {
        let e = Event::output(RetCode::Ok);
        assert_eq!(e.kind, EventKind::Output);
        assert_eq!(e.rc(), RetCode::Ok);
        assert_eq!(e.outcome.payload.kind(), PayloadKind::None);
    }

    #[test]
    fn test_first_populated_slot_wins() {
        // The first non-default argument selects the payload kind; later
        // attempts do not overwrite it.
        let e = Event::output(RetCode::Repeat)
            .with_ints([1, 2])
            .with_strs(["ignored"]);
        assert_eq!(e.outcome.payload.kind(), PayloadKind::Int);
        assert_eq!(e.outcome.payload.ints(), Some(&[1, 2][..]));
        assert_eq!(e.outcome.payload.strs(), None);
    }

    #[test]
    fn test_passthru_payload() {
        let raw = RawEvent::key(Key::Enter);
        let e = Event::output(RetCode::Ok).with_passthru(raw.clone());
        assert_eq!(e.outcome.payload.kind(), PayloadKind::PassThru);
        match e.outcome.payload {
            Payload::PassThru(got) => assert_eq!(got, raw),
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[test]
    fn test_arg_tagging() {
        let e = Event::output(RetCode::Ok).with_arg_ints([7, 3]);
        assert_eq!(e.args.ints(), Some(&[7, 3][..]));
    }
}
