//! Weft Core - Channel-Woven Terminal Widget Toolkit
//!
//! This crate is the interaction engine of weft: a hierarchy of windows
//! and widgets, each with its own visual state, reacting to keyboard and
//! mouse input and redrawing themselves. It is completely independent of
//! any concrete terminal library; backends plug in through the two
//! traits in [`backend`].
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      Terminal Backend                        │
//! │        InputSource (events)      Screen (cell writes)        │
//! └───────────────┬──────────────────────────────▲───────────────┘
//!                 │                              │
//!          ┌──────▼──────┐                ┌──────┴──────┐
//!          │   Router    │                │   Session   │
//!          │ focus +     │                │ tree, draw, │
//!          │ clickables  │                │ teardown    │
//!          └──────┬──────┘                └──────▲──────┘
//!                 │ raw events                   │ bubbled output
//!          ┌──────▼───────────────────────────────────────┐
//!          │               Communication Fabric           │
//!          │   crossed channel pairs, one handler task    │
//!          │   per managed object, fan-in multiplexer     │
//!          └──────┬───────────────────────────────▲───────┘
//!                 │ input down                    │ output up
//!          ┌──────▼────────────────────────────────┐
//!          │        Widget state machines          │
//!          │  (state, retcode) -> state + sigil    │
//!          └───────────────────────────────────────┘
//! ```
//!
//! # Key Types
//!
//! - [`Session`]: the explicit display session owning the widget tree
//! - [`FiniteStateMachine`]: per-widget table-driven state machine
//! - [`Layout`]: line-based window partitioning
//! - [`Multiplexer`]: dynamic-arity fan-in over fabric links
//! - [`Widget`], [`Window`], [`Button`], [`Panel`]: composable objects
//!
//! # Quick Start
//!
//! ```ignore
//! use weft_core::backend::headless::{HeadlessScreen, ScriptedInput};
//! use weft_core::{Attribute, Button, Session, Sigil};
//!
//! #[tokio::main]
//! async fn main() {
//!     let (screen, _grid) = HeadlessScreen::new(80, 24);
//!     let (input, _feed) = ScriptedInput::new();
//!     let mut session = Session::new(screen, input);
//!
//!     let root = session.root();
//!     let region = session.region(root, 0).unwrap();
//!     let sigils = [
//!         Sigil::new('#', Attribute::GREEN, Attribute::BLACK),
//!         Sigil::new('o', Attribute::RED, Attribute::BLACK),
//!     ];
//!     let button = session.insert(Button::new(&region, &sigils));
//!     session.manage(root, button).await.unwrap();
//!
//!     while let Some(event) = session.next_event().await {
//!         // react to bubbled widget output
//!     }
//!     session.shutdown().await;
//! }
//! ```
//!
//! # No Terminal Dependencies
//!
//! This crate has **zero** dependencies on any terminal library. The
//! headless backend under [`backend::headless`] drives the whole engine
//! in tests.

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod backend;
pub mod config;
pub mod event;
pub mod fabric;
pub mod fsm;
pub mod geometry;
pub mod hints;
pub mod layout;
pub mod node;
pub mod router;
pub mod session;
pub mod style;
pub mod widget;
pub mod widgets;
pub mod window;

// Re-exports for convenience
pub use backend::{
    InputSource, Key, KeyEvent, Modifiers, MouseButton, MouseEvent, RawEvent, Screen,
};
pub use config::{
    default_config_path, load_config, load_config_from_path, ConfigError, SessionConfig,
};
pub use event::{Event, EventKind, Outcome, Payload, PayloadKind};
pub use fabric::{CommLink, Completion, CompletionGuard, LinkIndex, Multiplexer, MuxHandle};
pub use fsm::{
    FiniteStateMachine, FsmError, InputFn, LogicFn, RetCode, StateFn, StateId, Transition,
};
pub use geometry::{
    coincident, distance, intersection, nexus, orthogonal, parallel, GeometryError, Line, Nexus,
    Orientation, Point,
};
pub use hints::{Elastic, Gravity};
pub use layout::{BorderGlyphs, Layout, LayoutError, Region};
pub use node::{NodeSpec, WidgetId};
pub use router::MousePolicy;
pub use session::{Session, SessionError};
pub use style::{Attribute, Color, Sigil, TextAttr};
pub use widget::Widget;
pub use widgets::{Button, Panel};
pub use window::{Window, WindowEdges};
