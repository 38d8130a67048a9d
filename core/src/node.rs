//! Tree Nodes
//!
//! The session owns every composed object in a flat arena; a
//! [`WidgetId`] is an index into it. A node's parent back-reference is
//! another id — non-owning, used only for coordinate translation and
//! recursive delegation. The live-handler half of a node (its fabric
//! endpoints) is wired when the node is managed.

use std::fmt;

use tokio::sync::mpsc;

use crate::event::Event;
use crate::fabric::{LinkIndex, MuxHandle};
use crate::fsm::{FiniteStateMachine, StateId};
use crate::hints::{default_widget_gravity, default_window_gravity, Elastic, Gravity};
use crate::layout::{Layout, Region};
use crate::style::{Color, Sigil};
use crate::widget::Widget;
use crate::widgets::Panel;
use crate::window::Window;

/// Identifies one composed object within a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct WidgetId(pub(crate) usize);

impl WidgetId {
    /// The id as an event-taggable integer.
    #[must_use]
    pub fn as_i32(self) -> i32 {
        i32::try_from(self.0).unwrap_or(-1)
    }

    /// Recover an id from an event tag.
    #[must_use]
    pub fn from_i32(v: i32) -> Option<Self> {
        usize::try_from(v).ok().map(WidgetId)
    }
}

impl fmt::Display for WidgetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "widget-{}", self.0)
    }
}

/// A detached object ready to be inserted into a session's tree.
#[derive(Debug)]
pub enum NodeSpec {
    /// A bordered container with a line/region layout.
    Window(Window),
    /// A plain container with no chrome.
    Panel(Panel),
    /// A state-machine-driven leaf widget.
    Widget(Widget),
}

impl From<Window> for NodeSpec {
    fn from(w: Window) -> Self {
        NodeSpec::Window(w)
    }
}

impl From<Panel> for NodeSpec {
    fn from(p: Panel) -> Self {
        NodeSpec::Panel(p)
    }
}

impl From<Widget> for NodeSpec {
    fn from(w: Widget) -> Self {
        NodeSpec::Widget(w)
    }
}

/// Kind-specific node state.
#[derive(Debug)]
pub(crate) enum NodeKind {
    /// A window: container with a layout and optional border.
    Window {
        /// The window's partition state.
        layout: Layout,
    },
    /// A panel: container without chrome.
    Panel,
    /// A leaf widget driven by a state machine.
    Widget {
        /// Per-state sigil table, mirrored from the machine for drawing.
        sigils: Vec<Sigil>,
        /// The state currently drawn.
        current: StateId,
        /// Registers a clickable region at init.
        clickable: bool,
        /// Requests keyboard focus at init.
        focusable: bool,
        /// The machine, held until the handler task takes it at init.
        fsm: Option<FiniteStateMachine>,
    },
}

impl NodeKind {
    pub(crate) fn is_container(&self) -> bool {
        matches!(self, NodeKind::Window { .. } | NodeKind::Panel)
    }
}

/// Fabric endpoints of a managed node, owned by the session.
#[derive(Debug)]
pub(crate) struct NodeRuntime {
    /// Sends events down into the node's handler (its link-0 inbound).
    pub down_tx: mpsc::Sender<Event>,
    /// Registers new child links with the node's running handler.
    pub mux: MuxHandle,
    /// The next free link index (0 is the parent link).
    pub next_link: LinkIndex,
}

/// One arena slot.
#[derive(Debug)]
pub(crate) struct Node {
    /// Position and size in the parent's coordinate space.
    pub region: Region,
    /// Color pair.
    pub color: Color,
    /// Parent back-reference; `None` for the root and for detached nodes.
    pub parent: Option<WidgetId>,
    /// Children in registration order, which is also paint order.
    pub children: Vec<WidgetId>,
    /// Whether the node has been composed into the tree.
    pub managed: bool,
    /// Placement hint.
    pub gravity: Gravity,
    /// Stretch hint.
    pub elastic: Elastic,
    /// Kind-specific state.
    pub kind: NodeKind,
    /// Live fabric endpoints, present once managed.
    pub runtime: Option<NodeRuntime>,
}

impl Node {
    pub(crate) fn from_spec(spec: NodeSpec) -> Node {
        match spec {
            NodeSpec::Window(w) => {
                let (region, color, layout) = w.into_parts();
                Node {
                    region,
                    color,
                    parent: None,
                    children: Vec::new(),
                    managed: false,
                    gravity: default_window_gravity(),
                    elastic: Elastic::empty(),
                    kind: NodeKind::Window { layout },
                    runtime: None,
                }
            }
            NodeSpec::Panel(p) => {
                let (region, color) = p.into_parts();
                Node {
                    region,
                    color,
                    parent: None,
                    children: Vec::new(),
                    managed: false,
                    gravity: default_window_gravity(),
                    elastic: Elastic::empty(),
                    kind: NodeKind::Panel,
                    runtime: None,
                }
            }
            NodeSpec::Widget(w) => {
                let (region, color, fsm, clickable, focusable) = w.into_parts();
                Node {
                    region,
                    color,
                    parent: None,
                    children: Vec::new(),
                    managed: false,
                    gravity: default_widget_gravity(),
                    elastic: Elastic::empty(),
                    kind: NodeKind::Widget {
                        sigils: fsm.sigils().to_vec(),
                        current: fsm.state(),
                        clickable,
                        focusable,
                        fsm: Some(fsm),
                    },
                    runtime: None,
                }
            }
        }
    }
}
