//! The Display Session
//!
//! A [`Session`] is the explicit owner of everything one screen needs:
//! the widget tree, the router task, the backend's output half, and the
//! shutdown/completion plumbing. It is created at startup from the two
//! backend halves and torn down with [`Session::shutdown`]; nothing here
//! lives in process-global state.
//!
//! # Composition
//!
//! Objects are constructed detached ([`Session::insert`]) and composed
//! into the tree with [`Session::manage`], which permanently binds the
//! parent, allocates the crossed link pair, starts the handler task and
//! registers input interest. There is no un-manage.
//!
//! # Drawing
//!
//! Every cell write translates recursively up the ancestor chain — each
//! hop adds the child's offset and clips against its size — until the
//! parentless root writes through the backend in absolute coordinates.
//! [`Session::refresh`] clears an object's area, redraws its chrome
//! (window borders via the layout's lines and their junctions),
//! recursively refreshes children in registration order, and flushes
//! once at the root of the call.

use tokio::sync::{mpsc, watch};
use tracing::{debug, trace, warn};
use unicode_width::UnicodeWidthChar;

use crate::backend::{InputSource, RawEvent, Screen};
use crate::config::SessionConfig;
use crate::event::{Event, EventKind};
use crate::fabric::{CommLink, Completion, Multiplexer};
use crate::fsm::{FiniteStateMachine, RetCode, StateId};
use crate::geometry::{nexus, Line, Point};
use crate::hints::{Elastic, Gravity};
use crate::layout::{LayoutError, Region};
use crate::node::{Node, NodeKind, NodeRuntime, NodeSpec, WidgetId};
use crate::router::{Router, RouterHandle};
use crate::style::{Attribute, Color, Sigil};
use crate::widget::WidgetTask;
use crate::window::{ContainerTask, Window, WindowEdges};
use thiserror::Error;

/// Errors from tree and drawing operations.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The id does not name an object in this session.
    #[error("unknown widget id")]
    UnknownId,
    /// A coordinate-translation or input-registration operation was
    /// invoked on an object not yet composed into the tree.
    #[error("operation on unmanaged object")]
    Unmanaged,
    /// The object was already composed into the tree.
    #[error("object already managed")]
    AlreadyManaged,
    /// A cell write outside the object's allocated size.
    #[error("cell {x},{y} out of range for {w}x{h} object")]
    OutOfBounds {
        /// Requested column.
        x: i32,
        /// Requested row.
        y: i32,
        /// Object width.
        w: i32,
        /// Object height.
        h: i32,
    },
    /// A leaf widget cannot receive children.
    #[error("object is not a container")]
    NotAContainer,
    /// The operation needs a window's layout.
    #[error("object is not a window")]
    NotAWindow,
    /// The operation needs a state-machine widget.
    #[error("object is not a widget")]
    NotAWidget,
    /// No region with that index in the window's partition.
    #[error("no region {index} in this window")]
    RegionOutOfRange {
        /// The requested index.
        index: usize,
    },
    /// The object's handler task is gone.
    #[error("handler task disconnected")]
    Disconnected,
    /// A layout mutation failed.
    #[error(transparent)]
    Layout(#[from] LayoutError),
}

/// What a node draws over its own area during refresh.
enum Chrome {
    Container {
        border: Option<(Vec<Line>, Vec<Line>)>,
    },
    Widget {
        sigil: Option<Sigil>,
    },
}

/// How a freshly managed node's handler is spawned.
enum SpawnPlan {
    Container,
    Widget {
        fsm: FiniteStateMachine,
        clickable: bool,
        focusable: bool,
    },
}

/// One screen's display session.
pub struct Session<S: Screen> {
    screen: S,
    nodes: Vec<Node>,
    root: WidgetId,
    config: SessionConfig,
    router: RouterHandle,
    fatal_rx: mpsc::Receiver<String>,
    root_rx: mpsc::Receiver<Event>,
    shutdown: watch::Sender<bool>,
    completion: Completion,
    terminated: bool,
}

impl<S: Screen> Session<S> {
    /// Create a session with default configuration.
    pub fn new<I: InputSource>(screen: S, input: I) -> Self {
        Self::with_config(screen, input, SessionConfig::default())
    }

    /// Create a session: size the root window from the screen, wire the
    /// session↔root link, start the root handler and the input router.
    pub fn with_config<I: InputSource>(screen: S, input: I, config: SessionConfig) -> Self {
        let (width, height) = screen.size();
        let (shutdown, _) = watch::channel(false);
        let completion = Completion::new();

        let (router, fatal_rx) = Router::spawn(
            input,
            config.mouse_policy,
            shutdown.subscribe(),
            completion.guard(),
        );

        let mut root_region = Region::new(0, 0, width, height);
        root_region.rightmost = true;
        root_region.bottommost = true;

        let window = Window::new(&root_region, config.root_fg, config.root_bg);
        let mut root_node = Node::from_spec(NodeSpec::Window(window));
        root_node.managed = true;

        let (session_end, root_end) = CommLink::pair(config.channel_capacity);
        let (down_tx, root_rx) = session_end.into_parts();
        let (up_tx, link0_rx) = root_end.into_parts();

        let (mut mux, mux_handle) = Multiplexer::new(shutdown.subscribe());
        mux.register(0, link0_rx);
        root_node.runtime = Some(NodeRuntime {
            down_tx,
            mux: mux_handle,
            next_link: 1,
        });

        tokio::spawn(ContainerTask { mux, up: up_tx }.run(completion.guard()));

        let mut session = Self {
            screen,
            nodes: vec![root_node],
            root: WidgetId(0),
            config,
            router,
            fatal_rx,
            root_rx,
            shutdown,
            completion,
            terminated: false,
        };
        debug!(width, height, "display session started");
        let _ = session.refresh(session.root);
        session
    }

    /// The root window.
    #[must_use]
    pub fn root(&self) -> WidgetId {
        self.root
    }

    /// Insert a detached object into the arena. It stays unmanaged until
    /// [`Session::manage`] composes it into the tree.
    pub fn insert(&mut self, spec: impl Into<NodeSpec>) -> WidgetId {
        let id = WidgetId(self.nodes.len());
        self.nodes.push(Node::from_spec(spec.into()));
        id
    }

    fn node(&self, id: WidgetId) -> Result<&Node, SessionError> {
        self.nodes.get(id.0).ok_or(SessionError::UnknownId)
    }

    fn node_mut(&mut self, id: WidgetId) -> Result<&mut Node, SessionError> {
        self.nodes.get_mut(id.0).ok_or(SessionError::UnknownId)
    }

    /// Compose a detached object into a managed container.
    ///
    /// Marks the child managed, binds its parent back-reference,
    /// allocates its crossed link pair (child link 0 ↔ the container's
    /// next link index), starts the child's handler task, registers its
    /// input interest with the router, and redraws the container. A
    /// child region that does not fit the container is reported but does
    /// not block the operation.
    ///
    /// # Errors
    ///
    /// [`SessionError::AlreadyManaged`] if the child is already in the
    /// tree, [`SessionError::NotAContainer`] if the target is a leaf,
    /// [`SessionError::Unmanaged`] if the target is not in the tree
    /// itself.
    pub async fn manage(
        &mut self,
        container: WidgetId,
        child: WidgetId,
    ) -> Result<(), SessionError> {
        if self.node(child)?.managed {
            return Err(SessionError::AlreadyManaged);
        }
        {
            let c = self.node(container)?;
            if !c.kind.is_container() {
                return Err(SessionError::NotAContainer);
            }
            if !c.managed || c.runtime.is_none() {
                return Err(SessionError::Unmanaged);
            }

            let (cw, ch) = c.region.size();
            let r = self.node(child)?.region;
            if r.x < 0 || r.y < 0 || r.x + r.w > cw || r.y + r.h > ch {
                warn!(
                    child = %child,
                    "region {}x{} at {},{} exceeds container bounds {cw}x{ch}; managing anyway",
                    r.w, r.h, r.x, r.y,
                );
            }
        }

        let capacity = self.config.channel_capacity;
        let (parent_end, child_end) = CommLink::pair(capacity);
        let (down_tx, from_child_rx) = parent_end.into_parts();
        let (up_tx, link0_rx) = child_end.into_parts();

        {
            let rt = self
                .node_mut(container)?
                .runtime
                .as_mut()
                .ok_or(SessionError::Unmanaged)?;
            rt.mux.register(rt.next_link, from_child_rx);
            rt.next_link += 1;
        }

        let (mut mux, mux_handle) = Multiplexer::new(self.shutdown.subscribe());
        mux.register(0, link0_rx);

        let plan = {
            let node = self.node_mut(child)?;
            node.managed = true;
            node.parent = Some(container);
            node.runtime = Some(NodeRuntime {
                down_tx,
                mux: mux_handle,
                next_link: 1,
            });
            match &mut node.kind {
                NodeKind::Window { .. } | NodeKind::Panel => SpawnPlan::Container,
                NodeKind::Widget {
                    clickable,
                    focusable,
                    fsm,
                    ..
                } => SpawnPlan::Widget {
                    fsm: fsm.take().unwrap_or_else(FiniteStateMachine::empty),
                    clickable: *clickable,
                    focusable: *focusable,
                },
            }
        };
        self.node_mut(container)?.children.push(child);

        let guard = self.completion.guard();
        match plan {
            SpawnPlan::Container => {
                tokio::spawn(ContainerTask { mux, up: up_tx }.run(guard));
            }
            SpawnPlan::Widget {
                fsm,
                clickable,
                focusable,
            } => {
                let raw_rx = if clickable {
                    let (w, h) = self.node(child)?.region.size();
                    Some(self.register_clickable(child, &Region::new(0, 0, w, h)).await?)
                } else {
                    None
                };
                let focus_rx = if focusable {
                    let (tx, rx) = mpsc::channel(capacity);
                    self.router.request_focus(tx).await;
                    Some(rx)
                } else {
                    None
                };
                tokio::spawn(
                    WidgetTask {
                        id: child,
                        fsm,
                        mux,
                        up: up_tx,
                        raw_rx,
                        focus_rx,
                    }
                    .run(guard),
                );
            }
        }

        trace!(container = %container, child = %child, "object managed");
        self.refresh(container)?;
        Ok(())
    }

    // ========================================================================
    // Coordinate translation
    // ========================================================================

    /// Paint one cell of an object, translating its local coordinate up
    /// the ancestor chain into absolute screen coordinates.
    ///
    /// # Errors
    ///
    /// [`SessionError::Unmanaged`] anywhere on the chain,
    /// [`SessionError::OutOfBounds`] when a hop's coordinate falls
    /// outside that object's size. The root's own write is unchecked;
    /// out-of-screen writes are the backend's concern.
    pub fn set_cell(
        &mut self,
        id: WidgetId,
        x: i32,
        y: i32,
        glyph: char,
        fg: Attribute,
        bg: Attribute,
    ) -> Result<(), SessionError> {
        let mut cur = id;
        let (mut cx, mut cy) = (x, y);
        loop {
            let node = self.node(cur)?;
            if !node.managed {
                return Err(SessionError::Unmanaged);
            }
            match node.parent {
                Some(parent) => {
                    let (w, h) = node.region.size();
                    if cx < 0 || cx >= w || cy < 0 || cy >= h {
                        return Err(SessionError::OutOfBounds { x: cx, y: cy, w, h });
                    }
                    cx += node.region.x;
                    cy += node.region.y;
                    cur = parent;
                }
                None => {
                    self.screen.write_cell(cx, cy, glyph, fg, bg);
                    return Ok(());
                }
            }
        }
    }

    /// The absolute screen position of an object's origin, accumulated
    /// up the ancestor chain.
    fn absolute_origin(&self, id: WidgetId) -> Result<(i32, i32), SessionError> {
        let mut cur = id;
        let (mut x, mut y) = (0, 0);
        loop {
            let node = self.node(cur)?;
            if !node.managed {
                return Err(SessionError::Unmanaged);
            }
            x += node.region.x;
            y += node.region.y;
            match node.parent {
                Some(parent) => cur = parent,
                None => return Ok((x, y)),
            }
        }
    }

    /// Register a clickable region, given in the object's local frame,
    /// with the router. Returns the channel on which translated mouse
    /// events arrive.
    ///
    /// # Errors
    ///
    /// [`SessionError::Unmanaged`] if the object is not in the tree.
    pub async fn register_clickable(
        &mut self,
        id: WidgetId,
        region: &Region,
    ) -> Result<mpsc::Receiver<RawEvent>, SessionError> {
        let (ox, oy) = self.absolute_origin(id)?;
        let (tx, rx) = mpsc::channel(self.config.channel_capacity);
        self.router
            .register_clickable(ox + region.x, oy + region.y, region.w, region.h, tx)
            .await;
        Ok(rx)
    }

    /// Make a widget the keyboard focus holder, revoking the previous
    /// one. The granted input channel is delivered to the widget's
    /// handler over the fabric.
    ///
    /// # Errors
    ///
    /// [`SessionError::NotAWidget`] for containers,
    /// [`SessionError::Unmanaged`] for detached objects.
    pub async fn request_focus(&mut self, id: WidgetId) -> Result<(), SessionError> {
        {
            let node = self.node(id)?;
            if !matches!(node.kind, NodeKind::Widget { .. }) {
                return Err(SessionError::NotAWidget);
            }
            if !node.managed {
                return Err(SessionError::Unmanaged);
            }
        }
        let (tx, rx) = mpsc::channel(self.config.channel_capacity);
        self.router.request_focus(tx).await;
        self.dispatch(id, Event::new(EventKind::Init).with_channel(rx))
            .await
    }

    /// Send an event down the fabric to an object's handler.
    ///
    /// # Errors
    ///
    /// [`SessionError::Unmanaged`] for detached objects,
    /// [`SessionError::Disconnected`] if the handler exited.
    pub async fn dispatch(&self, id: WidgetId, event: Event) -> Result<(), SessionError> {
        let node = self.node(id)?;
        if !node.managed {
            return Err(SessionError::Unmanaged);
        }
        let rt = node.runtime.as_ref().ok_or(SessionError::Unmanaged)?;
        rt.down_tx
            .send(event)
            .await
            .map_err(|_| SessionError::Disconnected)
    }

    // ========================================================================
    // Drawing
    // ========================================================================

    /// Clear an object's drawable area, redraw its chrome, recursively
    /// refresh its children in registration order (later children paint
    /// over earlier ones), then flush the backend.
    ///
    /// # Errors
    ///
    /// [`SessionError::UnknownId`] for stale ids. Individual clipped
    /// cell writes are not errors.
    pub fn refresh(&mut self, id: WidgetId) -> Result<(), SessionError> {
        self.refresh_inner(id)?;
        self.screen.flush();
        Ok(())
    }

    fn refresh_inner(&mut self, id: WidgetId) -> Result<(), SessionError> {
        let (w, h, color, chrome, children) = {
            let node = self.node(id)?;
            let chrome = match &node.kind {
                NodeKind::Window { layout } if layout.has_border() => Chrome::Container {
                    border: Some((layout.horizontal_lines(), layout.vertical_lines())),
                },
                NodeKind::Window { .. } | NodeKind::Panel => Chrome::Container { border: None },
                NodeKind::Widget { sigils, current, .. } => Chrome::Widget {
                    sigil: current.index().and_then(|i| sigils.get(i)).copied(),
                },
            };
            let (w, h) = node.region.size();
            (w, h, node.color, chrome, node.children.clone())
        };

        match chrome {
            Chrome::Container { border } => {
                self.fill_quietly(id, w, h, ' ', color);
                if let Some((horizontal, vertical)) = border {
                    self.draw_border(id, &horizontal, &vertical, color);
                }
            }
            Chrome::Widget { sigil } => match sigil {
                Some(s) => self.fill_quietly(id, w, h, s.glyph, Color::new(s.fg, s.bg)),
                None => self.fill_quietly(id, w, h, ' ', color),
            },
        }

        for child in children {
            self.refresh_inner(child)?;
        }
        Ok(())
    }

    /// Fill an area, ignoring clipped writes.
    fn fill_quietly(&mut self, id: WidgetId, w: i32, h: i32, glyph: char, color: Color) {
        for y in 0..h {
            for x in 0..w {
                let _ = self.set_cell(id, x, y, glyph, color.fg, color.bg);
            }
        }
    }

    /// Draw every partition line as a run of border glyphs, then paint
    /// each orthogonal crossing with its junction glyph.
    fn draw_border(&mut self, id: WidgetId, horizontal: &[Line], vertical: &[Line], color: Color) {
        let glyphs = self.config.border_glyphs;

        for l in horizontal {
            let (p1, p2) = l.endpoints();
            for x in (p1.x + 1)..p2.x {
                let _ = self.set_cell(id, x, p1.y, glyphs.horizontal, color.fg, color.bg);
            }
        }
        for l in vertical {
            let (p1, p2) = l.endpoints();
            for y in (p1.y + 1)..p2.y {
                let _ = self.set_cell(id, p1.x, y, glyphs.vertical, color.fg, color.bg);
            }
        }
        for h in horizontal {
            for v in vertical {
                if let (Some(p), kind) = nexus(h, v) {
                    if let Some(glyph) = glyphs.for_nexus(kind) {
                        let _ = self.set_cell(id, p.x, p.y, glyph, color.fg, color.bg);
                    }
                }
            }
        }
    }

    /// Clear an object's drawable area to spaces.
    ///
    /// # Errors
    ///
    /// As [`Session::set_cell`].
    pub fn clear(&mut self, id: WidgetId) -> Result<(), SessionError> {
        self.fill(id, ' ')
    }

    /// Fill an object's drawable area with a glyph in its own colors,
    /// stopping at the first failed write.
    ///
    /// # Errors
    ///
    /// As [`Session::set_cell`].
    pub fn fill(&mut self, id: WidgetId, glyph: char) -> Result<(), SessionError> {
        let node = self.node(id)?;
        let (w, h) = node.region.size();
        let color = node.color;
        for x in 0..w {
            for y in 0..h {
                self.set_cell(id, x, y, glyph, color.fg, color.bg)?;
            }
        }
        Ok(())
    }

    /// Print a string at an object-local position, advancing by each
    /// glyph's display width and stopping at the first failed write.
    ///
    /// # Errors
    ///
    /// As [`Session::set_cell`].
    pub fn print(
        &mut self,
        id: WidgetId,
        x: i32,
        y: i32,
        fg: Attribute,
        bg: Attribute,
        msg: &str,
    ) -> Result<(), SessionError> {
        let mut cx = x;
        for c in msg.chars() {
            self.set_cell(id, cx, y, c, fg, bg)?;
            let width = UnicodeWidthChar::width(c).unwrap_or(1);
            cx += i32::try_from(width).unwrap_or(1);
        }
        Ok(())
    }

    /// Draw a coordinate ruler along an object's top row and left
    /// column, for layout debugging.
    ///
    /// # Errors
    ///
    /// As [`Session::set_cell`].
    pub fn draw_scale(&mut self, id: WidgetId) -> Result<(), SessionError> {
        let node = self.node(id)?;
        let (w, h) = node.region.size();
        let color = node.color;
        for x in 0..w {
            let digit = char::from_digit(u32::try_from(x % 10).unwrap_or(0), 10).unwrap_or('0');
            self.set_cell(id, x, 0, digit, color.fg, color.bg)?;
        }
        for y in 0..h {
            let digit = char::from_digit(u32::try_from(y % 10).unwrap_or(0), 10).unwrap_or('0');
            self.set_cell(id, 0, y, digit, color.fg, color.bg)?;
        }
        Ok(())
    }

    /// Does the point, in the object's local frame, fall within its
    /// size?
    ///
    /// # Errors
    ///
    /// [`SessionError::UnknownId`] for stale ids.
    pub fn within(&self, id: WidgetId, p: Point) -> Result<bool, SessionError> {
        let (w, h) = self.node(id)?.region.size();
        Ok(p.x >= 0 && p.x < w && p.y >= 0 && p.y < h)
    }

    // ========================================================================
    // Window layout operations
    // ========================================================================

    /// Split a window's partition: add a line between two of its
    /// existing parallel lines. See [`crate::layout::Layout::add_line`].
    ///
    /// # Errors
    ///
    /// [`SessionError::NotAWindow`] for other kinds; layout errors pass
    /// through.
    pub fn split(
        &mut self,
        id: WidgetId,
        l1: &Line,
        l2: &Line,
        n: i32,
    ) -> Result<Line, SessionError> {
        match &mut self.node_mut(id)?.kind {
            NodeKind::Window { layout } => Ok(layout.add_line(l1, l2, n)?),
            _ => Err(SessionError::NotAWindow),
        }
    }

    /// Add a border to a window: shrink every region by one cell on
    /// interior edges and two on outer edges to make room, then draw
    /// every partition line and junction glyph. The border is redrawn
    /// on every later refresh.
    ///
    /// # Errors
    ///
    /// [`SessionError::NotAWindow`]; [`LayoutError::BorderAlreadyAdded`]
    /// on the second call.
    pub fn add_border(&mut self, id: WidgetId) -> Result<(), SessionError> {
        let (horizontal, vertical, color) = {
            let node = self.node_mut(id)?;
            match &mut node.kind {
                NodeKind::Window { layout } => {
                    layout.add_border()?;
                    (
                        layout.horizontal_lines(),
                        layout.vertical_lines(),
                        node.color,
                    )
                }
                _ => return Err(SessionError::NotAWindow),
            }
        };
        self.draw_border(id, &horizontal, &vertical, color);
        Ok(())
    }

    /// A window's current partition in canonical order.
    ///
    /// # Errors
    ///
    /// [`SessionError::NotAWindow`] for other kinds.
    pub fn regions(&self, id: WidgetId) -> Result<&[Region], SessionError> {
        match &self.node(id)?.kind {
            NodeKind::Window { layout } => Ok(layout.regions()),
            _ => Err(SessionError::NotAWindow),
        }
    }

    /// The `n`th region of a window's partition.
    ///
    /// # Errors
    ///
    /// [`SessionError::RegionOutOfRange`] when `n` exceeds the
    /// partition.
    pub fn region(&self, id: WidgetId, n: usize) -> Result<Region, SessionError> {
        self.regions(id)?
            .get(n)
            .copied()
            .ok_or(SessionError::RegionOutOfRange { index: n })
    }

    /// A window's lines, in creation order.
    ///
    /// # Errors
    ///
    /// [`SessionError::NotAWindow`] for other kinds.
    pub fn lines(&self, id: WidgetId) -> Result<&[Line], SessionError> {
        match &self.node(id)?.kind {
            NodeKind::Window { layout } => Ok(layout.lines()),
            _ => Err(SessionError::NotAWindow),
        }
    }

    /// The edge lines of an object's area, in its local frame.
    ///
    /// # Errors
    ///
    /// [`SessionError::UnknownId`] for stale ids.
    pub fn edges(&self, id: WidgetId) -> Result<WindowEdges, SessionError> {
        let (w, h) = self.node(id)?.region.size();
        Ok(WindowEdges::of(w, h))
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// An object's position and size in its parent's frame.
    ///
    /// # Errors
    ///
    /// [`SessionError::UnknownId`] for stale ids.
    pub fn bounds(&self, id: WidgetId) -> Result<Region, SessionError> {
        Ok(self.node(id)?.region)
    }

    /// An object's color pair.
    ///
    /// # Errors
    ///
    /// [`SessionError::UnknownId`] for stale ids.
    pub fn colors(&self, id: WidgetId) -> Result<Color, SessionError> {
        Ok(self.node(id)?.color)
    }

    /// Change an object's color pair.
    ///
    /// # Errors
    ///
    /// [`SessionError::UnknownId`] for stale ids.
    pub fn set_colors(&mut self, id: WidgetId, fg: Attribute, bg: Attribute) -> Result<(), SessionError> {
        self.node_mut(id)?.color = Color::new(fg, bg);
        Ok(())
    }

    /// An object's gravity hint.
    ///
    /// # Errors
    ///
    /// [`SessionError::UnknownId`] for stale ids.
    pub fn gravity(&self, id: WidgetId) -> Result<Gravity, SessionError> {
        Ok(self.node(id)?.gravity)
    }

    /// Change an object's gravity hint.
    ///
    /// # Errors
    ///
    /// [`SessionError::UnknownId`] for stale ids.
    pub fn set_gravity(&mut self, id: WidgetId, gravity: Gravity) -> Result<(), SessionError> {
        self.node_mut(id)?.gravity = gravity;
        Ok(())
    }

    /// An object's elasticity hint.
    ///
    /// # Errors
    ///
    /// [`SessionError::UnknownId`] for stale ids.
    pub fn elastic(&self, id: WidgetId) -> Result<Elastic, SessionError> {
        Ok(self.node(id)?.elastic)
    }

    /// Change an object's elasticity hint.
    ///
    /// # Errors
    ///
    /// [`SessionError::UnknownId`] for stale ids.
    pub fn set_elastic(&mut self, id: WidgetId, elastic: Elastic) -> Result<(), SessionError> {
        self.node_mut(id)?.elastic = elastic;
        Ok(())
    }

    /// Whether an object has been composed into the tree.
    ///
    /// # Errors
    ///
    /// [`SessionError::UnknownId`] for stale ids.
    pub fn is_managed(&self, id: WidgetId) -> Result<bool, SessionError> {
        Ok(self.node(id)?.managed)
    }

    /// A widget's currently drawn state.
    ///
    /// # Errors
    ///
    /// [`SessionError::NotAWidget`] for containers.
    pub fn widget_state(&self, id: WidgetId) -> Result<StateId, SessionError> {
        match &self.node(id)?.kind {
            NodeKind::Widget { current, .. } => Ok(*current),
            _ => Err(SessionError::NotAWidget),
        }
    }

    // ========================================================================
    // The bubbled event stream
    // ========================================================================

    /// The next event bubbled up to the application: widget output
    /// (tagged with the source widget id and new state in the event
    /// args), surfaced state-machine errors, or a terminal error when
    /// the backend reported a fatal condition.
    ///
    /// Widget state changes are applied to the tree (sigil update plus
    /// targeted redraw) before the event is handed out. Returns `None`
    /// once the session is over.
    pub async fn next_event(&mut self) -> Option<Event> {
        if self.terminated {
            return None;
        }
        tokio::select! {
            fatal = self.fatal_rx.recv() => {
                match fatal {
                    Some(msg) => {
                        self.terminated = true;
                        let mut ev = Event::new(EventKind::Error).with_strs([msg]);
                        ev.outcome.rc = RetCode::Fail;
                        Some(ev)
                    }
                    None => None,
                }
            }
            bubbled = self.root_rx.recv() => {
                match bubbled {
                    Some(ev) => {
                        self.apply_widget_output(&ev);
                        Some(ev)
                    }
                    None => None,
                }
            }
        }
    }

    /// Apply the runtime side of a bubbled widget output: update the
    /// source widget's drawn state and redraw it.
    fn apply_widget_output(&mut self, ev: &Event) {
        if ev.kind != EventKind::Output {
            return;
        }
        let Some(ints) = ev.args.ints() else {
            return;
        };
        let (Some(&raw_id), Some(&raw_state)) = (ints.first(), ints.get(1)) else {
            return;
        };
        let Some(id) = WidgetId::from_i32(raw_id) else {
            return;
        };

        let mut redraw = false;
        if let Some(node) = self.nodes.get_mut(id.0) {
            if let NodeKind::Widget { current, .. } = &mut node.kind {
                *current = StateId(raw_state);
                redraw = true;
            }
        }
        if redraw {
            if let Err(e) = self.refresh(id) {
                warn!(widget = %id, error = %e, "redraw after state change failed");
            }
        }
    }

    /// Tear the session down: signal every handler and the router to
    /// stop, wait for all of them to exit, then close the backend.
    pub async fn shutdown(mut self) {
        debug!("display session shutting down");
        let _ = self.shutdown.send(true);
        self.completion.wait().await;
        self.screen.close();
    }
}
