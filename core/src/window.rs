//! Windows and the Container Handler
//!
//! A window is a container with a line/region [`Layout`] and, once
//! requested, a drawn border. Its handler task is the default container
//! handler: events arriving from children bubble upward unchanged on the
//! parent link; events arriving from the parent are consumed locally.

use tokio::sync::mpsc;
use tracing::trace;

use crate::event::{Event, EventKind};
use crate::fabric::{CompletionGuard, Multiplexer};
use crate::geometry::Line;
use crate::layout::{Layout, Region};
use crate::style::{Attribute, Color};

/// The four edge lines of a window, in window-local coordinates.
#[derive(Clone, Copy, Debug)]
pub struct WindowEdges {
    /// Top edge.
    pub top: Line,
    /// Bottom edge.
    pub bottom: Line,
    /// Left edge.
    pub left: Line,
    /// Right edge.
    pub right: Line,
}

impl WindowEdges {
    pub(crate) fn of(w: i32, h: i32) -> Self {
        Self {
            top: Line::new(0, 0, w - 1, 0),
            bottom: Line::new(0, h - 1, w - 1, h - 1),
            left: Line::new(0, 0, 0, h - 1),
            right: Line::new(w - 1, 0, w - 1, h - 1),
        }
    }
}

/// A detached window, ready for [`crate::session::Session::insert`].
///
/// The layout is seeded from the region: four edge lines plus one region
/// covering the whole area, inheriting the region's outer-edge flags.
#[derive(Debug)]
pub struct Window {
    region: Region,
    color: Color,
    layout: Layout,
}

impl Window {
    /// Create a window over a region with the given colors.
    #[must_use]
    pub fn new(region: &Region, fg: Attribute, bg: Attribute) -> Self {
        Self {
            region: *region,
            color: Color::new(fg, bg),
            layout: Layout::new(region.w, region.h, region.rightmost, region.bottommost),
        }
    }

    /// The window's edge lines.
    #[must_use]
    pub fn edges(&self) -> WindowEdges {
        WindowEdges::of(self.region.w, self.region.h)
    }

    /// The window's layout.
    #[must_use]
    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub(crate) fn into_parts(self) -> (Region, Color, Layout) {
        (self.region, self.color, self.layout)
    }
}

/// The handler task of one managed container.
pub(crate) struct ContainerTask {
    pub mux: Multiplexer,
    pub up: mpsc::Sender<Event>,
}

impl ContainerTask {
    pub(crate) async fn run(mut self, _guard: CompletionGuard) {
        while let Some((link, ev)) = self.mux.recv().await {
            if link == 0 {
                // From the parent.
                match ev.kind {
                    EventKind::Exit => break,
                    kind => trace!(?kind, "container consumed parent event"),
                }
            } else {
                // From a child: bubble upward unchanged. Delivery order
                // across simultaneously-ready children is unspecified.
                if self.up.send(ev).await.is_err() {
                    break;
                }
            }
        }
        trace!("container handler exited");
    }
}
