//! Buttons
//!
//! A button is the generic widget with the default round-robin machine
//! and a clickable region: each left click advances it to its next
//! sigil, wrapping around past the last.

use crate::fsm::FiniteStateMachine;
use crate::layout::Region;
use crate::style::{Attribute, Sigil};
use crate::widget::Widget;

/// A click-cycling button.
#[derive(Debug)]
pub struct Button {
    inner: Widget,
}

impl Button {
    /// Create a button cycling through the given sigils on left click.
    #[must_use]
    pub fn new(region: &Region, sigils: &[Sigil]) -> Self {
        Self {
            inner: Widget::new(region, FiniteStateMachine::round_robin(sigils)).clickable(),
        }
    }

    /// Override the color pair.
    #[must_use]
    pub fn with_colors(mut self, fg: Attribute, bg: Attribute) -> Self {
        self.inner = self.inner.with_colors(fg, bg);
        self
    }

    /// Also request keyboard focus at init.
    #[must_use]
    pub fn accepts_focus(mut self) -> Self {
        self.inner = self.inner.accepts_focus();
        self
    }

    /// The underlying generic widget.
    #[must_use]
    pub fn into_widget(self) -> Widget {
        self.inner
    }
}

impl From<Button> for crate::node::NodeSpec {
    fn from(b: Button) -> Self {
        crate::node::NodeSpec::Widget(b.into_widget())
    }
}
