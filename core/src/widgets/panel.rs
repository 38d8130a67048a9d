//! Panels
//!
//! A panel is a chrome-less container: it clears its area, refreshes its
//! children in registration order, and forwards their output upward.

use crate::layout::Region;
use crate::style::{Attribute, Color};

/// A detached panel, ready for [`crate::session::Session::insert`].
#[derive(Debug)]
pub struct Panel {
    region: Region,
    color: Color,
}

impl Panel {
    /// Create a panel over a region with the given colors.
    #[must_use]
    pub fn new(region: &Region, fg: Attribute, bg: Attribute) -> Self {
        Self {
            region: *region,
            color: Color::new(fg, bg),
        }
    }

    pub(crate) fn into_parts(self) -> (Region, Color) {
        (self.region, self.color)
    }
}
