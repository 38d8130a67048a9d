//! Placement Hints
//!
//! Gravity and elasticity are per-object hints recorded for layout-aware
//! consumers. The core records and reports them; it performs no
//! automatic flow or constraint solving.

use bitflags::bitflags;

bitflags! {
    /// Which container edge an object prefers to stick to.
    ///
    /// `TOP | BOTTOM` and `LEFT | RIGHT` make no sense together, but the
    /// four corner combinations (`TOP | RIGHT`, etc.) are useful.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct Gravity: u8 {
        /// Stick to the top edge.
        const TOP = 0b0001;
        /// Stick to the bottom edge.
        const BOTTOM = 0b0010;
        /// Stick to the left edge.
        const LEFT = 0b0100;
        /// Stick to the right edge.
        const RIGHT = 0b1000;
    }
}

bitflags! {
    /// Which directions an object is willing to stretch in.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct Elastic: u8 {
        /// Stretch horizontally.
        const HORZ = 0b01;
        /// Stretch vertically.
        const VERT = 0b10;
        /// Stretch in both directions.
        const BOTH = 0b11;
    }
}

/// Default gravity for new widgets.
#[must_use]
pub fn default_widget_gravity() -> Gravity {
    Gravity::RIGHT
}

/// Default gravity for new containers.
#[must_use]
pub fn default_window_gravity() -> Gravity {
    Gravity::TOP
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gravity_corners_compose() {
        let g = Gravity::TOP | Gravity::RIGHT;
        assert!(g.contains(Gravity::TOP));
        assert!(g.contains(Gravity::RIGHT));
        assert!(!g.contains(Gravity::LEFT));
    }

    #[test]
    fn test_elastic_both_is_the_union() {
        assert_eq!(Elastic::HORZ | Elastic::VERT, Elastic::BOTH);
    }
}
