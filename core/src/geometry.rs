//! Points, Axis-Aligned Lines, and Junction Classification
//!
//! Pure geometry over integer screen coordinates. Everything here is
//! restricted to horizontal and vertical segments: orientation is derived
//! at construction, degenerate (single-point) segments are unoriented, and
//! unoriented lines are excluded from every algorithm in this module.
//!
//! The [`nexus`] classifier decides how two orthogonal lines meet on
//! screen (corner, T-junction, or cross). It is a local test that probes
//! only the four neighbor cells of the intersection point; the border
//! painter uses the result to pick a box-drawing glyph.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from geometric queries.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum GeometryError {
    /// Two parallel lines were passed where orthogonal lines are required.
    #[error("lines must be orthogonal")]
    NotOrthogonal,
    /// Two non-parallel lines were passed where parallel lines are required.
    #[error("lines must be parallel")]
    NotParallel,
    /// The infinite extensions cross, but the finite segments do not.
    #[error("line segments do not intersect")]
    DisjointSegments,
}

/// An integer screen coordinate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    /// Column.
    pub x: i32,
    /// Row.
    pub y: i32,
}

impl Point {
    /// Create a point.
    #[must_use]
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Orientation of a line segment, derived from its endpoints.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Orientation {
    /// Degenerate or not axis-aligned; excluded from all algorithms.
    #[default]
    None,
    /// Both endpoints share a row.
    Horizontal,
    /// Both endpoints share a column.
    Vertical,
}

/// An axis-aligned line segment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Line {
    /// First endpoint, as given at construction.
    pub p1: Point,
    /// Second endpoint, as given at construction.
    pub p2: Point,
    /// Derived orientation.
    pub orientation: Orientation,
}

impl Line {
    /// Construct a line, deriving its orientation from endpoint equality.
    ///
    /// A single-point segment is unoriented. A pair of endpoints that is
    /// neither horizontal nor vertical is also unoriented; callers must
    /// not rely on intersection or splitting for such lines.
    #[must_use]
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        let orientation = if x1 == x2 && y1 == y2 {
            Orientation::None
        } else if x1 == x2 {
            Orientation::Vertical
        } else if y1 == y2 {
            Orientation::Horizontal
        } else {
            Orientation::None
        };

        Self {
            p1: Point::new(x1, y1),
            p2: Point::new(x2, y2),
            orientation,
        }
    }

    /// Is this line horizontal?
    #[must_use]
    pub fn horizontal(&self) -> bool {
        self.orientation == Orientation::Horizontal
    }

    /// Is this line vertical?
    #[must_use]
    pub fn vertical(&self) -> bool {
        self.orientation == Orientation::Vertical
    }

    /// The endpoints in left-to-right / top-to-bottom order.
    #[must_use]
    pub fn endpoints(&self) -> (Point, Point) {
        if self.horizontal() && self.p1.x < self.p2.x {
            return (self.p1, self.p2);
        }
        if self.vertical() && self.p1.y < self.p2.y {
            return (self.p1, self.p2);
        }
        (self.p2, self.p1)
    }

    /// Does the point lie on this segment?
    #[must_use]
    pub fn contains(&self, p: Point) -> bool {
        let (lo, hi) = self.endpoints();
        if self.horizontal() {
            return p.x >= lo.x && p.x <= hi.x && p.y == lo.y;
        }
        if self.vertical() {
            return p.y >= lo.y && p.y <= hi.y && p.x == lo.x;
        }
        false
    }

    /// Is this line further down (horizontal) or further right (vertical)
    /// than `other`?
    ///
    /// Comparing lines of different orientation is undefined; callers must
    /// only compare parallel lines.
    #[must_use]
    pub fn after(&self, other: &Line) -> bool {
        if self.horizontal() && self.p1.y > other.p1.y {
            return true;
        }
        if self.vertical() && self.p1.x > other.p1.x {
            return true;
        }
        false
    }

    /// Is this line further up (horizontal) or further left (vertical)
    /// than `other`?
    #[must_use]
    pub fn before(&self, other: &Line) -> bool {
        if self.horizontal() && self.p1.y < other.p1.y {
            return true;
        }
        if self.vertical() && self.p1.x < other.p1.x {
            return true;
        }
        false
    }
}

/// Are the two lines parallel? Two unoriented lines never are.
#[must_use]
pub fn parallel(l1: &Line, l2: &Line) -> bool {
    (l1.horizontal() && l2.horizontal()) || (l1.vertical() && l2.vertical())
}

/// Are the two lines orthogonal? Two unoriented lines never are.
#[must_use]
pub fn orthogonal(l1: &Line, l2: &Line) -> bool {
    (l1.horizontal() && l2.vertical()) || (l1.vertical() && l2.horizontal())
}

/// Are the two lines parallel with distance zero?
#[must_use]
pub fn coincident(l1: &Line, l2: &Line) -> bool {
    if l1.horizontal() && l2.horizontal() {
        return l1.p1.y == l2.p1.y;
    }
    if l1.vertical() && l2.vertical() {
        return l1.p1.x == l2.p1.x;
    }
    false
}

/// The distance between two parallel lines.
///
/// # Errors
///
/// [`GeometryError::NotParallel`] if the lines are not parallel.
pub fn distance(l1: &Line, l2: &Line) -> Result<i32, GeometryError> {
    if !parallel(l1, l2) {
        return Err(GeometryError::NotParallel);
    }
    if coincident(l1, l2) {
        return Ok(0);
    }
    if l1.horizontal() {
        return Ok((l1.p1.y - l2.p1.y).abs());
    }
    Ok((l1.p1.x - l2.p1.x).abs())
}

/// The intersection point of two orthogonal segments.
///
/// Computes the crossing of the infinite extensions, then requires that
/// point to lie on both finite segments.
///
/// # Errors
///
/// [`GeometryError::NotOrthogonal`] for parallel input,
/// [`GeometryError::DisjointSegments`] if the extensions cross outside
/// either segment.
pub fn intersection(l1: &Line, l2: &Line) -> Result<Point, GeometryError> {
    if parallel(l1, l2) {
        return Err(GeometryError::NotOrthogonal);
    }

    let (p1, _) = l1.endpoints();
    let (q1, _) = l2.endpoints();

    let p = if l1.vertical() {
        Point::new(p1.x, q1.y)
    } else {
        Point::new(q1.x, p1.y)
    };

    if l1.contains(p) && l2.contains(p) {
        return Ok(p);
    }
    Err(GeometryError::DisjointSegments)
}

/// How two orthogonal lines meet on screen.
///
/// The discriminants select the glyph painted at a border junction; see
/// [`crate::layout::BorderGlyphs`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Nexus {
    /// Both lines begin at the junction (┌).
    TopLeft,
    /// The horizontal line ends, the vertical begins (┐).
    TopRight,
    /// The vertical line ends, the horizontal begins (└).
    BottomLeft,
    /// Both lines end at the junction (┘).
    BottomRight,
    /// The vertical line passes through the horizontal's start (├).
    LeftT,
    /// The vertical line passes through the horizontal's end (┤).
    RightT,
    /// The horizontal line passes through the vertical's start (┬).
    TopT,
    /// The horizontal line passes through the vertical's end (┴).
    BottomT,
    /// Both lines pass through (┼).
    Cross,
    /// Not orthogonal, or the segments do not intersect.
    None,
}

/// Classify the junction two lines form, returning the junction point and
/// its [`Nexus`] kind.
///
/// This is a local test: only the four cells adjacent to the intersection
/// are probed against each segment's domain. The classification is
/// symmetric in its arguments. Non-orthogonal or non-intersecting input
/// yields `Nexus::None` with no point.
#[must_use]
pub fn nexus(l1: &Line, l2: &Line) -> (Option<Point>, Nexus) {
    if !orthogonal(l1, l2) {
        return (None, Nexus::None);
    }

    // Normalize so `h` is the horizontal line and `v` the vertical one;
    // this is what makes the classification argument-order symmetric.
    let (h, v) = if l1.horizontal() { (l1, l2) } else { (l2, l1) };

    let p = match intersection(h, v) {
        Ok(p) => p,
        Err(_) => return (None, Nexus::None),
    };

    let west = h.contains(Point::new(p.x - 1, p.y));
    let east = h.contains(Point::new(p.x + 1, p.y));
    let north = v.contains(Point::new(p.x, p.y - 1));
    let south = v.contains(Point::new(p.x, p.y + 1));

    let kind = match (west, east, north, south) {
        (true, true, true, true) => Nexus::Cross,
        (false, true, false, true) => Nexus::TopLeft,
        (true, false, false, true) => Nexus::TopRight,
        (false, true, true, false) => Nexus::BottomLeft,
        (true, false, true, false) => Nexus::BottomRight,
        (false, true, true, true) => Nexus::LeftT,
        (true, false, true, true) => Nexus::RightT,
        (true, true, false, true) => Nexus::TopT,
        (true, true, true, false) => Nexus::BottomT,
        _ => Nexus::None,
    };

    if kind == Nexus::None {
        return (None, Nexus::None);
    }
    (Some(p), kind)
}
