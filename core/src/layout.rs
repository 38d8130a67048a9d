//! Regions and Line-Based Window Partitioning
//!
//! A [`Layout`] owns the regions and abstract lines of one window. Lines
//! are added between two existing parallel lines; every region crossed
//! end-to-end by a new line is invalidated and replaced by its two
//! halves, so that the set of valid regions always tiles the window
//! exactly. Region enumeration order is canonical (top-to-bottom,
//! left-to-right); line order is creation order and is never re-sorted,
//! because the border painter replays the lines as drawn.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geometry::{self, Line, Nexus, Point};

/// Errors from layout mutation.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum LayoutError {
    /// The two reference lines for a split are not parallel.
    #[error("reference lines must be parallel")]
    NotParallel,
    /// The split offset falls outside the reference span.
    #[error("offset {offset} exceeds this area's span {span}")]
    OffsetOutOfRange {
        /// The requested offset.
        offset: i32,
        /// The reference span length.
        span: i32,
    },
    /// A border was already added to this window.
    #[error("borders already enabled on window")]
    BorderAlreadyAdded,
}

/// A validity-tagged rectangle in a window's local coordinate space.
///
/// `rightmost`/`bottommost` mark regions touching the window's outer
/// edge; their border is not shared with a sibling. A region superseded
/// by a split has `valid == false` and is excluded from all later
/// geometric queries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    /// Left column.
    pub x: i32,
    /// Top row.
    pub y: i32,
    /// Width in cells.
    pub w: i32,
    /// Height in cells.
    pub h: i32,
    /// Touches the window's right outer edge.
    pub rightmost: bool,
    /// Touches the window's bottom outer edge.
    pub bottommost: bool,
    /// Part of the current partition.
    pub valid: bool,
}

impl Region {
    /// Create a valid region with no outer-edge flags.
    #[must_use]
    pub fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self {
            x,
            y,
            w,
            h,
            rightmost: false,
            bottommost: false,
            valid: true,
        }
    }

    /// Position of the top-left corner.
    #[must_use]
    pub fn loc(&self) -> (i32, i32) {
        (self.x, self.y)
    }

    /// Width and height.
    #[must_use]
    pub fn size(&self) -> (i32, i32) {
        (self.w, self.h)
    }

    /// Area in cells.
    #[must_use]
    pub fn area(&self) -> i64 {
        i64::from(self.w) * i64::from(self.h)
    }

    /// Does the point fall within this region?
    #[must_use]
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x < self.x + self.w && p.y >= self.y && p.y < self.y + self.h
    }

    /// The left edge as a line in window coordinates.
    #[must_use]
    pub fn left(&self) -> Line {
        Line::new(self.x, self.y, self.x, self.y + self.h - 1)
    }

    /// The right edge as a line in window coordinates.
    #[must_use]
    pub fn right(&self) -> Line {
        Line::new(self.x + self.w - 1, self.y, self.x + self.w - 1, self.y + self.h - 1)
    }

    /// The top edge as a line in window coordinates.
    #[must_use]
    pub fn top(&self) -> Line {
        Line::new(self.x, self.y, self.x + self.w - 1, self.y)
    }

    /// The bottom edge as a line in window coordinates.
    #[must_use]
    pub fn bottom(&self) -> Line {
        Line::new(self.x, self.y + self.h - 1, self.x + self.w - 1, self.y + self.h - 1)
    }
}

/// The box-drawing characters used for window borders, indexed by how
/// the border lines meet. Overridable per session via configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BorderGlyphs {
    /// '┌'
    pub top_left: char,
    /// '┐'
    pub top_right: char,
    /// '└'
    pub bottom_left: char,
    /// '┘'
    pub bottom_right: char,
    /// '│'
    pub vertical: char,
    /// '─'
    pub horizontal: char,
    /// '├'
    pub left_t: char,
    /// '┤'
    pub right_t: char,
    /// '┬'
    pub top_t: char,
    /// '┴'
    pub bottom_t: char,
    /// '┼'
    pub cross: char,
}

impl Default for BorderGlyphs {
    fn default() -> Self {
        Self {
            top_left: '\u{250C}',
            top_right: '\u{2510}',
            bottom_left: '\u{2514}',
            bottom_right: '\u{2518}',
            vertical: '\u{2502}',
            horizontal: '\u{2500}',
            left_t: '\u{251C}',
            right_t: '\u{2524}',
            top_t: '\u{252C}',
            bottom_t: '\u{2534}',
            cross: '\u{253C}',
        }
    }
}

impl BorderGlyphs {
    /// The glyph painted at a junction of the given kind, if any.
    #[must_use]
    pub fn for_nexus(&self, n: Nexus) -> Option<char> {
        match n {
            Nexus::TopLeft => Some(self.top_left),
            Nexus::TopRight => Some(self.top_right),
            Nexus::BottomLeft => Some(self.bottom_left),
            Nexus::BottomRight => Some(self.bottom_right),
            Nexus::LeftT => Some(self.left_t),
            Nexus::RightT => Some(self.right_t),
            Nexus::TopT => Some(self.top_t),
            Nexus::BottomT => Some(self.bottom_t),
            Nexus::Cross => Some(self.cross),
            Nexus::None => None,
        }
    }
}

/// The partition state of one window: its regions and the abstract lines
/// used to create them.
#[derive(Clone, Debug)]
pub struct Layout {
    regions: Vec<Region>,
    lines: Vec<Line>,
    border: bool,
}

impl Layout {
    /// Seed the layout of a `w`×`h` window: the four edge lines plus one
    /// region covering the whole area, carrying the window's outer-edge
    /// flags.
    #[must_use]
    pub fn new(w: i32, h: i32, rightmost: bool, bottommost: bool) -> Self {
        let left = Line::new(0, 0, 0, h - 1);
        let right = Line::new(w - 1, 0, w - 1, h - 1);
        let top = Line::new(0, 0, w - 1, 0);
        let bottom = Line::new(0, h - 1, w - 1, h - 1);

        let mut seed = Region::new(0, 0, w, h);
        seed.rightmost = rightmost;
        seed.bottommost = bottommost;

        Self {
            regions: vec![seed],
            lines: vec![left, right, top, bottom],
            border: false,
        }
    }

    /// The current partition, in canonical top-to-bottom, left-to-right
    /// order.
    #[must_use]
    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    /// The region at index `n` of the canonical enumeration.
    #[must_use]
    pub fn region(&self, n: usize) -> Option<&Region> {
        self.regions.get(n)
    }

    /// All lines, in creation order.
    #[must_use]
    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    /// Only the horizontal lines, in creation order.
    #[must_use]
    pub fn horizontal_lines(&self) -> Vec<Line> {
        self.lines.iter().filter(|l| l.horizontal()).copied().collect()
    }

    /// Only the vertical lines, in creation order.
    #[must_use]
    pub fn vertical_lines(&self) -> Vec<Line> {
        self.lines.iter().filter(|l| l.vertical()).copied().collect()
    }

    /// Whether a border was added.
    #[must_use]
    pub fn has_border(&self) -> bool {
        self.border
    }

    /// Add a new line between two existing parallel lines, running
    /// orthogonal to them and spanning from one to the other, at offset
    /// `n` along them measured from the smaller reference.
    ///
    /// Every valid region whose opposing edges are crossed end-to-end by
    /// the new line is invalidated and replaced by its two halves, each
    /// inheriting the outer-edge flags of the side it retains. The
    /// surviving regions are re-sorted into canonical order; the new line
    /// is appended to the line list and returned.
    ///
    /// # Errors
    ///
    /// [`LayoutError::NotParallel`] if the reference lines are not
    /// parallel, [`LayoutError::OffsetOutOfRange`] if `n` falls outside
    /// the reference span.
    pub fn add_line(&mut self, l1: &Line, l2: &Line, n: i32) -> Result<Line, LayoutError> {
        if !geometry::parallel(l1, l2) {
            return Err(LayoutError::NotParallel);
        }

        let (lo, hi) = if l1.after(l2) { (l2, l1) } else { (l1, l2) };
        let (lo_start, lo_end) = lo.endpoints();
        let (hi_start, _) = hi.endpoints();

        // Splitting between horizontal references yields a vertical line
        // and vice versa.
        let (line, span) = if lo.horizontal() {
            let x = lo_start.x + n;
            (
                Line::new(x, lo_start.y, x, hi_start.y),
                lo_end.x - lo_start.x + 1,
            )
        } else {
            let y = lo_start.y + n;
            (
                Line::new(lo_start.x, y, hi_start.x, y),
                lo_end.y - lo_start.y + 1,
            )
        };

        if n < 0 || n > span {
            return Err(LayoutError::OffsetOutOfRange { offset: n, span });
        }

        self.lines.push(line);

        let mut next: Vec<Region> = Vec::new();
        for r in &mut self.regions {
            let halves = if line.vertical() {
                split_vertical(r, &line)
            } else {
                split_horizontal(r, &line)
            };
            if let Some((a, b)) = halves {
                r.valid = false;
                next.push(a);
                next.push(b);
            }
        }
        self.regions.extend(next);

        self.regions.retain(|r| r.valid);
        self.regions.sort_by_key(|r| (r.y, r.x));

        Ok(line)
    }

    /// Shrink every region to leave room for the window's border: one
    /// cell on interior edges, two on outer edges.
    ///
    /// Border drawing itself happens at refresh time from the line list.
    ///
    /// # Errors
    ///
    /// [`LayoutError::BorderAlreadyAdded`] on the second call.
    pub fn add_border(&mut self) -> Result<(), LayoutError> {
        if self.border {
            return Err(LayoutError::BorderAlreadyAdded);
        }
        self.border = true;

        for r in &mut self.regions {
            r.x += 1;
            r.y += 1;
            r.w -= if r.rightmost { 2 } else { 1 };
            r.h -= if r.bottommost { 2 } else { 1 };
        }
        Ok(())
    }
}

/// Split a region crossed end-to-end by a vertical line into its western
/// and eastern halves. The west half loses the `rightmost` flag.
fn split_vertical(r: &Region, line: &Line) -> Option<(Region, Region)> {
    let top = geometry::intersection(line, &r.top());
    let bottom = geometry::intersection(line, &r.bottom());
    if top.is_err() || bottom.is_err() {
        return None;
    }

    let cut = line.p1.x;
    let mut west = Region::new(r.x, r.y, cut - r.x, r.h);
    west.rightmost = false;
    west.bottommost = r.bottommost;

    let mut east = Region::new(cut, r.y, r.w - (cut - r.x), r.h);
    east.rightmost = r.rightmost;
    east.bottommost = r.bottommost;

    Some((west, east))
}

/// Split a region crossed end-to-end by a horizontal line into its
/// northern and southern halves. The north half loses the `bottommost`
/// flag.
fn split_horizontal(r: &Region, line: &Line) -> Option<(Region, Region)> {
    let left = geometry::intersection(line, &r.left());
    let right = geometry::intersection(line, &r.right());
    if left.is_err() || right.is_err() {
        return None;
    }

    let cut = line.p1.y;
    let mut north = Region::new(r.x, r.y, r.w, cut - r.y);
    north.rightmost = r.rightmost;
    north.bottommost = false;

    let mut south = Region::new(r.x, cut, r.w, r.h - (cut - r.y));
    south.rightmost = r.rightmost;
    south.bottommost = r.bottommost;

    Some((north, south))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn tiles_exactly(layout: &Layout, w: i32, h: i32) {
        let regions = layout.regions();
        let total: i64 = regions.iter().map(Region::area).sum();
        assert_eq!(total, i64::from(w) * i64::from(h), "area sum mismatch");

        for (i, a) in regions.iter().enumerate() {
            for b in regions.iter().skip(i + 1) {
                let overlap_w = (a.x + a.w).min(b.x + b.w) - a.x.max(b.x);
                let overlap_h = (a.y + a.h).min(b.y + b.h) - a.y.max(b.y);
                assert!(
                    overlap_w <= 0 || overlap_h <= 0,
                    "regions overlap: {a:?} {b:?}"
                );
            }
        }
    }

    fn root_layout(w: i32, h: i32) -> Layout {
        Layout::new(w, h, true, true)
    }

    #[test]
    fn test_new_layout_seeds_edges_and_one_region() {
        let layout = root_layout(80, 24);
        assert_eq!(layout.lines().len(), 4);
        assert_eq!(layout.regions().len(), 1);
        let r = layout.region(0).unwrap();
        assert_eq!((r.x, r.y, r.w, r.h), (0, 0, 80, 24));
        assert!(r.rightmost && r.bottommost && r.valid);
        assert_eq!(layout.horizontal_lines().len(), 2);
        assert_eq!(layout.vertical_lines().len(), 2);
    }

    #[test]
    fn test_horizontal_split_at_center() {
        let mut layout = root_layout(80, 24);
        let left = Line::new(0, 0, 0, 23);
        let right = Line::new(79, 0, 79, 23);

        let line = layout.add_line(&left, &right, 12).unwrap();
        assert!(line.horizontal());
        assert_eq!(line.p1.y, 12);

        let regions = layout.regions();
        assert_eq!(regions.len(), 2);
        assert_eq!((regions[0].w, regions[0].h), (80, 12));
        assert_eq!((regions[1].w, regions[1].h), (80, 12));
        assert!(!regions[0].bottommost, "north half loses bottommost");
        assert!(regions[1].bottommost, "south half keeps the window's flag");
        assert!(regions[0].rightmost && regions[1].rightmost);
        tiles_exactly(&layout, 80, 24);
    }

    #[test]
    fn test_spec_scenario_three_regions() {
        // 80x24, horizontal split at 12, then a vertical split at 40
        // confined to the top region: the bottom region stays untouched.
        let mut layout = root_layout(80, 24);
        let top = Line::new(0, 0, 79, 0);
        let left = Line::new(0, 0, 0, 23);
        let right = Line::new(79, 0, 79, 23);
        let mid = layout.add_line(&left, &right, 12).unwrap();

        layout.add_line(&top, &mid, 40).unwrap();

        let regions = layout.regions();
        assert_eq!(regions.len(), 3);
        assert_eq!((regions[0].x, regions[0].y, regions[0].w, regions[0].h), (0, 0, 40, 12));
        assert_eq!((regions[1].x, regions[1].y, regions[1].w, regions[1].h), (40, 0, 40, 12));
        assert_eq!((regions[2].x, regions[2].y, regions[2].w, regions[2].h), (0, 12, 80, 12));
        assert!(!regions[0].rightmost, "west half loses rightmost");
        assert!(regions[1].rightmost);
        tiles_exactly(&layout, 80, 24);
    }

    #[test]
    fn test_split_rejects_bad_input() {
        let mut layout = root_layout(80, 24);
        let top = Line::new(0, 0, 79, 0);
        let bottom = Line::new(0, 23, 79, 23);
        let left = Line::new(0, 0, 0, 23);

        assert_eq!(
            layout.add_line(&top, &left, 5),
            Err(LayoutError::NotParallel)
        );
        assert_eq!(
            layout.add_line(&top, &bottom, 200),
            Err(LayoutError::OffsetOutOfRange { offset: 200, span: 80 })
        );
        assert_eq!(
            layout.add_line(&top, &bottom, -1),
            Err(LayoutError::OffsetOutOfRange { offset: -1, span: 80 })
        );
        // Failed splits leave the partition untouched.
        assert_eq!(layout.regions().len(), 1);
        tiles_exactly(&layout, 80, 24);
    }

    #[test]
    fn test_reference_order_does_not_matter() {
        let mut a = root_layout(80, 24);
        let mut b = root_layout(80, 24);
        let top = Line::new(0, 0, 79, 0);
        let bottom = Line::new(0, 23, 79, 23);

        a.add_line(&top, &bottom, 12).unwrap();
        b.add_line(&bottom, &top, 12).unwrap();
        assert_eq!(a.regions(), b.regions());
    }

    #[test]
    fn test_lines_keep_creation_order() {
        let mut layout = root_layout(80, 24);
        let top = Line::new(0, 0, 79, 0);
        let left = Line::new(0, 0, 0, 23);
        let right = Line::new(79, 0, 79, 23);
        let mid = layout.add_line(&left, &right, 12).unwrap();
        layout.add_line(&top, &mid, 40).unwrap();

        let lines = layout.lines();
        assert_eq!(lines.len(), 6);
        assert_eq!(lines[4], mid);
        assert!(lines[5].vertical());
    }

    #[test]
    fn test_partition_invariant_under_many_splits() {
        let mut layout = root_layout(100, 60);
        let top = Line::new(0, 0, 99, 0);
        let bottom = Line::new(0, 59, 99, 59);
        let left = Line::new(0, 0, 0, 59);
        let right = Line::new(99, 0, 99, 59);

        let cut_v = layout.add_line(&top, &bottom, 30).unwrap();
        let cut_h = layout.add_line(&left, &right, 20).unwrap();
        layout.add_line(&left, &cut_v, 10).unwrap();
        layout.add_line(&cut_h, &bottom, 65).unwrap();

        assert_eq!(layout.regions().len(), 6);
        tiles_exactly(&layout, 100, 60);
    }

    #[test]
    fn test_add_border_shrinks_regions_once() {
        let mut layout = root_layout(80, 24);
        let left = Line::new(0, 0, 0, 23);
        let right = Line::new(79, 0, 79, 23);
        layout.add_line(&left, &right, 12).unwrap();

        layout.add_border().unwrap();
        assert!(layout.has_border());
        assert_eq!(layout.add_border(), Err(LayoutError::BorderAlreadyAdded));

        let regions = layout.regions();
        // North region: interior bottom edge, outer right edge.
        assert_eq!(
            (regions[0].x, regions[0].y, regions[0].w, regions[0].h),
            (1, 1, 78, 11)
        );
        // South region: outer bottom and right edges.
        assert_eq!(
            (regions[1].x, regions[1].y, regions[1].w, regions[1].h),
            (1, 13, 78, 10)
        );
    }

    #[test]
    fn test_border_glyphs_for_nexus() {
        let glyphs = BorderGlyphs::default();
        assert_eq!(glyphs.for_nexus(Nexus::TopLeft), Some('\u{250C}'));
        assert_eq!(glyphs.for_nexus(Nexus::Cross), Some('\u{253C}'));
        assert_eq!(glyphs.for_nexus(Nexus::None), None);
    }
}
