//! Coordinate transformation between display space and PDF page space
//!
//! Display space is what the editing canvas works in: pixels at display
//! resolution, origin top-left. PDF space is points, origin bottom-left.

use serde::{Deserialize, Serialize};

/// A point in display space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle in display space (top-left origin).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Bounds {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Bounds {
    pub const fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Rectangle spanned by two corner points, normalized so that width and
    /// height are never negative whatever the drag direction.
    pub fn spanning(a: Point, b: Point) -> Self {
        Self {
            left: a.x.min(b.x),
            top: a.y.min(b.y),
            width: (a.x - b.x).abs(),
            height: (a.y - b.y).abs(),
        }
    }

    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    pub fn center(&self) -> Point {
        Point::new(self.left + self.width / 2.0, self.top + self.height / 2.0)
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.left && p.x <= self.right() && p.y >= self.top && p.y <= self.bottom()
    }

    /// Grow by `pad` on every side, then snap outward to whole units.
    pub fn padded_outward(&self, pad: f64) -> Self {
        Self {
            left: (self.left - pad).floor(),
            top: (self.top - pad).floor(),
            width: (self.width + pad * 2.0).ceil(),
            height: (self.height + pad * 2.0).ceil(),
        }
    }

    /// Smallest rectangle containing both.
    pub fn union(&self, other: &Bounds) -> Self {
        let left = self.left.min(other.left);
        let top = self.top.min(other.top);
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());
        Self::new(left, top, right - left, bottom - top)
    }
}

/// Width and height of a page at some scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageSize {
    pub width: f64,
    pub height: f64,
}

impl PageSize {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn scaled(&self, scale: f64) -> Self {
        Self::new(self.width * scale, self.height * scale)
    }
}

/// Maps display coordinates onto an output page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayToPdf {
    pub scale_x: f64,
    pub scale_y: f64,
    pub page_height: f64,
}

impl DisplayToPdf {
    pub fn new(display: PageSize, page: PageSize) -> Self {
        Self {
            scale_x: page.width / display.width,
            scale_y: page.height / display.height,
            page_height: page.height,
        }
    }

    /// Convert display bounds to a PDF rectangle `(x, y, width, height)`
    /// whose `y` is the bottom edge.
    pub fn rect(&self, bounds: &Bounds) -> (f64, f64, f64, f64) {
        let x = bounds.left * self.scale_x;
        let y = self.page_height - (bounds.top + bounds.height) * self.scale_y;
        (
            x,
            y,
            bounds.width * self.scale_x,
            bounds.height * self.scale_y,
        )
    }

    /// Baseline origin and scaled size for text whose box starts at
    /// `(left, top)` in display space.
    pub fn text_origin(&self, left: f64, top: f64, font_size: f64) -> (f64, f64, f64) {
        let x = left * self.scale_x;
        let y = self.page_height - (top + font_size * 0.85) * self.scale_y;
        (x, y, font_size * self.scale_y)
    }
}
