//! Screen geometry shared by the window core, the decorators and the desktop.
//!
//! Rectangles are pixel-inclusive: `Rect::new(0, 0, 100, 100)` covers
//! 101 x 101 pixels and has a `width()` of 100, matching the frame
//! arithmetic the clients expect.

use serde::{Deserialize, Serialize};

/// A point in screen (or view-local) coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const ORIGIN: Point = Point { x: 0, y: 0 };

    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn offset_by(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

impl std::ops::Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl std::ops::Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl std::ops::AddAssign for Point {
    fn add_assign(&mut self, rhs: Point) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

/// Axis-aligned, pixel-inclusive rectangle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Default for Rect {
    /// The default rectangle is invalid (covers no pixels).
    fn default() -> Self {
        Self::INVALID
    }
}

impl Rect {
    pub const INVALID: Rect = Rect {
        left: 0,
        top: 0,
        right: -1,
        bottom: -1,
    };

    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Build a rectangle from its top-left corner and its frame size.
    pub fn from_origin_size(origin: Point, width: i32, height: i32) -> Self {
        Self::new(origin.x, origin.y, origin.x + width, origin.y + height)
    }

    pub fn is_valid(&self) -> bool {
        self.left <= self.right && self.top <= self.bottom
    }

    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }

    pub fn left_top(&self) -> Point {
        Point::new(self.left, self.top)
    }

    pub fn right_bottom(&self) -> Point {
        Point::new(self.right, self.bottom)
    }

    pub fn offset_by(self, dx: i32, dy: i32) -> Self {
        Self::new(self.left + dx, self.top + dy, self.right + dx, self.bottom + dy)
    }

    pub fn offset_to(self, origin: Point) -> Self {
        Self::new(
            origin.x,
            origin.y,
            origin.x + self.width(),
            origin.y + self.height(),
        )
    }

    /// Grow (negative inset) or shrink the rectangle on all sides.
    pub fn inset_by(self, dx: i32, dy: i32) -> Self {
        Self::new(self.left + dx, self.top + dy, self.right - dx, self.bottom - dy)
    }

    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.left && point.x <= self.right && point.y >= self.top && point.y <= self.bottom
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        self.intersection(other).is_valid()
    }

    /// Intersection of two rectangles; invalid if they do not overlap.
    pub fn intersection(&self, other: &Rect) -> Rect {
        Rect::new(
            self.left.max(other.left),
            self.top.max(other.top),
            self.right.min(other.right),
            self.bottom.min(other.bottom),
        )
    }

    /// Bounding rectangle of both; an invalid operand is ignored.
    pub fn union(&self, other: &Rect) -> Rect {
        if !self.is_valid() {
            return *other;
        }
        if !other.is_valid() {
            return *self;
        }
        Rect::new(
            self.left.min(other.left),
            self.top.min(other.top),
            self.right.max(other.right),
            self.bottom.max(other.bottom),
        )
    }
}
