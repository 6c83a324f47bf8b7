//! Rectangular regions in document space.
//!
//! A [`Rect`] is the unit of cache invalidation and compositing work.
//! Layers may be positioned partially (or entirely) outside the document,
//! so the origin is signed while the extent is unsigned.
//!
//! # Coordinate System
//!
//! ```text
//! (0,0) ────────► X
//!   │
//!   │   ┌──────────┐
//!   │   │ Document │
//!   │   └──────────┘
//!   ▼
//!   Y
//! ```
//!
//! Left/top edges are inclusive, right/bottom edges exclusive.
//!
//! # Usage
//!
//! ```rust
//! use strata_core::Rect;
//!
//! let layer = Rect::new(-5, 10, 20, 20);
//! let doc = Rect::from_size(100, 100);
//! let visible = layer.intersect(&doc).unwrap();
//! assert_eq!(visible, Rect::new(0, 10, 15, 20));
//! ```

/// A rectangle defined by a signed origin and unsigned extent.
///
/// A rectangle with zero width or height is empty; empty rectangles
/// never intersect anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    /// Left edge (inclusive)
    pub x: i32,
    /// Top edge (inclusive)
    pub y: i32,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl Rect {
    /// Creates a new rectangle with the given origin and dimensions.
    #[inline]
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Creates a rectangle at the origin with the given size.
    #[inline]
    pub const fn from_size(width: u32, height: u32) -> Self {
        Self::new(0, 0, width, height)
    }

    /// Creates a rectangle from two corners, normalizing swapped coordinates.
    ///
    /// ```rust
    /// use strata_core::Rect;
    ///
    /// let r = Rect::from_corners(30, 10, -10, 40);
    /// assert_eq!(r, Rect::new(-10, 10, 40, 30));
    /// ```
    #[inline]
    pub fn from_corners(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        let (min_x, max_x) = if x1 <= x2 { (x1, x2) } else { (x2, x1) };
        let (min_y, max_y) = if y1 <= y2 { (y1, y2) } else { (y2, y1) };
        Self::new(
            min_x,
            min_y,
            max_x.abs_diff(min_x),
            max_y.abs_diff(min_y),
        )
    }

    /// Right edge (exclusive).
    #[inline]
    pub const fn right(&self) -> i32 {
        self.x + self.width as i32
    }

    /// Bottom edge (exclusive).
    #[inline]
    pub const fn bottom(&self) -> i32 {
        self.y + self.height as i32
    }

    /// Area in pixels.
    #[inline]
    pub const fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Returns `true` if the point lies inside the rectangle.
    #[inline]
    pub const fn contains(&self, px: i32, py: i32) -> bool {
        px >= self.x && px < self.right() && py >= self.y && py < self.bottom()
    }

    /// Returns `true` if `other` lies completely inside this rectangle.
    ///
    /// An empty `other` is contained by everything.
    #[inline]
    pub const fn contains_rect(&self, other: &Rect) -> bool {
        other.is_empty()
            || (other.x >= self.x
                && other.y >= self.y
                && other.right() <= self.right()
                && other.bottom() <= self.bottom())
    }

    /// Returns `true` if the rectangles share at least one pixel.
    #[inline]
    pub const fn overlaps(&self, other: &Rect) -> bool {
        if self.is_empty() || other.is_empty() {
            return false;
        }
        self.x < other.right()
            && self.right() > other.x
            && self.y < other.bottom()
            && self.bottom() > other.y
    }

    /// Returns the overlapping part of both rectangles, or `None`.
    ///
    /// ```rust
    /// use strata_core::Rect;
    ///
    /// let a = Rect::new(0, 0, 10, 10);
    /// assert_eq!(a.intersect(&Rect::new(5, 5, 10, 10)), Some(Rect::new(5, 5, 5, 5)));
    /// assert_eq!(a.intersect(&Rect::new(10, 0, 5, 5)), None);
    /// ```
    #[inline]
    pub fn intersect(&self, other: &Rect) -> Option<Rect> {
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());

        if x < right && y < bottom {
            Some(Rect::new(x, y, (right - x) as u32, (bottom - y) as u32))
        } else {
            None
        }
    }

    /// Bounding box of both rectangles. Empty operands are ignored.
    #[inline]
    pub fn union(&self, other: &Rect) -> Rect {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());
        Rect::new(x, y, (right - x) as u32, (bottom - y) as u32)
    }

    /// Returns this rectangle moved by (dx, dy).
    #[inline]
    pub const fn translate(&self, dx: i32, dy: i32) -> Rect {
        Rect::new(self.x + dx, self.y + dy, self.width, self.height)
    }

    /// Iterates all (x, y) coordinates row by row.
    pub fn iter_coords(&self) -> impl Iterator<Item = (i32, i32)> + '_ {
        (self.y..self.bottom()).flat_map(move |y| (self.x..self.right()).map(move |x| (x, y)))
    }
}

impl std::fmt::Display for Rect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Rect({}, {}, {}x{})",
            self.x, self.y, self.width, self.height
        )
    }
}
