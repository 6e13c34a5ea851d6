//! Coordinate generators for drawing on character-cell displays.
//!
//! Pointer input arrives as individual cells; drawing applications connect
//! them with [`line`] and stamp shapes with [`circle`], then send one WRITE per
//! generated point.
//!
//! All input coordinates are rounded half-up to the nearest integer before
//! the algorithms run, so `2.5` becomes `3` and `-2.5` becomes `-2`.

/// An integer grid point.  `x` grows to the right, `y` grows downwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// A point with fractional coordinates, as produced by scaled pointer input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointF {
    pub x: f64,
    pub y: f64,
}

impl PointF {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Rounds both coordinates half-up to the nearest grid point.
    pub fn round(self) -> Point {
        Point::new(round_half_up(self.x), round_half_up(self.y))
    }
}

impl From<Point> for PointF {
    fn from(p: Point) -> Self {
        Self::new(f64::from(p.x), f64::from(p.y))
    }
}

impl From<(i32, i32)> for PointF {
    fn from((x, y): (i32, i32)) -> Self {
        Self::new(f64::from(x), f64::from(y))
    }
}

impl From<(f64, f64)> for PointF {
    fn from((x, y): (f64, f64)) -> Self {
        Self::new(x, y)
    }
}

fn round_half_up(v: f64) -> i32 {
    // `as` saturates out-of-range values and maps NaN to 0.
    (v + 0.5).floor() as i32
}

// ── Line ──────────────────────────────────────────────────────────────────────

/// Rasterises the segment from `start` to `end` with Bresenham's algorithm.
///
/// Both endpoints are included and the result has `max(|dx|, |dy|) + 1`
/// points.  Tie-breaking is done in a canonical direction (from the smaller
/// endpoint to the larger one) so that swapping the endpoints yields exactly
/// the reversed sequence.
///
/// # Examples
///
/// ```rust
/// use gluenet_core::domain::graphics::{line, Point};
///
/// let points = line(Point::new(0, 0), Point::new(3, 0));
/// assert_eq!(points.len(), 4);
/// assert_eq!(points[3], Point::new(3, 0));
/// ```
pub fn line(start: impl Into<PointF>, end: impl Into<PointF>) -> Vec<Point> {
    let start = start.into().round();
    let end = end.into().round();

    if end < start {
        let mut points = bresenham(end, start);
        points.reverse();
        points
    } else {
        bresenham(start, end)
    }
}

fn bresenham(start: Point, end: Point) -> Vec<Point> {
    let steps = Bresenham::new(start, end);
    let mut points = Vec::with_capacity(steps.remaining());
    points.extend(steps);
    points
}

/// Step-by-step Bresenham walk.  Deltas and the error term are `i64` so that
/// endpoints anywhere in the `i32` plane cannot overflow.
#[derive(Debug, Clone)]
struct Bresenham {
    x: i64,
    y: i64,
    end_x: i64,
    end_y: i64,
    dx: i64,
    dy: i64,
    sx: i64,
    sy: i64,
    err: i64,
    done: bool,
}

impl Bresenham {
    fn new(start: Point, end: Point) -> Self {
        let (x, y) = (i64::from(start.x), i64::from(start.y));
        let (end_x, end_y) = (i64::from(end.x), i64::from(end.y));
        let dx = (end_x - x).abs();
        let dy = (end_y - y).abs();
        Self {
            x,
            y,
            end_x,
            end_y,
            dx,
            dy,
            sx: if x < end_x { 1 } else { -1 },
            sy: if y < end_y { 1 } else { -1 },
            err: dx - dy,
            done: false,
        }
    }

    /// Points still to be yielded, the current one included.
    fn remaining(&self) -> usize {
        if self.done {
            return 0;
        }
        let left = (self.end_x - self.x).abs().max((self.end_y - self.y).abs());
        usize::try_from(left).map_or(usize::MAX, |n| n.saturating_add(1))
    }
}

impl Iterator for Bresenham {
    type Item = Point;

    fn next(&mut self) -> Option<Point> {
        if self.done {
            return None;
        }
        // Every visited coordinate lies between the two i32 endpoints.
        let current = Point::new(self.x as i32, self.y as i32);
        if self.x == self.end_x && self.y == self.end_y {
            self.done = true;
            return Some(current);
        }
        let err2 = self.err * 2;
        if err2 > -self.dy {
            self.err -= self.dy;
            self.x += self.sx;
        }
        if err2 < self.dx {
            self.err += self.dx;
            self.y += self.sy;
        }
        Some(current)
    }
}

// ── Circle ────────────────────────────────────────────────────────────────────

/// Rasterises a circle with the midpoint algorithm.
///
/// Each step of the first octant emits eight mirrored points, so points on
/// the axes and on the diagonals appear twice.  Callers that need a set should
/// deduplicate.  A negative radius yields no points; a zero radius yields the
/// centre eight times.  Mirrored points that fall outside the `i32` plane are
/// left out.
pub fn circle(center: impl Into<PointF>, radius: f64) -> Vec<Point> {
    let c = center.into().round();
    let (cx, cy) = (i64::from(c.x), i64::from(c.y));
    let radius = i64::from(round_half_up(radius));

    let mut points = Vec::new();
    let mut x = radius;
    let mut y = 0i64;
    let mut decision = 1 - radius;

    while x >= y {
        let octants = [
            (cx + x, cy + y),
            (cx + y, cy + x),
            (cx - y, cy + x),
            (cx - x, cy + y),
            (cx - x, cy - y),
            (cx - y, cy - x),
            (cx + y, cy - x),
            (cx + x, cy - y),
        ];
        points.extend(octants.into_iter().filter_map(|(px, py)| {
            Some(Point::new(i32::try_from(px).ok()?, i32::try_from(py).ok()?))
        }));

        y += 1;
        if decision < 0 {
            decision += 2 * y + 1;
        } else {
            x -= 1;
            decision += 2 * (y - x) + 1;
        }
    }

    points
}
