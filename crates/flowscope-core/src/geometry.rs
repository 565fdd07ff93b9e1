//! Orthogonal connection routing and arc-length parameterization.
//!
//! Connections are drawn as Manhattan-style paths. Particles ride the same
//! path, placed by arc length so their on-screen speed is uniform no matter
//! how the path is split into segments.

/// Vertical deltas below this are routed as a single segment.
pub const STRAIGHT_THRESHOLD: f64 = 20.0;

/// Where the vertical leg sits, as a fraction of the horizontal span.
pub const ELBOW_FRACTION: f64 = 0.6;

/// A point in surface coordinates (x right, y down).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Self) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }

    /// Linear interpolation; `t = 0` is `self`, `t = 1` is `other`.
    pub fn lerp(self, other: Self, t: f64) -> Self {
        Self {
            x: self.x + (other.x - self.x) * t,
            y: self.y + (other.y - self.y) * t,
        }
    }
}

/// A one- or three-segment orthogonal route between two device centers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrthogonalPath {
    points: [Point; 4],
    count: usize,
}

impl OrthogonalPath {
    /// Route from `from` to `to`.
    ///
    /// Nearly level endpoints get one direct segment. Otherwise the path runs
    /// horizontally to `from.x + 0.6 * (to.x - from.x)`, vertically to the
    /// target's row, then horizontally into the target.
    pub fn route(from: Point, to: Point) -> Self {
        if (to.y - from.y).abs() < STRAIGHT_THRESHOLD {
            return Self {
                points: [from, to, to, to],
                count: 2,
            };
        }
        let mid_x = from.x + ELBOW_FRACTION * (to.x - from.x);
        Self {
            points: [from, Point::new(mid_x, from.y), Point::new(mid_x, to.y), to],
            count: 4,
        }
    }

    /// Vertices of the path, source first.
    pub fn points(&self) -> &[Point] {
        &self.points[..self.count]
    }

    /// Number of segments (1 or 3).
    pub fn segment_count(&self) -> usize {
        self.count - 1
    }

    /// Total arc length.
    pub fn length(&self) -> f64 {
        self.points().windows(2).map(|w| w[0].distance(w[1])).sum()
    }

    /// Position at parameter `t ∈ [0, 1]`, proportional to arc length.
    pub fn point_at(&self, t: f64) -> Point {
        self.locate(t).0
    }

    /// Position at `t`, pushed `lateral` units perpendicular to the segment
    /// the point lies on.
    pub fn point_at_offset(&self, t: f64, lateral: f64) -> Point {
        let (point, (dx, dy)) = self.locate(t);
        Point::new(point.x - dy * lateral, point.y + dx * lateral)
    }

    /// Point at `t` plus the unit direction of its segment.
    fn locate(&self, t: f64) -> (Point, (f64, f64)) {
        let points = self.points();
        let first = points[0];
        let last = points[points.len() - 1];
        let total = self.length();
        if total <= f64::EPSILON {
            return (first, (0.0, 0.0));
        }

        let mut remaining = t.clamp(0.0, 1.0) * total;
        for pair in points.windows(2) {
            let (start, end) = (pair[0], pair[1]);
            let len = start.distance(end);
            if len <= f64::EPSILON {
                continue;
            }
            let dir = ((end.x - start.x) / len, (end.y - start.y) / len);
            if remaining <= len {
                return (start.lerp(end, remaining / len), dir);
            }
            remaining -= len;
        }

        let tail = points[points.len() - 2];
        let len = tail.distance(last);
        let dir = if len > f64::EPSILON {
            ((last.x - tail.x) / len, (last.y - tail.y) / len)
        } else {
            (0.0, 0.0)
        };
        (last, dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Point, b: Point) -> bool {
        a.distance(b) < 1e-9
    }

    #[test]
    fn level_endpoints_route_straight() {
        let path = OrthogonalPath::route(Point::new(0.0, 100.0), Point::new(300.0, 100.0));
        assert_eq!(path.segment_count(), 1);
        assert!(close(path.point_at(0.5), Point::new(150.0, 100.0)));
    }

    #[test]
    fn small_vertical_delta_still_ends_on_target() {
        let from = Point::new(0.0, 100.0);
        let to = Point::new(200.0, 110.0);
        let path = OrthogonalPath::route(from, to);
        assert_eq!(path.segment_count(), 1);
        assert!(close(path.point_at(0.0), from));
        assert!(close(path.point_at(1.0), to));
    }

    #[test]
    fn elbow_sits_at_sixty_percent() {
        let path = OrthogonalPath::route(Point::new(100.0, 50.0), Point::new(600.0, 350.0));
        assert_eq!(path.segment_count(), 3);
        let pts = path.points();
        assert!(close(pts[1], Point::new(400.0, 50.0)));
        assert!(close(pts[2], Point::new(400.0, 350.0)));
    }

    #[test]
    fn endpoints_match_devices_for_three_segments() {
        let from = Point::new(100.0, 50.0);
        let to = Point::new(600.0, 350.0);
        let path = OrthogonalPath::route(from, to);
        assert!(close(path.point_at(0.0), from));
        assert!(close(path.point_at(1.0), to));
    }

    #[test]
    fn parameter_is_proportional_to_arc_length() {
        // Legs: 300 horizontal, 300 vertical, 200 horizontal => 800 total.
        let path = OrthogonalPath::route(Point::new(0.0, 0.0), Point::new(500.0, 300.0));
        assert!((path.length() - 800.0).abs() < 1e-9);
        // 300 / 800 lands exactly on the first elbow.
        assert!(close(path.point_at(0.375), Point::new(300.0, 0.0)));
        // Half way is 100 units down the vertical leg.
        assert!(close(path.point_at(0.5), Point::new(300.0, 100.0)));
    }

    #[test]
    fn path_is_continuous() {
        let path = OrthogonalPath::route(Point::new(10.0, 20.0), Point::new(410.0, 420.0));
        let steps = 1_000;
        let max_jump = path.length() / f64::from(steps) + 1e-9;
        let mut prev = path.point_at(0.0);
        for i in 1..=steps {
            let next = path.point_at(f64::from(i) / f64::from(steps));
            assert!(prev.distance(next) <= max_jump);
            prev = next;
        }
    }

    #[test]
    fn lateral_offset_is_perpendicular() {
        let path = OrthogonalPath::route(Point::new(0.0, 0.0), Point::new(100.0, 0.0));
        let p = path.point_at_offset(0.5, 3.0);
        assert!(close(p, Point::new(50.0, 3.0)));

        // On the vertical leg the offset is horizontal.
        let path = OrthogonalPath::route(Point::new(0.0, 0.0), Point::new(500.0, 300.0));
        let p = path.point_at_offset(0.5, 2.0);
        assert!(close(p, Point::new(298.0, 100.0)));
    }

    #[test]
    fn degenerate_path_stays_on_source() {
        let p = Point::new(5.0, 5.0);
        let path = OrthogonalPath::route(p, p);
        assert!(close(path.point_at(0.7), p));
    }

    #[test]
    fn out_of_range_parameter_is_clamped() {
        let from = Point::new(0.0, 0.0);
        let to = Point::new(100.0, 0.0);
        let path = OrthogonalPath::route(from, to);
        assert!(close(path.point_at(-1.0), from));
        assert!(close(path.point_at(2.0), to));
    }
}
