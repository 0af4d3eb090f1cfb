//! Points, rectangles and closed polygon rings in image pixel space.
//!
//! Pixel space has its origin at the top-left corner with y pointing down.

use serde::{Deserialize, Serialize};

/// 2D point in pixel space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Squared distance to another point
    pub fn dist_sq(&self, other: &Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    /// Distance to another point
    pub fn dist(&self, other: &Point) -> f64 {
        self.dist_sq(other).sqrt()
    }

    pub fn translate(&self, dx: f64, dy: f64) -> Point {
        Point::new(self.x + dx, self.y + dy)
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Axis-aligned rectangle `[x, x + width) × [y, y + height)`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// `[0, 0, width, height]`, the usual bounds for an image
    pub fn from_size(width: u32, height: u32) -> Self {
        Self::new(0.0, 0.0, width as f64, height as f64)
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    pub fn max_x(&self) -> f64 {
        self.x + self.width
    }

    pub fn max_y(&self) -> f64 {
        self.y + self.height
    }

    /// Corners as a ring
    pub fn to_ring(&self) -> ClosedRing {
        ClosedRing::new(vec![
            Point::new(self.x, self.y),
            Point::new(self.max_x(), self.y),
            Point::new(self.max_x(), self.max_y()),
            Point::new(self.x, self.max_y()),
        ])
    }
}

/// Integer bounding box of a ring, clamped to an image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelBox {
    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.x && x - self.x < self.width && y >= self.y && y - self.y < self.height
    }

    pub fn overlaps(&self, other: &PixelBox) -> bool {
        self.x < other.x + other.width
            && other.x < self.x + self.width
            && self.y < other.y + other.height
            && other.y < self.y + self.height
    }
}

/// A closed polygon: an ordered vertex list with an implicit edge from the
/// last vertex back to the first.
///
/// The closing edge is never stored as a repeated vertex. Use [`ClosedRing::edges`]
/// to walk every edge including the closing one. Winding direction is not
/// guaranteed, so [`ClosedRing::area`] is the absolute value.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ClosedRing {
    vertices: Vec<Point>,
}

impl ClosedRing {
    pub fn new(vertices: Vec<Point>) -> Self {
        Self { vertices }
    }

    pub fn vertices(&self) -> &[Point] {
        &self.vertices
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Every edge as `(from, to)`, ending with the closing edge `last → first`
    pub fn edges(&self) -> impl Iterator<Item = (Point, Point)> + '_ {
        let n = self.vertices.len();
        let closing = if n >= 2 {
            Some((self.vertices[n - 1], self.vertices[0]))
        } else {
            None
        };
        self.vertices
            .windows(2)
            .map(|w| (w[0], w[1]))
            .chain(closing)
    }

    pub fn signed_area(&self) -> f64 {
        self.edges()
            .map(|(a, b)| a.x * b.y - b.x * a.y)
            .sum::<f64>()
            * 0.5
    }

    pub fn area(&self) -> f64 {
        self.signed_area().abs()
    }

    /// `(min_x, min_y, max_x, max_y)`, or `None` for an empty ring
    pub fn extent(&self) -> Option<(f64, f64, f64, f64)> {
        let first = self.vertices.first()?;
        let init = (first.x, first.y, first.x, first.y);
        Some(self.vertices.iter().fold(init, |(x0, y0, x1, y1), p| {
            (x0.min(p.x), y0.min(p.y), x1.max(p.x), y1.max(p.y))
        }))
    }

    /// Pixel bounding box: floor of the minimum, ceil of the maximum, clamped
    /// to `width × height` and never smaller than 1×1.
    pub fn pixel_box(&self, width: u32, height: u32) -> Option<PixelBox> {
        let (min_x, min_y, max_x, max_y) = self.extent()?;
        let clamp = |v: f64, hi: u32| v.max(0.0).min(hi as f64) as u32;

        let x0 = clamp(min_x.floor(), width.saturating_sub(1));
        let y0 = clamp(min_y.floor(), height.saturating_sub(1));
        let x1 = clamp(max_x.ceil(), width);
        let y1 = clamp(max_y.ceil(), height);

        Some(PixelBox {
            x: x0,
            y: y0,
            width: x1.saturating_sub(x0).max(1),
            height: y1.saturating_sub(y0).max(1),
        })
    }

    pub fn translate(&self, dx: f64, dy: f64) -> ClosedRing {
        ClosedRing::new(self.vertices.iter().map(|p| p.translate(dx, dy)).collect())
    }

    /// Even-odd crossing test with half-open edges.
    ///
    /// A point on an edge shared by two rings with identical vertices is
    /// reported inside exactly one of them.
    pub fn contains(&self, p: Point) -> bool {
        let mut inside = false;
        for (a, b) in self.edges() {
            if (a.y > p.y) != (b.y > p.y) {
                let x_cross = a.x + (p.y - a.y) * (b.x - a.x) / (b.y - a.y);
                if p.x < x_cross {
                    inside = !inside;
                }
            }
        }
        inside
    }

    /// Keep the part of a convex ring on the side of the line where
    /// `(p - origin) · normal <= 0`.
    pub fn clip_half_plane(&self, origin: Point, normal: Point) -> ClosedRing {
        let side = |p: &Point| (p.x - origin.x) * normal.x + (p.y - origin.y) * normal.y;

        let mut out = Vec::with_capacity(self.vertices.len() + 1);
        for (a, b) in self.edges() {
            let (da, db) = (side(&a), side(&b));
            if da <= 0.0 {
                out.push(a);
            }
            if (da <= 0.0) != (db <= 0.0) {
                let t = da / (da - db);
                out.push(Point::new(a.x + t * (b.x - a.x), a.y + t * (b.y - a.y)));
            }
        }
        ClosedRing::new(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_square() -> ClosedRing {
        Rect::new(0.0, 0.0, 1.0, 1.0).to_ring()
    }

    #[test]
    fn edges_include_closing_edge() {
        let ring = unit_square();
        let edges: Vec<_> = ring.edges().collect();
        assert_eq!(edges.len(), 4);
        assert_eq!(edges[3], (Point::new(0.0, 1.0), Point::new(0.0, 0.0)));
    }

    #[test]
    fn area_ignores_winding() {
        let ring = Rect::new(2.0, 3.0, 4.0, 5.0).to_ring();
        let reversed = ClosedRing::new(ring.vertices().iter().rev().copied().collect());
        assert_relative_eq!(ring.area(), 20.0);
        assert_relative_eq!(reversed.area(), 20.0);
        assert!(ring.signed_area() * reversed.signed_area() < 0.0);
    }

    #[test]
    fn pixel_box_rounds_outward_and_clamps() {
        let ring = ClosedRing::new(vec![
            Point::new(1.2, 2.7),
            Point::new(5.5, 2.7),
            Point::new(5.5, 12.0),
        ]);
        let bbox = ring.pixel_box(8, 10).unwrap();
        assert_eq!(bbox, PixelBox { x: 1, y: 2, width: 7, height: 8 });
    }

    #[test]
    fn pixel_box_contains_and_overlaps() {
        let a = PixelBox { x: 2, y: 3, width: 4, height: 2 };
        assert!(a.contains(2, 3));
        assert!(a.contains(5, 4));
        assert!(!a.contains(6, 4));
        assert!(!a.contains(1, 3));
        assert!(a.overlaps(&PixelBox { x: 5, y: 4, width: 3, height: 3 }));
        assert!(!a.overlaps(&PixelBox { x: 6, y: 3, width: 3, height: 3 }));
    }

    #[test]
    fn pixel_box_is_never_empty() {
        let sliver = ClosedRing::new(vec![
            Point::new(3.0, 3.0),
            Point::new(3.0, 3.0),
            Point::new(3.0, 3.0),
        ]);
        let bbox = sliver.pixel_box(10, 10).unwrap();
        assert_eq!((bbox.width, bbox.height), (1, 1));
        assert!(ClosedRing::default().pixel_box(10, 10).is_none());
    }

    #[test]
    fn shared_edge_belongs_to_one_side() {
        let left = Rect::new(0.0, 0.0, 1.0, 2.0).to_ring();
        let right = Rect::new(1.0, 0.0, 1.0, 2.0).to_ring();
        let on_edge = Point::new(1.0, 0.5);
        assert_ne!(left.contains(on_edge), right.contains(on_edge));
    }

    #[test]
    fn clip_half_plane_cuts_square_in_half() {
        let clipped = Rect::new(0.0, 0.0, 2.0, 2.0)
            .to_ring()
            .clip_half_plane(Point::new(1.0, 0.0), Point::new(1.0, 0.0));
        assert_relative_eq!(clipped.area(), 2.0);
        let (_, _, max_x, _) = clipped.extent().unwrap();
        assert_relative_eq!(max_x, 1.0);
    }
}
