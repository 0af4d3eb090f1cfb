//! Bounded Voronoi tessellation built on the Delaunay dual.
//!
//! Each cell starts as the bounds rectangle and is cut by the perpendicular
//! bisector of every Delaunay neighbour of its seed. Cells are convex, so the
//! cut is a single half-plane clip per neighbour.
//!
//! The polygons describe cell shapes. Which cell a pixel belongs to is decided
//! by [`PixelOwnership`], which compares seed distances directly so that
//! neighbouring cells never disagree about a pixel on their shared edge.

use spade::{DelaunayTriangulation, Point2, Triangulation};

use crate::geometry::PixelBox;
use crate::{ClosedRing, Point, Rect};

/// Cells with less area than this are treated as empty
const MIN_CELL_AREA: f64 = 1e-9;

/// One Voronoi region: its seed index and clipped polygon
#[derive(Debug, Clone, Copy)]
pub struct Cell<'a> {
    pub index: usize,
    pub polygon: &'a ClosedRing,
}

/// Planar subdivision of `bounds`, one (possibly empty) cell per seed
#[derive(Debug, Clone)]
pub struct Tessellation {
    bounds: Rect,
    seeds: Vec<Point>,
    cells: Vec<Option<ClosedRing>>,
}

impl Tessellation {
    /// Build the Voronoi diagram of `points` clipped to `bounds`.
    ///
    /// Never fails: duplicate seeds leave their later copies empty, and seeds
    /// the triangulation rejects (non-finite or out of range) get no cell.
    pub fn build(points: &[Point], bounds: Rect) -> Self {
        let mut triangulation: DelaunayTriangulation<Point2<f64>> = DelaunayTriangulation::new();

        // Vertex handle per seed, None when rejected
        let mut handles = Vec::with_capacity(points.len());
        for (i, p) in points.iter().enumerate() {
            if !p.is_finite() {
                log::warn!("seed {} at {:?} is not finite, skipping", i, p);
                handles.push(None);
                continue;
            }
            match triangulation.insert(Point2::new(p.x, p.y)) {
                Ok(handle) => handles.push(Some(handle)),
                Err(e) => {
                    log::warn!("seed {} at {:?} rejected by triangulation: {:?}", i, p, e);
                    handles.push(None);
                }
            }
        }

        // First seed index owning each vertex
        let mut owner: Vec<Option<usize>> = vec![None; triangulation.num_vertices()];
        for (i, handle) in handles.iter().enumerate() {
            if let Some(h) = handle {
                if owner[h.index()].is_none() {
                    owner[h.index()] = Some(i);
                }
            }
        }

        let collinear = triangulation.all_vertices_on_line();
        let unique: Vec<Point> = owner.iter().flatten().map(|&i| points[i]).collect();

        let cells = handles
            .iter()
            .enumerate()
            .map(|(i, handle)| {
                let handle = (*handle)?;
                if owner[handle.index()] != Some(i) {
                    log::debug!("seed {} duplicates seed {:?}, no cell", i, owner[handle.index()]);
                    return None;
                }
                let seed = points[i];
                let neighbours: Vec<Point> = if collinear {
                    // Degenerate triangulations carry no faces; cut against every seed
                    unique.iter().copied().filter(|q| *q != seed).collect()
                } else {
                    triangulation
                        .vertex(handle)
                        .out_edges()
                        .map(|edge| {
                            let q = edge.to().position();
                            Point::new(q.x, q.y)
                        })
                        .collect()
                };
                clip_cell(seed, &neighbours, bounds)
            })
            .collect();

        Self {
            bounds,
            seeds: points.to_vec(),
            cells,
        }
    }

    /// Clipped polygon for seed `index`, or `None` if it has no visible area
    pub fn cell_polygon(&self, index: usize) -> Option<&ClosedRing> {
        self.cells.get(index).and_then(Option::as_ref)
    }

    /// Number of seeds (not all of which need a cell)
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    pub fn seeds(&self) -> &[Point] {
        &self.seeds
    }

    /// Non-empty cells in seed order
    pub fn cells(&self) -> impl Iterator<Item = Cell<'_>> {
        self.cells
            .iter()
            .enumerate()
            .filter_map(|(index, cell)| cell.as_ref().map(|polygon| Cell { index, polygon }))
    }
}

/// Pixel-to-cell assignment for one raster.
///
/// A pixel belongs to the seed nearest its centre among the cells whose pixel
/// box covers it, the lowest index winning on equal distance. The rule depends
/// only on the pixel, so every pixel covered by some cell has exactly one owner.
#[derive(Debug, Clone)]
pub struct PixelOwnership<'a> {
    seeds: &'a [Point],
    boxes: Vec<Option<PixelBox>>,
}

impl<'a> PixelOwnership<'a> {
    pub fn new(tessellation: &'a Tessellation, width: u32, height: u32) -> Self {
        let boxes = (0..tessellation.len())
            .map(|i| tessellation.cell_polygon(i).and_then(|c| c.pixel_box(width, height)))
            .collect();
        Self {
            seeds: tessellation.seeds(),
            boxes,
        }
    }

    pub fn pixel_box(&self, index: usize) -> Option<PixelBox> {
        self.boxes.get(index).copied().flatten()
    }

    /// Cells whose pixel box overlaps that of `index`, `index` included
    pub fn candidates(&self, index: usize) -> Vec<usize> {
        let Some(own) = self.pixel_box(index) else {
            return Vec::new();
        };
        self.boxes
            .iter()
            .enumerate()
            .filter(|(_, b)| b.map_or(false, |b| b.overlaps(&own)))
            .map(|(j, _)| j)
            .collect()
    }

    /// Owner of pixel `(x, y)` among `candidates`, which must be sorted by index
    /// and include every cell whose box covers the pixel.
    pub fn owner(&self, x: u32, y: u32, candidates: &[usize]) -> Option<usize> {
        let centre = Point::new(x as f64 + 0.5, y as f64 + 0.5);
        let mut best: Option<(usize, f64)> = None;
        for &j in candidates {
            if !self.boxes[j].map_or(false, |b| b.contains(x, y)) {
                continue;
            }
            let d = centre.dist_sq(&self.seeds[j]);
            if best.map_or(true, |(_, bd)| d < bd) {
                best = Some((j, d));
            }
        }
        best.map(|(j, _)| j)
    }
}

/// Intersect `bounds` with the half-planes closer to `seed` than to each neighbour
fn clip_cell(seed: Point, neighbours: &[Point], bounds: Rect) -> Option<ClosedRing> {
    let mut ring = bounds.to_ring();
    for q in neighbours {
        let mid = Point::new((seed.x + q.x) * 0.5, (seed.y + q.y) * 0.5);
        let normal = Point::new(q.x - seed.x, q.y - seed.y);
        ring = ring.clip_half_plane(mid, normal);
        if ring.len() < 3 {
            return None;
        }
    }
    if ring.len() < 3 || ring.area() <= MIN_CELL_AREA {
        return None;
    }
    Some(ring)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    fn total_area(t: &Tessellation) -> f64 {
        (0..t.len())
            .filter_map(|i| t.cell_polygon(i))
            .map(ClosedRing::area)
            .sum()
    }

    #[test]
    fn single_seed_takes_whole_bounds() {
        let bounds = Rect::from_size(10, 10);
        let t = Tessellation::build(&[Point::new(3.0, 4.0)], bounds);
        assert_eq!(t.len(), 1);
        assert_abs_diff_eq!(t.cell_polygon(0).unwrap().area(), 100.0, epsilon = 1e-9);
    }

    #[test]
    fn no_seeds_no_cells() {
        let t = Tessellation::build(&[], Rect::from_size(10, 10));
        assert!(t.is_empty());
        assert!(t.cell_polygon(0).is_none());
    }

    #[test]
    fn corner_seeds_give_quadrants() {
        let bounds = Rect::from_size(100, 100);
        let seeds = [
            Point::new(0.0, 0.0),
            Point::new(100.0, 0.0),
            Point::new(0.0, 100.0),
            Point::new(100.0, 100.0),
        ];
        let t = Tessellation::build(&seeds, bounds);
        for i in 0..4 {
            let cell = t.cell_polygon(i).unwrap();
            assert_abs_diff_eq!(cell.area(), 2500.0, epsilon = 1e-6);
            assert!(cell.contains(seeds[i].translate(
                if seeds[i].x > 0.0 { -1.0 } else { 1.0 },
                if seeds[i].y > 0.0 { -1.0 } else { 1.0 },
            )));
        }
        assert_abs_diff_eq!(total_area(&t), 10_000.0, epsilon = 1e-6);
    }

    #[test]
    fn random_seeds_cover_bounds() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let bounds = Rect::from_size(320, 200);
        let seeds: Vec<Point> = (0..150)
            .map(|_| Point::new(rng.gen_range(0.0..320.0), rng.gen_range(0.0..200.0)))
            .collect();
        let t = Tessellation::build(&seeds, bounds);
        assert_eq!(t.cells().count(), 150);
        assert_abs_diff_eq!(total_area(&t), bounds.area(), epsilon = 1e-6);
    }

    #[test]
    fn cell_contains_its_seed() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let seeds: Vec<Point> = (0..40)
            .map(|_| Point::new(rng.gen_range(1.0..99.0), rng.gen_range(1.0..99.0)))
            .collect();
        let t = Tessellation::build(&seeds, Rect::from_size(100, 100));
        for cell in t.cells() {
            assert!(
                cell.polygon.contains(seeds[cell.index]),
                "seed {} outside its cell",
                cell.index
            );
        }
    }

    #[test]
    fn duplicates_leave_later_copy_empty() {
        let seeds = [
            Point::new(10.0, 10.0),
            Point::new(30.0, 30.0),
            Point::new(10.0, 10.0),
        ];
        let t = Tessellation::build(&seeds, Rect::from_size(40, 40));
        assert_eq!(t.len(), 3);
        assert!(t.cell_polygon(0).is_some());
        assert!(t.cell_polygon(1).is_some());
        assert!(t.cell_polygon(2).is_none());
        assert_abs_diff_eq!(total_area(&t), 1600.0, epsilon = 1e-6);
    }

    #[test]
    fn collinear_seeds_make_strips() {
        let seeds = [
            Point::new(5.0, 10.0),
            Point::new(15.0, 10.0),
            Point::new(25.0, 10.0),
        ];
        let t = Tessellation::build(&seeds, Rect::from_size(30, 20));
        let areas: Vec<f64> = (0..3).map(|i| t.cell_polygon(i).unwrap().area()).collect();
        assert_abs_diff_eq!(areas[0], 200.0, epsilon = 1e-9);
        assert_abs_diff_eq!(areas[1], 200.0, epsilon = 1e-9);
        assert_abs_diff_eq!(areas[2], 200.0, epsilon = 1e-9);
    }

    #[test]
    fn equidistant_pixel_goes_to_lowest_index() {
        // Pixel row 1 has its centre on the bisector y = 1.5
        let seeds = [Point::new(0.5, 3.0), Point::new(0.5, 0.0)];
        let t = Tessellation::build(&seeds, Rect::from_size(1, 3));
        let ownership = PixelOwnership::new(&t, 1, 3);
        assert!(ownership.pixel_box(0).unwrap().contains(0, 1));
        assert!(ownership.pixel_box(1).unwrap().contains(0, 1));

        let candidates = ownership.candidates(1);
        assert_eq!(candidates, vec![0, 1]);
        assert_eq!(ownership.owner(0, 0, &candidates), Some(1));
        assert_eq!(ownership.owner(0, 1, &candidates), Some(0));
        assert_eq!(ownership.owner(0, 2, &candidates), Some(0));
    }

    #[test]
    fn duplicate_seed_owns_no_pixels() {
        let seeds = [Point::new(2.0, 2.0), Point::new(2.0, 2.0)];
        let t = Tessellation::build(&seeds, Rect::from_size(4, 4));
        let ownership = PixelOwnership::new(&t, 4, 4);
        assert!(ownership.pixel_box(1).is_none());
        assert!(ownership.candidates(1).is_empty());
        assert_eq!(ownership.owner(3, 3, &ownership.candidates(0)), Some(0));
    }

    #[test]
    fn non_finite_seed_is_skipped() {
        let seeds = [Point::new(f64::NAN, 1.0), Point::new(5.0, 5.0)];
        let t = Tessellation::build(&seeds, Rect::from_size(10, 10));
        assert!(t.cell_polygon(0).is_none());
        assert_abs_diff_eq!(t.cell_polygon(1).unwrap().area(), 100.0, epsilon = 1e-9);
    }
}
