//! Pixel space (top-left origin, y down) to engine coordinate conventions.

use crate::{Piece, Point};

/// Pixels per world unit when none is configured
pub const DEFAULT_PIXELS_PER_UNIT: f64 = 100.0;

/// Source dimensions and scale that every conversion is relative to
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    pub width: f64,
    pub height: f64,
    pub pixels_per_unit: f64,
}

impl Frame {
    pub fn new(width: u32, height: u32, pixels_per_unit: f64) -> Self {
        Self {
            width: width as f64,
            height: height as f64,
            pixels_per_unit,
        }
    }
}

/// Stateless conversions parameterized by a [`Frame`]
#[derive(Debug, Clone, Copy)]
pub struct CoordinateMapper {
    frame: Frame,
}

impl CoordinateMapper {
    pub fn new(frame: Frame) -> Self {
        Self { frame }
    }

    pub fn frame(&self) -> Frame {
        self.frame
    }

    /// Centre of a piece's image in source pixel space
    pub fn pixel_center(piece: &Piece) -> Point {
        Point::new(
            piece.offset.0 as f64 + piece.width() as f64 / 2.0,
            piece.offset.1 as f64 + piece.height() as f64 / 2.0,
        )
    }

    /// Origin at image centre, y up, world units
    pub fn to_world(&self, center: Point) -> Point {
        let a = self.to_anchored(center);
        Point::new(a.x / self.frame.pixels_per_unit, a.y / self.frame.pixels_per_unit)
    }

    pub fn from_world(&self, world: Point) -> Point {
        self.from_anchored(Point::new(
            world.x * self.frame.pixels_per_unit,
            world.y * self.frame.pixels_per_unit,
        ))
    }

    /// Origin at image centre, y up, pixel units
    pub fn to_anchored(&self, center: Point) -> Point {
        Point::new(center.x - self.frame.width / 2.0, self.frame.height / 2.0 - center.y)
    }

    pub fn from_anchored(&self, anchored: Point) -> Point {
        Point::new(anchored.x + self.frame.width / 2.0, self.frame.height / 2.0 - anchored.y)
    }
}
