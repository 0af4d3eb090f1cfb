//! Pure raster operations over `RgbaImage`.
//!
//! Each function reads its inputs and returns a new buffer; nothing here
//! mutates a shared surface.

use image::{Rgba, RgbaImage};

use crate::geometry::PixelBox;
use crate::Point;

/// Integer rectangle inside a raster
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Result of [`recenter`]: the padded raster and how far the content moved
#[derive(Debug, Clone)]
pub struct Recentered {
    pub image: RgbaImage,
    pub shift_x: u32,
    pub shift_y: u32,
}

#[inline]
fn is_opaque(pixel: &Rgba<u8>, threshold: u8) -> bool {
    pixel[3] >= threshold
}

/// Copy the part of `image` under `bbox` for which `keep` holds.
///
/// `keep` receives source pixel coordinates. Pixels it rejects, and pixels
/// of `bbox` outside the source, stay fully transparent.
pub fn rasterize_clip<F>(image: &RgbaImage, bbox: PixelBox, keep: F) -> RgbaImage
where
    F: Fn(u32, u32) -> bool,
{
    let (src_w, src_h) = image.dimensions();
    RgbaImage::from_fn(bbox.width, bbox.height, |lx, ly| {
        let (sx, sy) = (bbox.x + lx, bbox.y + ly);
        if sx < src_w && sy < src_h && keep(sx, sy) {
            *image.get_pixel(sx, sy)
        } else {
            Rgba([0, 0, 0, 0])
        }
    })
}

/// Smallest region containing every pixel with alpha `>= threshold`
pub fn opaque_bounds(image: &RgbaImage, threshold: u8) -> Option<Region> {
    let mut min_x = u32::MAX;
    let mut min_y = u32::MAX;
    let mut max_x = 0;
    let mut max_y = 0;
    let mut found = false;

    for (x, y, pixel) in image.enumerate_pixels() {
        if is_opaque(pixel, threshold) {
            found = true;
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
    }

    found.then(|| Region {
        x: min_x,
        y: min_y,
        width: max_x - min_x + 1,
        height: max_y - min_y + 1,
    })
}

/// Copy of `region` out of `image`
pub fn crop(image: &RgbaImage, region: Region) -> RgbaImage {
    image::imageops::crop_imm(image, region.x, region.y, region.width, region.height).to_image()
}

/// Crop to the opaque bounds, returning the trimmed raster and the region
/// it came from. `None` when nothing is opaque.
pub fn trim(image: &RgbaImage, threshold: u8) -> Option<(RgbaImage, Region)> {
    let region = opaque_bounds(image, threshold)?;
    Some((crop(image, region), region))
}

pub fn count_opaque(image: &RgbaImage, threshold: u8) -> usize {
    image.pixels().filter(|p| is_opaque(p, threshold)).count()
}

/// Fraction of pixels that are opaque; 0 for an empty raster
pub fn opaque_ratio(image: &RgbaImage, threshold: u8) -> f64 {
    let total = image.width() as usize * image.height() as usize;
    if total == 0 {
        return 0.0;
    }
    count_opaque(image, threshold) as f64 / total as f64
}

/// Mean pixel index of the opaque pixels
pub fn opaque_centroid(image: &RgbaImage, threshold: u8) -> Option<Point> {
    let (mut sx, mut sy, mut n) = (0u64, 0u64, 0u64);
    for (x, y, pixel) in image.enumerate_pixels() {
        if is_opaque(pixel, threshold) {
            sx += x as u64;
            sy += y as u64;
            n += 1;
        }
    }
    (n > 0).then(|| Point::new(sx as f64 / n as f64, sy as f64 / n as f64))
}

/// The opaque pixel closest to `target`. Ties go to the first pixel in
/// row-major order, so the result is itself always opaque.
pub fn nearest_opaque(image: &RgbaImage, threshold: u8, target: Point) -> Option<(u32, u32)> {
    let mut best: Option<((u32, u32), f64)> = None;
    for (x, y, pixel) in image.enumerate_pixels() {
        if !is_opaque(pixel, threshold) {
            continue;
        }
        let d = Point::new(x as f64, y as f64).dist_sq(&target);
        if best.map_or(true, |(_, bd)| d < bd) {
            best = Some(((x, y), d));
        }
    }
    best.map(|(p, _)| p)
}

/// Pad `image` symmetrically so that pixel `pivot` becomes the centre pixel
/// `(width / 2, height / 2)` of the result.
///
/// The half-extent on each axis is the larger of the pivot's distances to the
/// two edges; the new size is twice that.
pub fn recenter(image: &RgbaImage, pivot: (u32, u32)) -> Recentered {
    let (w, h) = image.dimensions();
    let (px, py) = pivot;
    let half_x = px.max(w - px);
    let half_y = py.max(h - py);
    let shift_x = half_x - px;
    let shift_y = half_y - py;

    let mut out = RgbaImage::new(half_x * 2, half_y * 2);
    image::imageops::replace(&mut out, image, shift_x as i64, shift_y as i64);
    Recentered {
        image: out,
        shift_x,
        shift_y,
    }
}
