//! Reassemble pieces onto a fresh surface for live preview.

use image::{Rgba, RgbaImage};

use crate::{ClosedRing, Piece};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreviewOptions {
    pub include_outline: bool,
    pub outline_color: Rgba<u8>,
}

impl Default for PreviewOptions {
    fn default() -> Self {
        Self {
            include_outline: false,
            outline_color: Rgba([255, 255, 255, 200]),
        }
    }
}

/// Draw every piece at its offset on a cleared `width × height` surface.
///
/// Outlines are stroked from each piece's original cell polygon, not from the
/// trimmed and recentered raster bounds, so they show the true tessellation
/// even where a piece's image is smaller or larger than its cell.
pub fn render(width: u32, height: u32, pieces: &[Piece], options: &PreviewOptions) -> RgbaImage {
    let mut surface = RgbaImage::new(width, height);
    for piece in pieces {
        draw_image(&mut surface, &piece.image, piece.offset);
    }
    if options.include_outline {
        for piece in pieces {
            stroke_ring(&mut surface, &piece.cell, options.outline_color);
        }
    }
    surface
}

fn draw_image(surface: &mut RgbaImage, image: &RgbaImage, offset: (i32, i32)) {
    let (sw, sh) = (surface.width() as i64, surface.height() as i64);
    for (x, y, src) in image.enumerate_pixels() {
        if src[3] == 0 {
            continue;
        }
        let dx = offset.0 as i64 + x as i64;
        let dy = offset.1 as i64 + y as i64;
        if dx < 0 || dy < 0 || dx >= sw || dy >= sh {
            continue;
        }
        let dst = surface.get_pixel_mut(dx as u32, dy as u32);
        *dst = source_over(*src, *dst);
    }
}

/// Porter-Duff source-over on straight (non-premultiplied) alpha
fn source_over(src: Rgba<u8>, dst: Rgba<u8>) -> Rgba<u8> {
    if src[3] == 255 || dst[3] == 0 {
        return src;
    }
    if src[3] == 0 {
        return dst;
    }
    let sa = src[3] as f32 / 255.0;
    let da = dst[3] as f32 / 255.0;
    let out_a = sa + da * (1.0 - sa);
    let mut out = [0u8; 4];
    for c in 0..3 {
        let v = (src[c] as f32 * sa + dst[c] as f32 * da * (1.0 - sa)) / out_a;
        out[c] = v.round().clamp(0.0, 255.0) as u8;
    }
    out[3] = (out_a * 255.0).round().clamp(0.0, 255.0) as u8;
    Rgba(out)
}

fn stroke_ring(surface: &mut RgbaImage, ring: &ClosedRing, color: Rgba<u8>) {
    for (a, b) in ring.edges() {
        draw_line(
            surface,
            a.x.floor() as i64,
            a.y.floor() as i64,
            b.x.floor() as i64,
            b.y.floor() as i64,
            color,
        );
    }
}

/// Bresenham line, clipped to the surface
fn draw_line(surface: &mut RgbaImage, x0: i64, y0: i64, x1: i64, y1: i64, color: Rgba<u8>) {
    let (w, h) = (surface.width() as i64, surface.height() as i64);
    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let (mut x, mut y) = (x0, y0);
    let mut err = dx + dy;

    loop {
        if x >= 0 && y >= 0 && x < w && y < h {
            let dst = surface.get_pixel_mut(x as u32, y as u32);
            *dst = source_over(color, *dst);
        }
        if x == x1 && y == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{extract, ExtractConfig, ExtractionStrategy, Point, Rect, Tessellation};

    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);

    #[test]
    fn source_over_edge_cases() {
        let dst = Rgba([10, 20, 30, 255]);
        assert_eq!(source_over(Rgba([0, 0, 0, 0]), dst), dst);
        assert_eq!(source_over(RED, dst), RED);
        let half = Rgba([200, 100, 50, 128]);
        assert_eq!(source_over(half, Rgba([0, 0, 0, 0])), half);
    }

    #[test]
    fn pieces_land_at_their_offsets() {
        let mut tile = RgbaImage::new(3, 3);
        tile.put_pixel(1, 1, RED);
        let piece = Piece {
            id: 0,
            image: tile,
            offset: (-1, 4),
            cell: Rect::new(0.0, 0.0, 1.0, 1.0).to_ring(),
        };
        let out = render(8, 8, &[piece], &PreviewOptions::default());
        assert_eq!(*out.get_pixel(0, 5), RED);
        assert_eq!(out.pixels().filter(|p| p[3] > 0).count(), 1);
    }

    #[test]
    fn outline_follows_original_cell_not_piece_bounds() {
        // One opaque pixel in the middle of a single 20x20 cell: the piece is
        // trimmed down to 2x2, but the outline must still trace the full cell.
        let mut image = RgbaImage::new(20, 20);
        image.put_pixel(10, 10, RED);
        let t = Tessellation::build(&[Point::new(10.0, 10.0)], Rect::from_size(20, 20));
        let config = ExtractConfig {
            strategy: ExtractionStrategy::PivotCentered,
            include_outline: true,
            ..ExtractConfig::default()
        };
        let pieces = extract(&image, &t, &config);
        assert_eq!(pieces[0].image.dimensions(), (2, 2));
        assert_eq!(pieces[0].offset, (9, 9));

        let options = PreviewOptions {
            include_outline: true,
            outline_color: Rgba([0, 255, 0, 255]),
        };
        let out = render(20, 20, &pieces, &options);
        let green = Rgba([0, 255, 0, 255]);
        // Cell border at the surface edge, far away from the piece's 2x2 bounds
        assert_eq!(*out.get_pixel(0, 0), green);
        assert_eq!(*out.get_pixel(19, 0), green);
        assert_eq!(*out.get_pixel(0, 19), green);
        assert_eq!(*out.get_pixel(5, 0), green);
        // Nothing stroked around the piece's own bounds
        assert_eq!(*out.get_pixel(9, 9), Rgba([0, 0, 0, 0]));
        assert_eq!(*out.get_pixel(10, 10), RED);
    }

    #[test]
    fn no_outline_unless_requested() {
        let piece = Piece {
            id: 3,
            image: RgbaImage::new(1, 1),
            offset: (0, 0),
            cell: Rect::from_size(10, 10).to_ring(),
        };
        let out = render(10, 10, &[piece], &PreviewOptions::default());
        assert!(out.pixels().all(|p| p[3] == 0));
    }
}
