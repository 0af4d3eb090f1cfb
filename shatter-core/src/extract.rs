//! Cut each Voronoi cell out of the source and post-process it into a piece.

use image::RgbaImage;
use serde::{Deserialize, Serialize};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::raster;
use crate::sampler::DEFAULT_ALPHA_THRESHOLD;
use crate::tessellation::PixelOwnership;
use crate::{ClosedRing, Point, Tessellation};

/// Default cut-off for [`ExtractionStrategy::RatioFilter`]
pub const DEFAULT_MIN_OPAQUE_RATIO: f64 = 0.01;

/// How a rasterized cell is turned into a piece
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ExtractionStrategy {
    /// Trim to opaque bounds, then pad so an opaque pivot pixel sits at the
    /// image centre. Never drops a piece.
    #[default]
    PivotCentered,
    /// Keep the bounding-box raster as-is, dropping pieces whose opaque
    /// fraction is below `min_opaque_ratio`.
    RatioFilter { min_opaque_ratio: f64 },
}

impl ExtractionStrategy {
    pub fn ratio_filter() -> Self {
        ExtractionStrategy::RatioFilter {
            min_opaque_ratio: DEFAULT_MIN_OPAQUE_RATIO,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExtractConfig {
    pub alpha_threshold: u8,
    pub strategy: ExtractionStrategy,
    /// Carried for the preview; extraction ignores it
    pub include_outline: bool,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            alpha_threshold: DEFAULT_ALPHA_THRESHOLD,
            strategy: ExtractionStrategy::default(),
            include_outline: false,
        }
    }
}

/// One output piece
#[derive(Debug, Clone)]
pub struct Piece {
    /// Index of the seed the piece was cut from
    pub id: usize,
    pub image: RgbaImage,
    /// Top-left of `image` in source pixel space, after every trim and
    /// recenter shift. Negative when recentering grew the canvas past the
    /// source edge.
    pub offset: (i32, i32),
    /// Untranslated cell polygon in source pixel space
    pub cell: ClosedRing,
}

impl Piece {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Pivot in local pixel coordinates: the geometric centre of `image`
    pub fn pivot(&self) -> Point {
        Point::new(self.width() as f64 / 2.0, self.height() as f64 / 2.0)
    }
}

/// Extract a piece for every seed of `tessellation`, in seed order.
///
/// Degenerate cells are skipped. Under [`ExtractionStrategy::RatioFilter`]
/// sparse pieces are dropped too.
pub fn extract(
    image: &RgbaImage,
    tessellation: &Tessellation,
    config: &ExtractConfig,
) -> Vec<Piece> {
    if raster::opaque_bounds(image, config.alpha_threshold).is_none() {
        log::warn!(
            "source {:?} has no pixel with alpha >= {}; pieces keep their raw bounding boxes",
            image.dimensions(),
            config.alpha_threshold
        );
    }

    let ownership = PixelOwnership::new(tessellation, image.width(), image.height());

    #[cfg(feature = "parallel")]
    let indices = (0..tessellation.len()).into_par_iter();
    #[cfg(not(feature = "parallel"))]
    let indices = 0..tessellation.len();

    let pieces: Vec<Piece> = indices
        .filter_map(|i| extract_cell(image, tessellation, &ownership, i, config))
        .collect();

    log::debug!(
        "extracted {} pieces from {} seeds ({:?})",
        pieces.len(),
        tessellation.len(),
        config.strategy
    );
    pieces
}

fn extract_cell(
    image: &RgbaImage,
    tessellation: &Tessellation,
    ownership: &PixelOwnership<'_>,
    index: usize,
    config: &ExtractConfig,
) -> Option<Piece> {
    let Some(cell) = tessellation.cell_polygon(index) else {
        log::debug!("seed {} has no cell", index);
        return None;
    };
    let bbox = ownership.pixel_box(index)?;
    let candidates = ownership.candidates(index);
    let raw = raster::rasterize_clip(image, bbox, |x, y| {
        ownership.owner(x, y, &candidates) == Some(index)
    });
    let origin = (bbox.x as i32, bbox.y as i32);

    let (piece_image, offset) = match config.strategy {
        ExtractionStrategy::PivotCentered => pivot_center(raw, origin, config.alpha_threshold),
        ExtractionStrategy::RatioFilter { min_opaque_ratio } => {
            let ratio = raster::opaque_ratio(&raw, config.alpha_threshold);
            if ratio < min_opaque_ratio {
                log::debug!(
                    "dropping piece {} (opaque ratio {:.4} < {})",
                    index,
                    ratio,
                    min_opaque_ratio
                );
                return None;
            }
            (raw, origin)
        }
    };

    Some(Piece {
        id: index,
        image: piece_image,
        offset,
        cell: cell.clone(),
    })
}

/// Trim, pick the opaque pixel nearest the opaque centroid, and pad so that
/// pixel lands on the centre. A raster with nothing opaque is returned unchanged.
fn pivot_center(raw: RgbaImage, origin: (i32, i32), threshold: u8) -> (RgbaImage, (i32, i32)) {
    let Some((trimmed, region)) = raster::trim(&raw, threshold) else {
        return (raw, origin);
    };
    let pivot = raster::opaque_centroid(&trimmed, threshold)
        .and_then(|c| raster::nearest_opaque(&trimmed, threshold, c));
    let Some(pivot) = pivot else {
        return (trimmed, (origin.0 + region.x as i32, origin.1 + region.y as i32));
    };

    let recentered = raster::recenter(&trimmed, pivot);
    let offset = (
        origin.0 + region.x as i32 - recentered.shift_x as i32,
        origin.1 + region.y as i32 - recentered.shift_y as i32,
    );
    (recentered.image, offset)
}
