//! PNG encoding and manifest records for handing pieces to an exporter.
//!
//! Encodes run independently per piece; the manifest is only built after all
//! of them have finished. How the manifest is serialized and packaged is up
//! to the caller.

use std::io::Cursor;

use serde::{Deserialize, Serialize};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::mapper::{CoordinateMapper, Frame};
use crate::{Piece, Result, SliceError};

/// Pixel rectangle of a piece in source space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PixelBounds {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl From<crate::Point> for Vec2 {
    fn from(p: crate::Point) -> Self {
        Self { x: p.x, y: p.y }
    }
}

/// Centre and size in anchored-rect space (origin at image centre, y up, pixels)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnchoredRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Everything an engine importer needs to place one piece
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PieceRecord {
    pub id: usize,
    pub file_name: String,
    pub bounds: PixelBounds,
    pub pixel_center: Vec2,
    pub world_center: Vec2,
    pub anchored: AnchoredRect,
    /// Cell vertices in full-image pixels
    pub polygon_absolute: Vec<[f64; 2]>,
    /// Cell vertices relative to the piece's top-left
    pub polygon_local: Vec<[f64; 2]>,
}

impl PieceRecord {
    pub fn new(piece: &Piece, file_name: String, mapper: &CoordinateMapper) -> Self {
        let center = CoordinateMapper::pixel_center(piece);
        let anchored = mapper.to_anchored(center);
        let (ox, oy) = (piece.offset.0 as f64, piece.offset.1 as f64);
        Self {
            id: piece.id,
            file_name,
            bounds: PixelBounds {
                x: piece.offset.0,
                y: piece.offset.1,
                width: piece.width(),
                height: piece.height(),
            },
            pixel_center: center.into(),
            world_center: mapper.to_world(center).into(),
            anchored: AnchoredRect {
                x: anchored.x,
                y: anchored.y,
                width: piece.width() as f64,
                height: piece.height() as f64,
            },
            polygon_absolute: piece.cell.vertices().iter().map(|p| [p.x, p.y]).collect(),
            polygon_local: piece.cell.vertices().iter().map(|p| [p.x - ox, p.y - oy]).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub source_width: u32,
    pub source_height: u32,
    pub pixels_per_unit: f64,
    /// Where the sliced source sat inside the originally supplied image
    pub source_offset: [u32; 2],
    pub pieces: Vec<PieceRecord>,
}

/// File naming for exported pieces: `{prefix}_{id:03}.png`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Naming {
    pub prefix: String,
}

impl Default for Naming {
    fn default() -> Self {
        Self {
            prefix: "piece".to_string(),
        }
    }
}

impl Naming {
    pub fn file_name(&self, id: usize) -> String {
        format!("{}_{:03}.png", self.prefix, id)
    }
}

#[derive(Debug, Clone)]
pub struct EncodedPiece {
    pub id: usize,
    pub file_name: String,
    pub png: Vec<u8>,
}

/// Output of [`export`]: successful files plus any per-piece failures
#[derive(Debug)]
pub struct ExportBundle {
    pub manifest: Manifest,
    pub files: Vec<EncodedPiece>,
    pub failures: Vec<SliceError>,
}

pub fn encode_png(piece: &Piece) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    piece
        .image
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .map_err(|source| SliceError::Encode { id: piece.id, source })?;
    Ok(bytes)
}

/// Encode every piece and describe the successful ones in a manifest.
///
/// A piece that fails to encode is reported in `failures` and left out of
/// the manifest; the others are unaffected.
pub fn export(
    pieces: &[Piece],
    frame: Frame,
    source_offset: [u32; 2],
    naming: &Naming,
) -> ExportBundle {
    #[cfg(feature = "parallel")]
    let encoded: Vec<Result<Vec<u8>>> = pieces.par_iter().map(encode_png).collect();
    #[cfg(not(feature = "parallel"))]
    let encoded: Vec<Result<Vec<u8>>> = pieces.iter().map(encode_png).collect();

    let mapper = CoordinateMapper::new(frame);
    let mut records = Vec::with_capacity(pieces.len());
    let mut files = Vec::with_capacity(pieces.len());
    let mut failures = Vec::new();

    for (piece, result) in pieces.iter().zip(encoded) {
        match result {
            Ok(png) => {
                let file_name = naming.file_name(piece.id);
                records.push(PieceRecord::new(piece, file_name.clone(), &mapper));
                files.push(EncodedPiece {
                    id: piece.id,
                    file_name,
                    png,
                });
            }
            Err(e) => {
                log::warn!("{}", e);
                failures.push(e);
            }
        }
    }

    ExportBundle {
        manifest: Manifest {
            source_width: frame.width as u32,
            source_height: frame.height as u32,
            pixels_per_unit: frame.pixels_per_unit,
            source_offset,
            pieces: records,
        },
        files,
        failures,
    }
}
