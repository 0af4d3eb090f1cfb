//! Source preparation, the end-to-end slice pipeline, and generation tracking
//! so a newer slice supersedes any older one still in flight.

use image::RgbaImage;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::export::{self, ExportBundle, Naming};
use crate::mapper::Frame;
use crate::preview::{self, PreviewOptions};
use crate::{extract, raster, Piece, Point, Rect, Result, SliceConfig, SliceError, Tessellation};

/// A decoded source image, optionally cropped once to its opaque bounds
#[derive(Debug, Clone)]
pub struct Source {
    image: RgbaImage,
    trim_offset: (u32, u32),
    original_size: (u32, u32),
}

impl Source {
    pub fn prepare(image: RgbaImage, threshold: u8, auto_trim: bool) -> Result<Self> {
        let (w, h) = image.dimensions();
        if w == 0 || h == 0 {
            return Err(SliceError::InvalidInput(format!("image is {}x{}", w, h)));
        }
        if !auto_trim {
            return Ok(Self {
                image,
                trim_offset: (0, 0),
                original_size: (w, h),
            });
        }
        match raster::trim(&image, threshold) {
            Some((trimmed, region)) => {
                log::debug!(
                    "auto-trimmed source {}x{} to {}x{} at ({}, {})",
                    w,
                    h,
                    region.width,
                    region.height,
                    region.x,
                    region.y
                );
                Ok(Self {
                    image: trimmed,
                    trim_offset: (region.x, region.y),
                    original_size: (w, h),
                })
            }
            None => {
                log::warn!("source {}x{} has no opaque pixels, keeping it untrimmed", w, h);
                Ok(Self {
                    image,
                    trim_offset: (0, 0),
                    original_size: (w, h),
                })
            }
        }
    }

    /// Wrap a raw RGBA buffer, checking its length against the dimensions
    pub fn from_rgba(
        rgba: Vec<u8>,
        width: u32,
        height: u32,
        threshold: u8,
        auto_trim: bool,
    ) -> Result<Self> {
        let expected = width as usize * height as usize * 4;
        if rgba.len() != expected {
            return Err(SliceError::InvalidInput(format!(
                "buffer of {} bytes does not match {}x{} RGBA ({} bytes)",
                rgba.len(),
                width,
                height,
                expected
            )));
        }
        let image = RgbaImage::from_raw(width, height, rgba)
            .ok_or_else(|| SliceError::InvalidInput("buffer size mismatch".to_string()))?;
        Self::prepare(image, threshold, auto_trim)
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    /// Top-left of the sliced image inside the originally supplied one
    pub fn trim_offset(&self) -> (u32, u32) {
        self.trim_offset
    }

    pub fn original_size(&self) -> (u32, u32) {
        self.original_size
    }
}

/// Seeds, cells and pieces of one slice
#[derive(Debug, Clone)]
pub struct Sliced {
    pub seeds: Vec<Point>,
    pub tessellation: Tessellation,
    pub pieces: Vec<Piece>,
}

/// Run the whole pipeline: sample seeds, tessellate, extract
pub fn slice_image<R: Rng + ?Sized>(
    image: &RgbaImage,
    count: usize,
    config: &SliceConfig,
    rng: &mut R,
) -> Sliced {
    let (w, h) = image.dimensions();
    let seeds = config.sampling.seeds(rng, image, count, config.alpha_threshold);
    let tessellation = Tessellation::build(&seeds, Rect::from_size(w, h));
    let pieces = extract(image, &tessellation, &config.extract_config());
    log::debug!("sliced {}x{} into {} of {} requested pieces", w, h, pieces.len(), count);
    Sliced {
        seeds,
        tessellation,
        pieces,
    }
}

/// Identifies one slice request
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SliceTicket(pub u64);

/// A finished slice tagged with the request that produced it
#[derive(Debug, Clone)]
pub struct SliceResult {
    pub ticket: SliceTicket,
    pub count: usize,
    pub seed: u64,
    pub sliced: Sliced,
}

/// Holds a prepared source and hands out slices. Only results from the most
/// recent ticket are accepted.
#[derive(Debug, Clone)]
pub struct Session {
    source: Source,
    config: SliceConfig,
    generation: u64,
}

impl Session {
    pub fn new(source: Source, config: SliceConfig) -> Self {
        Self {
            source,
            config,
            generation: 0,
        }
    }

    pub fn source(&self) -> &Source {
        &self.source
    }

    pub fn config(&self) -> &SliceConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: SliceConfig) {
        self.config = config;
    }

    /// Start a new request, superseding every earlier ticket
    pub fn begin(&mut self) -> SliceTicket {
        self.generation += 1;
        SliceTicket(self.generation)
    }

    pub fn is_current(&self, ticket: SliceTicket) -> bool {
        ticket.0 == self.generation
    }

    /// Slice under an existing ticket. The result may be stale by the time it
    /// comes back; pass it through [`Session::accept`].
    pub fn run(&self, ticket: SliceTicket, count: usize, seed: u64) -> SliceResult {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        SliceResult {
            ticket,
            count,
            seed,
            sliced: slice_image(self.source.image(), count, &self.config, &mut rng),
        }
    }

    /// `begin` + `run`
    pub fn slice(&mut self, count: usize, seed: u64) -> SliceResult {
        let ticket = self.begin();
        self.run(ticket, count, seed)
    }

    /// Keep a result only if no newer request has started since it was issued
    pub fn accept(&self, result: SliceResult) -> Option<SliceResult> {
        if self.is_current(result.ticket) {
            Some(result)
        } else {
            log::debug!("discarding stale slice {:?} (current {})", result.ticket, self.generation);
            None
        }
    }

    pub fn frame(&self) -> Frame {
        let (w, h) = self.source.image().dimensions();
        Frame::new(w, h, self.config.pixels_per_unit)
    }

    pub fn preview(&self, result: &SliceResult) -> RgbaImage {
        let (w, h) = self.source.image().dimensions();
        let options = PreviewOptions {
            include_outline: self.config.include_outline,
            ..PreviewOptions::default()
        };
        preview::render(w, h, &result.sliced.pieces, &options)
    }

    pub fn export(&self, result: &SliceResult, naming: &Naming) -> ExportBundle {
        let (ox, oy) = self.source.trim_offset();
        export::export(&result.sliced.pieces, self.frame(), [ox, oy], naming)
    }
}
