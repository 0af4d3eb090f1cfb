//! Alpha-aware Voronoi slicing of sprites.
//!
//! Seeds are sampled toward opaque content, a bounded Voronoi tessellation is
//! built over them, and each cell is cut out of the source as its own RGBA
//! piece, trimmed and padded so its pivot sits at the image centre. Pieces
//! carry enough placement data to be reassembled in pixel space or mapped
//! into engine coordinates.

mod config;
mod geometry;

pub mod export;
pub mod extract;
pub mod mapper;
pub mod preview;
pub mod raster;
pub mod sampler;
pub mod session;
pub mod tessellation;

pub use config::SliceConfig;
pub use extract::{extract, ExtractConfig, ExtractionStrategy, Piece, DEFAULT_MIN_OPAQUE_RATIO};
pub use geometry::{ClosedRing, PixelBox, Point, Rect};
pub use mapper::{CoordinateMapper, Frame, DEFAULT_PIXELS_PER_UNIT};
pub use sampler::{PixelSampler, Sampling, DEFAULT_ALPHA_THRESHOLD};
pub use session::{slice_image, Session, SliceResult, SliceTicket, Sliced, Source};
pub use tessellation::{Cell, Tessellation};

/// Error type for slicing operations
#[derive(Debug, thiserror::Error)]
pub enum SliceError {
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Failed to encode piece {id}: {source}")]
    Encode {
        id: usize,
        #[source]
        source: image::ImageError,
    },
}

pub type Result<T> = std::result::Result<T, SliceError>;
