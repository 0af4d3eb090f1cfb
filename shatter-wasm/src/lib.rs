//! WASM bindings for shatter-core.
//!
//! Exposes a stateful `ShatterEngine` that holds the prepared source and
//! returns flat typed arrays for efficient JS interop. Each slice is tagged
//! with a generation; a host that slices again while an older frame is still
//! being encoded should drop the older frame once `is_current` turns false.

use wasm_bindgen::prelude::*;

use shatter_core::export::{self, Naming};
use shatter_core::preview::{self, PreviewOptions};
use shatter_core::{
    ExtractionStrategy, Session, SliceConfig, SliceResult, SliceTicket, Source,
    DEFAULT_MIN_OPAQUE_RATIO,
};

#[wasm_bindgen(start)]
pub fn init_panic_hook() {
    console_error_panic_hook::set_once();
}

fn js_error(e: shatter_core::SliceError) -> JsValue {
    JsValue::from_str(&e.to_string())
}

/// Result of one slice. Piece data is addressed by position `0..piece_count`.
#[wasm_bindgen]
pub struct SliceFrame {
    result: SliceResult,
}

#[wasm_bindgen]
impl SliceFrame {
    #[wasm_bindgen(getter)]
    pub fn generation(&self) -> f64 {
        self.result.ticket.0 as f64
    }

    #[wasm_bindgen(getter)]
    pub fn piece_count(&self) -> usize {
        self.result.sliced.pieces.len()
    }

    /// Seed index of each piece
    #[wasm_bindgen(getter)]
    pub fn ids(&self) -> Vec<u32> {
        self.result.sliced.pieces.iter().map(|p| p.id as u32).collect()
    }

    /// Flat [x, y, width, height] per piece in source pixels
    #[wasm_bindgen(getter)]
    pub fn rects(&self) -> Vec<i32> {
        self.result
            .sliced
            .pieces
            .iter()
            .flat_map(|p| [p.offset.0, p.offset.1, p.width() as i32, p.height() as i32])
            .collect()
    }

    /// Raw RGBA bytes of one piece (length = width * height * 4)
    pub fn pixels(&self, index: usize) -> Option<Vec<u8>> {
        self.result.sliced.pieces.get(index).map(|p| p.image.as_raw().clone())
    }

    /// Flat [x0,y0, x1,y1, ...] cell polygon of one piece in source pixels
    pub fn polygon(&self, index: usize) -> Option<Vec<f64>> {
        self.result
            .sliced
            .pieces
            .get(index)
            .map(|p| p.cell.vertices().iter().flat_map(|v| [v.x, v.y]).collect())
    }

    /// Flat [x0,y0, x1,y1, ...] seed positions
    #[wasm_bindgen(getter)]
    pub fn seeds(&self) -> Vec<f64> {
        self.result.sliced.seeds.iter().flat_map(|p| [p.x, p.y]).collect()
    }
}

/// Stateful slicing engine.
/// Holds the source image and the generation counter that decides which
/// slice is current.
#[wasm_bindgen]
pub struct ShatterEngine {
    session: Session,
}

#[wasm_bindgen]
impl ShatterEngine {
    /// Create a new engine from RGBA pixel data.
    #[wasm_bindgen(constructor)]
    pub fn new(
        rgba_data: &[u8],
        width: u32,
        height: u32,
        threshold: u8,
        auto_trim: bool,
    ) -> Result<ShatterEngine, JsValue> {
        let source = Source::from_rgba(rgba_data.to_vec(), width, height, threshold, auto_trim)
            .map_err(js_error)?;
        let config = SliceConfig {
            alpha_threshold: threshold,
            auto_trim,
            ..SliceConfig::default()
        };
        Ok(Self {
            session: Session::new(source, config),
        })
    }

    /// Width of the (possibly trimmed) image being sliced
    #[wasm_bindgen(getter)]
    pub fn width(&self) -> u32 {
        self.session.source().image().width()
    }

    #[wasm_bindgen(getter)]
    pub fn height(&self) -> u32 {
        self.session.source().image().height()
    }

    /// Flat [x, y] of the trimmed image inside the uploaded one
    #[wasm_bindgen(getter)]
    pub fn trim_offset(&self) -> Vec<u32> {
        let (x, y) = self.session.source().trim_offset();
        vec![x, y]
    }

    /// Slice into `count` pieces. `min_ratio` is only used when `ratio_mode`
    /// is set; pass NaN for the default.
    pub fn slice(
        &mut self,
        count: usize,
        seed: u32,
        ratio_mode: bool,
        min_ratio: f64,
    ) -> SliceFrame {
        let strategy = if ratio_mode {
            let min_opaque_ratio = if min_ratio.is_finite() {
                min_ratio
            } else {
                DEFAULT_MIN_OPAQUE_RATIO
            };
            ExtractionStrategy::RatioFilter { min_opaque_ratio }
        } else {
            ExtractionStrategy::PivotCentered
        };
        let config = SliceConfig {
            strategy,
            ..*self.session.config()
        };
        self.session.set_config(config);
        SliceFrame {
            result: self.session.slice(count, seed as u64),
        }
    }

    /// False once a newer slice has been started
    pub fn is_current(&self, generation: f64) -> bool {
        self.session.is_current(SliceTicket(generation as u64))
    }

    /// Reassembled RGBA preview, ready for `new ImageData(data, width, height)`
    pub fn preview(&self, frame: &SliceFrame, include_outline: bool) -> js_sys::Uint8ClampedArray {
        let options = PreviewOptions {
            include_outline,
            ..PreviewOptions::default()
        };
        let (w, h) = self.session.source().image().dimensions();
        let surface = preview::render(w, h, &frame.result.sliced.pieces, &options);
        js_sys::Uint8ClampedArray::from(surface.as_raw().as_slice())
    }

    /// PNG bytes of one piece
    pub fn encode_piece(&self, frame: &SliceFrame, index: usize) -> Result<Vec<u8>, JsValue> {
        let piece = frame
            .result
            .sliced
            .pieces
            .get(index)
            .ok_or_else(|| JsValue::from_str(&format!("no piece at index {}", index)))?;
        export::encode_png(piece).map_err(js_error)
    }

    /// File name the exporter would give the piece at `index`
    pub fn file_name(&self, frame: &SliceFrame, index: usize) -> Option<String> {
        frame
            .result
            .sliced
            .pieces
            .get(index)
            .map(|p| Naming::default().file_name(p.id))
    }
}
