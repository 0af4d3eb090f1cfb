//! Slice configuration shared by the CLI and WASM front ends.

use serde::{Deserialize, Serialize};

use crate::extract::{ExtractConfig, ExtractionStrategy};
use crate::mapper::DEFAULT_PIXELS_PER_UNIT;
use crate::sampler::{Sampling, DEFAULT_ALPHA_THRESHOLD};

/// Everything about a slice except the piece count and random seed
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SliceConfig {
    pub alpha_threshold: u8,
    pub strategy: ExtractionStrategy,
    pub sampling: Sampling,
    /// Crop the source to its opaque bounds once before slicing
    pub auto_trim: bool,
    pub include_outline: bool,
    pub pixels_per_unit: f64,
}

impl Default for SliceConfig {
    fn default() -> Self {
        Self {
            alpha_threshold: DEFAULT_ALPHA_THRESHOLD,
            strategy: ExtractionStrategy::default(),
            sampling: Sampling::default(),
            auto_trim: true,
            include_outline: false,
            pixels_per_unit: DEFAULT_PIXELS_PER_UNIT,
        }
    }
}

impl SliceConfig {
    pub fn extract_config(&self) -> ExtractConfig {
        ExtractConfig {
            alpha_threshold: self.alpha_threshold,
            strategy: self.strategy,
            include_outline: self.include_outline,
        }
    }
}
