//! Alpha queries and seed point generation.
//!
//! Every generator takes its random source explicitly so a seeded
//! `ChaCha8Rng` reproduces the same tessellation for the same inputs.

use image::RgbaImage;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::Point;

/// Minimum alpha (of 255) for a pixel to count as opaque
pub const DEFAULT_ALPHA_THRESHOLD: u8 = 8;

/// Rejection-sampling budget before falling back to the last uniform sample
pub const DEFAULT_MAX_ATTEMPTS: usize = 200;

/// Answers opacity queries against a borrowed image
#[derive(Debug, Clone, Copy)]
pub struct PixelSampler<'a> {
    image: &'a RgbaImage,
    threshold: u8,
}

impl<'a> PixelSampler<'a> {
    pub fn new(image: &'a RgbaImage, threshold: u8) -> Self {
        Self { image, threshold }
    }

    pub fn threshold(&self) -> u8 {
        self.threshold
    }

    /// True if the pixel under `(x, y)` (floored, clamped to the image) is opaque
    pub fn sample_alpha(&self, x: f64, y: f64) -> bool {
        let (w, h) = self.image.dimensions();
        if w == 0 || h == 0 {
            return false;
        }
        let px = clamp_index(x, w);
        let py = clamp_index(y, h);
        self.image.get_pixel(px, py)[3] >= self.threshold
    }

    /// Uniform point in the image rectangle that lands on an opaque pixel.
    ///
    /// After `max_attempts` misses the last sample is returned as-is, which
    /// degrades to uniform sampling on sparse or fully transparent images.
    pub fn random_opaque_point<R: Rng + ?Sized>(&self, rng: &mut R, max_attempts: usize) -> Point {
        let (w, h) = (self.image.width() as f64, self.image.height() as f64);
        let mut last = Point::new(0.0, 0.0);
        for _ in 0..max_attempts.max(1) {
            last = Point::new(rng.gen::<f64>() * w, rng.gen::<f64>() * h);
            if self.sample_alpha(last.x, last.y) {
                return last;
            }
        }
        last
    }
}

fn clamp_index(v: f64, len: u32) -> u32 {
    if v.is_nan() {
        return 0;
    }
    v.floor().max(0.0).min((len - 1) as f64) as u32
}

/// `n` points uniformly distributed over `[0, width) × [0, height)`
pub fn uniform_points<R: Rng + ?Sized>(
    rng: &mut R,
    width: u32,
    height: u32,
    n: usize,
) -> Vec<Point> {
    let (w, h) = (width as f64, height as f64);
    (0..n)
        .map(|_| Point::new(rng.gen::<f64>() * w, rng.gen::<f64>() * h))
        .collect()
}

/// `n` points biased toward opaque pixels of `image`
pub fn biased_points<R: Rng + ?Sized>(
    rng: &mut R,
    image: &RgbaImage,
    width: u32,
    height: u32,
    n: usize,
    threshold: u8,
) -> Vec<Point> {
    if image.dimensions() != (width, height) || width == 0 || height == 0 {
        log::debug!(
            "biased sampling unavailable for {}x{} (image {:?}), using uniform points",
            width,
            height,
            image.dimensions()
        );
        return uniform_points(rng, width, height, n);
    }
    let sampler = PixelSampler::new(image, threshold);
    (0..n)
        .map(|_| sampler.random_opaque_point(rng, DEFAULT_MAX_ATTEMPTS))
        .collect()
}

/// Seed placement strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sampling {
    /// Ignore pixel data
    Uniform,
    /// Prefer seeds on opaque pixels
    #[default]
    AlphaBiased,
}

impl Sampling {
    pub fn seeds<R: Rng + ?Sized>(
        self,
        rng: &mut R,
        image: &RgbaImage,
        n: usize,
        threshold: u8,
    ) -> Vec<Point> {
        let (w, h) = image.dimensions();
        match self {
            Sampling::Uniform => uniform_points(rng, w, h, n),
            Sampling::AlphaBiased => biased_points(rng, image, w, h, n, threshold),
        }
    }
}
