//! Image preprocessing: turn a rendered page into an OCR-friendly raster.
//!
//! Steps run in a fixed order:
//!
//! 1. grayscale
//! 2. contrast enhancement around the page mean, then binarization
//! 3. optional upscale so the shorter edge reaches `min_dimension`
//!
//! Every step is a pure function of its input, so the same page always yields
//! the same raster and reruns write byte-identical text.

use crate::config::{Binarization, ExtractionConfig};
use crate::error::PreprocessError;
use crate::pipeline::render::PageImage;
use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage, Luma};
use tracing::debug;

/// Longest edge an upscaled page may reach.
const MAX_UPSCALED_EDGE: u32 = 12_000;

/// A page ready for OCR.
#[derive(Debug, Clone)]
pub struct PreprocessedImage {
    pub page_num: usize,
    pub image: GrayImage,
}

/// Deterministic transform chain built from [`ExtractionConfig`].
#[derive(Debug, Clone)]
pub struct Preprocessor {
    contrast: f32,
    binarization: Binarization,
    min_dimension: u32,
}

impl Preprocessor {
    pub fn new(contrast: f32, binarization: Binarization, min_dimension: u32) -> Self {
        Self {
            contrast,
            binarization,
            min_dimension,
        }
    }

    pub fn from_config(config: &ExtractionConfig) -> Self {
        Self::new(config.contrast, config.binarization, config.min_dimension)
    }

    /// Run the chain on one page, consuming the rendered image.
    pub fn process(&self, page: PageImage) -> Result<PreprocessedImage, PreprocessError> {
        let (width, height) = (page.image.width(), page.image.height());
        if width == 0 || height == 0 {
            return Err(PreprocessError::EmptyImage { width, height });
        }

        let gray = grayscale(page.image);
        let gray = enhance_contrast(gray, self.contrast);
        let gray = binarize(gray, self.binarization);
        let gray = upscale(gray, self.min_dimension, self.binarization != Binarization::Off)?;

        debug!(
            "Preprocessed page {} → {}x{} px",
            page.page_num,
            gray.width(),
            gray.height()
        );

        Ok(PreprocessedImage {
            page_num: page.page_num,
            image: gray,
        })
    }
}

/// ITU-R 601-2 luma in 16-bit fixed point, rounded. `to_luma8` would use
/// Rec. 709 weights, which move saturated greens and reds across the
/// threshold.
fn grayscale(image: DynamicImage) -> GrayImage {
    let rgb = match image {
        DynamicImage::ImageLuma8(gray) => return gray,
        other => other.to_rgb8(),
    };
    let (width, height) = rgb.dimensions();
    GrayImage::from_fn(width, height, |x, y| {
        let [r, g, b] = rgb.get_pixel(x, y).0;
        let luma = (r as u32 * 19_595 + g as u32 * 38_470 + b as u32 * 7_471 + 0x8000) >> 16;
        Luma([luma as u8])
    })
}

/// Blend every pixel away from (factor > 1) or toward (factor < 1) the
/// rounded mean intensity of the page.
fn enhance_contrast(mut gray: GrayImage, factor: f32) -> GrayImage {
    if (factor - 1.0).abs() < f32::EPSILON {
        return gray;
    }

    let count = (gray.width() as u64) * (gray.height() as u64);
    let sum: u64 = gray.pixels().map(|p| p.0[0] as u64).sum();
    let mean = (sum as f64 / count as f64 + 0.5).floor() as f32;

    for p in gray.pixels_mut() {
        let v = mean + factor * (p.0[0] as f32 - mean);
        // Truncation after clamping matches the usual 8-bit blend.
        p.0[0] = v.clamp(0.0, 255.0) as u8;
    }
    gray
}

fn binarize(gray: GrayImage, mode: Binarization) -> GrayImage {
    let level = match mode {
        Binarization::Off => return gray,
        Binarization::Fixed(level) => level,
        Binarization::Otsu => imageproc::contrast::otsu_level(&gray),
    };
    threshold(gray, level)
}

/// Pixels strictly brighter than `level` become white, everything else black.
fn threshold(mut gray: GrayImage, level: u8) -> GrayImage {
    for p in gray.pixels_mut() {
        *p = if p.0[0] > level { Luma([255]) } else { Luma([0]) };
    }
    gray
}

fn upscale(gray: GrayImage, min_dimension: u32, two_tone: bool) -> Result<GrayImage, PreprocessError> {
    let (w, h) = gray.dimensions();
    let shorter = w.min(h);
    if min_dimension == 0 || shorter >= min_dimension {
        return Ok(gray);
    }

    let scale = min_dimension as f64 / shorter as f64;
    let new_w = (w as f64 * scale).ceil() as u32;
    let new_h = (h as f64 * scale).ceil() as u32;
    if new_w.max(new_h) > MAX_UPSCALED_EDGE {
        return Err(PreprocessError::TooLarge {
            width: new_w,
            height: new_h,
            max: MAX_UPSCALED_EDGE,
        });
    }

    // Nearest keeps a binarized page two-tone.
    let filter = if two_tone {
        FilterType::Nearest
    } else {
        FilterType::CatmullRom
    };
    Ok(imageops::resize(&gray, new_w, new_h, filter))
}
