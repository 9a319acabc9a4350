//! Gaussian pre-smoothing for the circle detector.
//!
//! The circle transform is sensitive to texture noise, so its input is blurred
//! first. Unlike `imageproc::filter::gaussian_blur_f32`, the kernel size here
//! is explicit (odd, `1` disables blurring) so that it can be tuned
//! independently of sigma.

use image::{GrayImage, ImageBuffer, Luma};

use crate::error::{ensure_positive, HoughError, Result};

/// Kernel size and sigma for [`gaussian_blur`].
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SmoothingConfig {
    /// Odd kernel width/height in pixels.
    pub kernel_size: u32,
    /// Gaussian standard deviation in pixels.
    pub sigma: f32,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            kernel_size: 9,
            sigma: 2.0,
        }
    }
}

impl SmoothingConfig {
    pub fn validate(&self) -> Result<()> {
        if self.kernel_size == 0 || self.kernel_size % 2 == 0 {
            return Err(HoughError::invalid(
                "smoothing.kernel_size",
                format!("must be odd and >= 1, got {}", self.kernel_size),
            ));
        }
        ensure_positive("smoothing.sigma", self.sigma)
    }

    /// Blur `gray` with this configuration.
    pub fn apply(&self, gray: &GrayImage) -> Result<GrayImage> {
        gaussian_blur(gray, self.kernel_size, self.sigma)
    }
}

/// Normalized 1D Gaussian taps of length `ksize`.
fn gaussian_taps(ksize: usize, sigma: f32) -> Vec<f32> {
    let half = (ksize / 2) as f32;
    let denom = 2.0 * sigma * sigma;
    let mut taps: Vec<f32> = (0..ksize)
        .map(|i| {
            let d = i as f32 - half;
            (-(d * d) / denom).exp()
        })
        .collect();
    let sum: f32 = taps.iter().sum();
    for t in &mut taps {
        *t /= sum;
    }
    taps
}

/// Separable Gaussian blur with replicated borders.
///
/// Filtering runs on an `f32` copy through `imageproc`; the result is rounded
/// back to `u8`. `ksize = 1` returns an unmodified copy.
pub fn gaussian_blur(gray: &GrayImage, ksize: u32, sigma: f32) -> Result<GrayImage> {
    SmoothingConfig {
        kernel_size: ksize,
        sigma,
    }
    .validate()?;

    let (w, h) = gray.dimensions();
    if ksize == 1 || w == 0 || h == 0 {
        return Ok(gray.clone());
    }

    let taps = gaussian_taps(ksize as usize, sigma);
    let f = ImageBuffer::<Luma<f32>, Vec<f32>>::from_fn(w, h, |x, y| {
        Luma([gray.get_pixel(x, y)[0] as f32])
    });
    let blurred = imageproc::filter::separable_filter_equal(&f, &taps);
    Ok(GrayImage::from_fn(w, h, |x, y| {
        Luma([blurred.get_pixel(x, y)[0].round().clamp(0.0, 255.0) as u8])
    }))
}
