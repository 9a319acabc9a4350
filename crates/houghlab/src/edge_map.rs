//! Binary edge maps consumed by the line detector.
//!
//! An [`EdgeMap`] is an immutable 0/255 mask with the dimensions of the source
//! image. It can wrap any externally produced mask or be built with the
//! Canny detector from `imageproc`.

use image::{GrayImage, Luma};

use crate::error::{HoughError, Result};

/// Intensity written for edge pixels.
pub const EDGE: u8 = 255;

/// Hysteresis thresholds for [`EdgeMap::canny`].
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct EdgeConfig {
    /// Lower hysteresis threshold on gradient magnitude.
    pub low: f32,
    /// Upper hysteresis threshold on gradient magnitude.
    pub high: f32,
}

impl Default for EdgeConfig {
    fn default() -> Self {
        Self {
            low: 50.0,
            high: 150.0,
        }
    }
}

impl EdgeConfig {
    pub fn validate(&self) -> Result<()> {
        for (param, value) in [("edges.low", self.low), ("edges.high", self.high)] {
            if !value.is_finite() || value < 0.0 {
                return Err(HoughError::invalid(
                    param,
                    format!("must be finite and >= 0, got {value}"),
                ));
            }
        }
        if self.low > self.high {
            return Err(HoughError::invalid(
                "edges.low",
                format!("must not exceed high ({} > {})", self.low, self.high),
            ));
        }
        Ok(())
    }
}

/// Immutable binary edge mask.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeMap {
    mask: GrayImage,
}

impl EdgeMap {
    /// Wrap a mask; any nonzero pixel is an edge. Values are normalized to 0/255.
    pub fn from_mask(mut mask: GrayImage) -> Self {
        for px in mask.iter_mut() {
            if *px != 0 {
                *px = EDGE;
            }
        }
        Self { mask }
    }

    /// Build a mask from a predicate over pixel coordinates.
    pub fn from_fn(width: u32, height: u32, mut is_edge: impl FnMut(u32, u32) -> bool) -> Self {
        let mask = GrayImage::from_fn(width, height, |x, y| {
            Luma([if is_edge(x, y) { EDGE } else { 0 }])
        });
        Self { mask }
    }

    /// All-background mask.
    pub fn empty(width: u32, height: u32) -> Self {
        Self {
            mask: GrayImage::new(width, height),
        }
    }

    /// Canny edges of `gray` with the given hysteresis thresholds.
    pub fn canny(gray: &GrayImage, config: &EdgeConfig) -> Result<Self> {
        config.validate()?;
        let mask = imageproc::edges::canny(gray, config.low, config.high);
        tracing::debug!(
            "canny low={:.1} high={:.1} on {}x{}",
            config.low,
            config.high,
            gray.width(),
            gray.height()
        );
        Ok(Self::from_mask(mask))
    }

    pub fn width(&self) -> u32 {
        self.mask.width()
    }

    pub fn height(&self) -> u32 {
        self.mask.height()
    }

    #[inline]
    pub fn is_edge(&self, x: u32, y: u32) -> bool {
        self.mask.get_pixel(x, y)[0] != 0
    }

    pub fn edge_count(&self) -> usize {
        self.mask.as_raw().iter().filter(|&&v| v != 0).count()
    }

    /// Edge pixel coordinates in row-major order.
    pub fn edge_points(&self) -> Vec<(u32, u32)> {
        let w = self.width() as usize;
        self.mask
            .as_raw()
            .iter()
            .enumerate()
            .filter(|(_, &v)| v != 0)
            .map(|(i, _)| ((i % w) as u32, (i / w) as u32))
            .collect()
    }

    /// Borrow the underlying 0/255 image, e.g. for saving.
    pub fn as_image(&self) -> &GrayImage {
        &self.mask
    }
}
