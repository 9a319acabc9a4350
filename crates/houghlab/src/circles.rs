//! Gradient-based Hough circle transform.
//!
//! Instead of a full `(cx, cy, r)` accumulator, every edge pixel votes along
//! its gradient normal, in both directions, into a 2D center grid downscaled
//! by `dp`. Centers are local maxima of that grid, suppressed greedily by
//! `min_dist`. The radius of each accepted center is the mode of the distances
//! of the votes that landed in its cell.
//!
//! Ordering and tie-breaks are fixed, so results are reproducible:
//! - peaks are visited strongest first, equal votes by row-major cell index;
//! - on an accumulator plateau the lowest row-major cell wins;
//! - equal radius histogram bins resolve to the smaller radius.

use std::collections::HashMap;

use image::GrayImage;

use crate::accumulator::{sort_strongest_first, Accumulator};
use crate::cancel::CancelToken;
use crate::error::{ensure_positive, HoughError, Result};

/// Ratio of the internal Canny low threshold to `canny_high`.
pub const CANNY_LOW_RATIO: f32 = 0.5;

/// Edge pixels processed between cancellation checks.
const NORMAL_CHUNK: usize = 512;

/// Parameters of the circle transform.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct CircleDetectConfig {
    /// Inverse accumulator resolution: `1` is full resolution, `2` half.
    pub dp: f32,
    /// Minimum distance between reported centers in pixels.
    pub min_dist: f32,
    /// Upper Canny threshold of the internal edge pass.
    pub canny_high: f32,
    /// Center votes required for a peak (strictly more than this).
    pub accumulator_threshold: u32,
    pub min_radius: u32,
    /// `0` derives the limit from the image size.
    pub max_radius: u32,
}

impl Default for CircleDetectConfig {
    fn default() -> Self {
        Self {
            dp: 1.2,
            min_dist: 50.0,
            canny_high: 50.0,
            accumulator_threshold: 30,
            min_radius: 0,
            max_radius: 0,
        }
    }
}

impl CircleDetectConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.dp.is_finite() || self.dp < 1.0 {
            return Err(HoughError::invalid(
                "circles.dp",
                format!("must be finite and >= 1, got {}", self.dp),
            ));
        }
        ensure_positive("circles.min_dist", self.min_dist)?;
        ensure_positive("circles.canny_high", self.canny_high)?;
        if self.accumulator_threshold == 0 {
            return Err(HoughError::invalid(
                "circles.accumulator_threshold",
                "must be >= 1",
            ));
        }
        if self.max_radius != 0 && self.min_radius > self.max_radius {
            return Err(HoughError::invalid(
                "circles.min_radius",
                format!(
                    "must not exceed max_radius ({} > {})",
                    self.min_radius, self.max_radius
                ),
            ));
        }
        Ok(())
    }

    /// Largest voted radius for an image of the given size.
    pub fn effective_max_radius(&self, width: u32, height: u32) -> u32 {
        if self.max_radius == 0 {
            width.max(height)
        } else {
            self.max_radius
        }
    }
}

/// Detected circle in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Circle {
    pub cx: u32,
    pub cy: u32,
    pub radius: u32,
    /// Votes of the center cell.
    pub votes: u32,
}

/// Edge pixel center and unit gradient.
#[derive(Debug, Clone, Copy)]
struct Normal {
    x: f32,
    y: f32,
    ux: f32,
    uy: f32,
}

/// Geometry of the center grid for one image.
struct VoteGrid {
    width: u32,
    height: u32,
    rows: usize,
    cols: usize,
    dp: f32,
    r_min: u32,
    r_max: u32,
}

impl VoteGrid {
    fn new(width: u32, height: u32, config: &CircleDetectConfig) -> Self {
        let r_min = config.min_radius.max(1);
        // Rays leave the image before passing the diagonal.
        let diag = (width as f64).hypot(height as f64).ceil() as u32;
        let r_max = config
            .effective_max_radius(width, height)
            .min(diag.saturating_add(1))
            .max(r_min);
        Self {
            width,
            height,
            rows: (height as f32 / config.dp).ceil() as usize,
            cols: (width as f32 / config.dp).ceil() as usize,
            dp: config.dp,
            r_min,
            r_max,
        }
    }

    /// Call `visit(cell, r)` for every vote of `n`. Each ray ends at its
    /// first position outside the image.
    #[inline]
    fn cast(&self, n: &Normal, mut visit: impl FnMut(usize, u32)) {
        let (w, h) = (self.width as f32, self.height as f32);
        for s in [1.0f32, -1.0] {
            for r in self.r_min..=self.r_max {
                let d = s * r as f32;
                let px = n.x + d * n.ux;
                let py = n.y + d * n.uy;
                if px < 0.0 || py < 0.0 || px >= w || py >= h {
                    break;
                }
                let col = ((px / self.dp) as usize).min(self.cols - 1);
                let row = ((py / self.dp) as usize).min(self.rows - 1);
                visit(row * self.cols + col, r);
            }
        }
    }

    /// Pixel at the center of cell `(row, col)`, clamped into the image.
    fn center_pixel(&self, row: usize, col: usize) -> (u32, u32) {
        let to_px = |c: usize, limit: u32| (((c as f32 + 0.5) * self.dp) as u32).min(limit - 1);
        (to_px(col, self.width), to_px(row, self.height))
    }

    fn vote_normals(&self, acc: &mut Accumulator, normals: &[Normal]) {
        for n in normals {
            self.cast(n, |cell, _| acc.vote_index(cell));
        }
    }

    #[cfg(not(feature = "parallel"))]
    fn vote(&self, normals: &[Normal], cancel: &CancelToken) -> Result<Accumulator> {
        let mut acc = Accumulator::new(self.rows, self.cols);
        for chunk in normals.chunks(NORMAL_CHUNK) {
            cancel.check()?;
            self.vote_normals(&mut acc, chunk);
        }
        Ok(acc)
    }

    #[cfg(feature = "parallel")]
    fn vote(&self, normals: &[Normal], cancel: &CancelToken) -> Result<Accumulator> {
        use rayon::prelude::*;

        let acc = normals
            .par_chunks(NORMAL_CHUNK)
            .fold(
                || Accumulator::new(self.rows, self.cols),
                |mut acc, chunk| {
                    if !cancel.is_cancelled() {
                        self.vote_normals(&mut acc, chunk);
                    }
                    acc
                },
            )
            .reduce(
                || Accumulator::new(self.rows, self.cols),
                |mut a, b| {
                    a.merge(&b);
                    a
                },
            );
        cancel.check()?;
        Ok(acc)
    }
}

/// Canny edge pixels with a nonzero Sobel gradient, in row-major order.
fn edge_normals(gray: &GrayImage, canny_high: f32) -> Vec<Normal> {
    let edges = imageproc::edges::canny(gray, canny_high * CANNY_LOW_RATIO, canny_high);
    let gx = imageproc::gradients::horizontal_sobel(gray);
    let gy = imageproc::gradients::vertical_sobel(gray);
    let w = gray.width() as usize;

    edges
        .as_raw()
        .iter()
        .zip(gx.as_raw().iter().zip(gy.as_raw().iter()))
        .enumerate()
        .filter_map(|(i, (&e, (&gxv, &gyv)))| {
            if e == 0 || (gxv == 0 && gyv == 0) {
                return None;
            }
            let (gxv, gyv) = (gxv as f32, gyv as f32);
            let inv_mag = 1.0 / (gxv * gxv + gyv * gyv).sqrt();
            Some(Normal {
                x: (i % w) as f32 + 0.5,
                y: (i / w) as f32 + 0.5,
                ux: gxv * inv_mag,
                uy: gyv * inv_mag,
            })
        })
        .collect()
}

/// Index of the largest bin; the first one wins on ties.
fn mode_bin(hist: &[u32]) -> usize {
    let mut best = 0;
    for (i, &v) in hist.iter().enumerate() {
        if v > hist[best] {
            best = i;
        }
    }
    best
}

/// Accepted center awaiting its radius.
struct Center {
    cell: usize,
    cx: u32,
    cy: u32,
    votes: u32,
}

/// Gradient-based Hough circle detector. Validates its config on construction.
#[derive(Debug, Clone)]
pub struct CircleDetector {
    config: CircleDetectConfig,
}

impl CircleDetector {
    pub fn new(config: CircleDetectConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &CircleDetectConfig {
        &self.config
    }

    /// Detect circles in a (typically pre-smoothed) grayscale image.
    pub fn detect(&self, gray: &GrayImage) -> Vec<Circle> {
        // A fresh token is never cancelled, so the only error path is unreachable.
        self.detect_cancellable(gray, &CancelToken::new())
            .unwrap_or_default()
    }

    /// Like [`detect`](Self::detect), returning [`HoughError::Cancelled`] once
    /// `cancel` is triggered.
    pub fn detect_cancellable(&self, gray: &GrayImage, cancel: &CancelToken) -> Result<Vec<Circle>> {
        let (w, h) = gray.dimensions();
        if w < 3 || h < 3 {
            return Ok(Vec::new());
        }

        let normals = edge_normals(gray, self.config.canny_high);
        if normals.is_empty() {
            tracing::debug!("no oriented edge pixels, skipping circle voting");
            return Ok(Vec::new());
        }

        let grid = VoteGrid::new(w, h, &self.config);
        tracing::debug!(
            "circle accumulator {}x{} (dp={:.2}), {} edge pixels, radii {}..={}",
            grid.cols,
            grid.rows,
            grid.dp,
            normals.len(),
            grid.r_min,
            grid.r_max
        );
        let acc = grid.vote(&normals, cancel)?;
        cancel.check()?;

        let mut peaks = acc.local_maxima(self.config.accumulator_threshold);
        sort_strongest_first(&mut peaks);
        cancel.check()?;

        let min_dist_sq = self.config.min_dist * self.config.min_dist;
        let mut centers: Vec<Center> = Vec::new();
        for peak in &peaks {
            let (row, col) = acc.coords(peak.index);
            let (cx, cy) = grid.center_pixel(row, col);
            let far_enough = centers.iter().all(|c| {
                let dx = c.cx as f32 - cx as f32;
                let dy = c.cy as f32 - cy as f32;
                dx * dx + dy * dy >= min_dist_sq
            });
            if far_enough {
                centers.push(Center {
                    cell: peak.index,
                    cx,
                    cy,
                    votes: peak.votes,
                });
            }
        }
        tracing::debug!(
            "{} center peaks, {} kept after min_dist suppression",
            peaks.len(),
            centers.len()
        );
        drop(acc);

        let radii = self.estimate_radii(&grid, &normals, &centers, cancel)?;
        let circles: Vec<Circle> = centers
            .iter()
            .zip(radii)
            .map(|(c, radius)| Circle {
                cx: c.cx,
                cy: c.cy,
                radius,
                votes: c.votes,
            })
            .collect();

        tracing::info!("{} circles detected", circles.len());
        Ok(circles)
    }

    /// Replay the voting pass and take the most frequent distance per center.
    fn estimate_radii(
        &self,
        grid: &VoteGrid,
        normals: &[Normal],
        centers: &[Center],
        cancel: &CancelToken,
    ) -> Result<Vec<u32>> {
        if centers.is_empty() {
            return Ok(Vec::new());
        }
        let slot: HashMap<usize, usize> = centers
            .iter()
            .enumerate()
            .map(|(k, c)| (c.cell, k))
            .collect();
        let bins = (grid.r_max - grid.r_min + 1) as usize;
        let mut hists = vec![vec![0u32; bins]; centers.len()];

        for chunk in normals.chunks(NORMAL_CHUNK) {
            cancel.check()?;
            for n in chunk {
                grid.cast(n, |cell, r| {
                    if let Some(&k) = slot.get(&cell) {
                        hists[k][(r - grid.r_min) as usize] += 1;
                    }
                });
            }
        }

        Ok(hists
            .iter()
            .map(|hist| grid.r_min + mode_bin(hist) as u32)
            .collect())
    }
}

/// One-shot helper: validate `config` and detect circles in `gray`.
pub fn detect_circles(gray: &GrayImage, config: &CircleDetectConfig) -> Result<Vec<Circle>> {
    Ok(CircleDetector::new(*config)?.detect(gray))
}
