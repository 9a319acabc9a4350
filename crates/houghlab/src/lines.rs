//! Probabilistic Hough line transform.
//!
//! Every edge pixel votes for each quantized angle `θ ∈ [0, π)` into the cell
//! `(θ, ρ)` with `ρ = x·cosθ + y·sinθ`. Cells reaching `vote_threshold` are
//! then verified in pixel space: the line of the cell is walked along its
//! major axis, and edge pixels that voted for that very cell are grouped into
//! runs, bridging gaps of up to `max_line_gap` steps. Runs of at least
//! `min_line_length` pixels become [`LineSegment`]s.
//!
//! Cells are processed independently, so one physical line typically shows up
//! in several neighbouring cells and is reported as several overlapping
//! segments. Callers that need unique lines must merge them.
//!
//! Output order: candidate cells in row-major accumulator order (θ ascending,
//! then ρ ascending), and runs in walk order within a cell. Each segment runs
//! from its lower to its higher major-axis coordinate.

use std::f32::consts::PI;

use crate::accumulator::{Accumulator, MAX_CELLS};
use crate::cancel::CancelToken;
use crate::edge_map::EdgeMap;
use crate::error::{ensure_positive, HoughError, Result};

/// Edge points handled between cancellation checks.
const VOTE_CHUNK: usize = 1024;
/// Candidate cells walked between cancellation checks.
const WALK_CHUNK: usize = 64;
/// Finest accepted angle quantization, in bins over `[0, π)`.
const MAX_THETA_BINS: usize = 1 << 16;

/// Parameters of the probabilistic line transform.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct LineDetectConfig {
    /// Distance resolution of the accumulator in pixels.
    pub rho_resolution: f32,
    /// Angle resolution of the accumulator in radians.
    pub theta_resolution: f32,
    /// Minimum votes for a cell to be verified.
    pub vote_threshold: u32,
    /// Minimum Euclidean length of a reported segment in pixels.
    pub min_line_length: u32,
    /// Maximum number of missed steps bridged inside one segment.
    pub max_line_gap: u32,
}

impl Default for LineDetectConfig {
    fn default() -> Self {
        Self {
            rho_resolution: 1.0,
            theta_resolution: PI / 180.0,
            vote_threshold: 50,
            min_line_length: 50,
            max_line_gap: 10,
        }
    }
}

impl LineDetectConfig {
    pub fn validate(&self) -> Result<()> {
        ensure_positive("lines.rho_resolution", self.rho_resolution)?;
        ensure_positive("lines.theta_resolution", self.theta_resolution)?;
        if self.theta_resolution > PI {
            return Err(HoughError::invalid(
                "lines.theta_resolution",
                format!("must be <= pi, got {}", self.theta_resolution),
            ));
        }
        if PI / self.theta_resolution > MAX_THETA_BINS as f32 {
            return Err(HoughError::invalid(
                "lines.theta_resolution",
                format!(
                    "too fine, more than {MAX_THETA_BINS} angle bins (got {})",
                    self.theta_resolution
                ),
            ));
        }
        if self.vote_threshold == 0 {
            return Err(HoughError::invalid("lines.vote_threshold", "must be >= 1"));
        }
        Ok(())
    }
}

/// Line segment between two edge pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct LineSegment {
    pub x1: u32,
    pub y1: u32,
    pub x2: u32,
    pub y2: u32,
}

impl LineSegment {
    pub fn new(x1: u32, y1: u32, x2: u32, y2: u32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn length(&self) -> f32 {
        let dx = self.x2 as f32 - self.x1 as f32;
        let dy = self.y2 as f32 - self.y1 as f32;
        (dx * dx + dy * dy).sqrt()
    }

    /// Undirected orientation in `[0, π)`; zero for a single-pixel segment.
    pub fn angle(&self) -> f32 {
        let dx = self.x2 as f32 - self.x1 as f32;
        let dy = self.y2 as f32 - self.y1 as f32;
        let a = dy.atan2(dx).rem_euclid(PI);
        if a >= PI {
            0.0
        } else {
            a
        }
    }
}

/// Number of angle bins covering `[0, π)` at resolution `theta_res`.
///
/// The last bin is dropped when it would sit within half a step of π, which
/// describes the same lines as `θ = 0`.
fn theta_bins(theta_res: f32) -> usize {
    let mut n = ((PI / theta_res).round() as usize).max(1);
    if n > 1 && (PI - (n - 1) as f32 * theta_res).abs() < theta_res * 0.5 {
        n -= 1;
    }
    n
}

/// Quantization of the `(θ, ρ)` plane for one image size.
struct HoughSpace {
    cos: Vec<f32>,
    sin: Vec<f32>,
    rho_res: f32,
    /// Shift making every `ρ` non-negative: the image diagonal.
    rho_offset: f32,
    num_rho: usize,
}

impl HoughSpace {
    /// Fails when the grid for this image would exceed [`MAX_CELLS`].
    fn new(width: u32, height: u32, config: &LineDetectConfig) -> Result<Self> {
        let num_theta = theta_bins(config.theta_resolution);
        let diag = ((width as f32).powi(2) + (height as f32).powi(2)).sqrt();
        let rho_bins = (2.0 * diag / config.rho_resolution).ceil();
        let num_rho = if rho_bins < MAX_CELLS as f32 {
            rho_bins as usize + 1
        } else {
            usize::MAX
        };
        if num_theta
            .checked_mul(num_rho)
            .map_or(true, |cells| cells > MAX_CELLS)
        {
            return Err(HoughError::invalid(
                "lines.rho_resolution",
                format!(
                    "{num_theta} x {rho_bins} accumulator for a {width}x{height} image \
                     exceeds {MAX_CELLS} cells"
                ),
            ));
        }

        let (sin, cos): (Vec<f32>, Vec<f32>) = (0..num_theta)
            .map(|t| (t as f32 * config.theta_resolution).sin_cos())
            .unzip();
        Ok(Self {
            cos,
            sin,
            rho_res: config.rho_resolution,
            rho_offset: diag,
            num_rho,
        })
    }

    fn num_theta(&self) -> usize {
        self.cos.len()
    }

    /// `ρ` bin of pixel `(x, y)` at angle bin `t`. Voting and verification
    /// both go through here so they agree bit-for-bit.
    #[inline]
    fn rho_bin(&self, x: u32, y: u32, t: usize) -> Option<usize> {
        let rho = x as f32 * self.cos[t] + y as f32 * self.sin[t];
        let bin = ((rho + self.rho_offset) / self.rho_res).floor();
        (bin >= 0.0 && (bin as usize) < self.num_rho).then_some(bin as usize)
    }

    fn vote_points(&self, acc: &mut Accumulator, points: &[(u32, u32)]) {
        for &(x, y) in points {
            for t in 0..self.num_theta() {
                if let Some(r) = self.rho_bin(x, y, t) {
                    acc.vote(t, r);
                }
            }
        }
    }

    #[cfg(not(feature = "parallel"))]
    fn vote(&self, points: &[(u32, u32)], cancel: &CancelToken) -> Result<Accumulator> {
        let mut acc = Accumulator::new(self.num_theta(), self.num_rho);
        for chunk in points.chunks(VOTE_CHUNK) {
            cancel.check()?;
            self.vote_points(&mut acc, chunk);
        }
        Ok(acc)
    }

    #[cfg(feature = "parallel")]
    fn vote(&self, points: &[(u32, u32)], cancel: &CancelToken) -> Result<Accumulator> {
        use rayon::prelude::*;

        let (rows, cols) = (self.num_theta(), self.num_rho);
        let acc = points
            .par_chunks(VOTE_CHUNK)
            .fold(
                || Accumulator::new(rows, cols),
                |mut acc, chunk| {
                    if !cancel.is_cancelled() {
                        self.vote_points(&mut acc, chunk);
                    }
                    acc
                },
            )
            .reduce(
                || Accumulator::new(rows, cols),
                |mut a, b| {
                    a.merge(&b);
                    a
                },
            );
        cancel.check()?;
        Ok(acc)
    }
}

/// Contiguous group of hits along a walked line.
struct Run {
    first: (u32, u32),
    last: (u32, u32),
    last_step: usize,
}

impl Run {
    fn length(&self) -> f32 {
        LineSegment::new(self.first.0, self.first.1, self.last.0, self.last.1).length()
    }
}

/// Probabilistic Hough line detector. Validates its config on construction.
#[derive(Debug, Clone)]
pub struct LineDetector {
    config: LineDetectConfig,
}

impl LineDetector {
    pub fn new(config: LineDetectConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &LineDetectConfig {
        &self.config
    }

    /// Detect line segments in `edges`.
    ///
    /// An accumulator too large for the image is logged and yields no
    /// segments; use [`detect_cancellable`](Self::detect_cancellable) or
    /// [`detect_lines`] to get the error instead.
    pub fn detect(&self, edges: &EdgeMap) -> Vec<LineSegment> {
        match self.detect_cancellable(edges, &CancelToken::new()) {
            Ok(segments) => segments,
            Err(err) => {
                tracing::warn!("line detection skipped: {err}");
                Vec::new()
            }
        }
    }

    /// Detect line segments, stopping with [`HoughError::Cancelled`] once
    /// `cancel` is triggered.
    pub fn detect_cancellable(
        &self,
        edges: &EdgeMap,
        cancel: &CancelToken,
    ) -> Result<Vec<LineSegment>> {
        let points = edges.edge_points();
        if points.is_empty() {
            tracing::debug!("no edge pixels, skipping line voting");
            return Ok(Vec::new());
        }

        let space = HoughSpace::new(edges.width(), edges.height(), &self.config)?;
        let acc = space.vote(&points, cancel)?;
        cancel.check()?;

        let candidates: Vec<_> = acc.cells_at_least(self.config.vote_threshold).collect();
        tracing::debug!(
            "line accumulator {}x{} (theta x rho), {} edge pixels, {} candidate cells",
            acc.rows(),
            acc.cols(),
            points.len(),
            candidates.len()
        );

        let mut segments = Vec::new();
        for (i, peak) in candidates.iter().enumerate() {
            if i % WALK_CHUNK == 0 {
                cancel.check()?;
            }
            let (t, r) = acc.coords(peak.index);
            self.walk_cell(edges, &space, t, r, &mut segments);
        }

        tracing::info!("{} line segments detected", segments.len());
        Ok(segments)
    }

    /// Walk the line of cell `(t, r)` and push the runs that pass the length test.
    fn walk_cell(
        &self,
        edges: &EdgeMap,
        space: &HoughSpace,
        t: usize,
        r: usize,
        out: &mut Vec<LineSegment>,
    ) {
        let (cos, sin) = (space.cos[t], space.sin[t]);
        let rho_lo = r as f32 * space.rho_res - space.rho_offset;
        let rho_hi = rho_lo + space.rho_res;

        // Step along x for near-horizontal lines, along y otherwise; the minor
        // coefficient then has magnitude >= sqrt(1/2).
        let horizontal = sin.abs() >= cos.abs();
        let (major_len, minor_len, c_major, c_minor) = if horizontal {
            (edges.width(), edges.height(), cos, sin)
        } else {
            (edges.height(), edges.width(), sin, cos)
        };
        let to_xy = |major: u32, minor: u32| {
            if horizontal {
                (major, minor)
            } else {
                (minor, major)
            }
        };

        let max_gap = self.config.max_line_gap as usize;
        let min_len = self.config.min_line_length as f32;
        let mut run: Option<Run> = None;

        for m in 0..major_len {
            let a = (rho_lo - m as f32 * c_major) / c_minor;
            let b = (rho_hi - m as f32 * c_major) / c_minor;
            let lo = (a.min(b).floor() as i64 - 1).max(0);
            let hi = (a.max(b).ceil() as i64 + 1).min(minor_len as i64 - 1);

            let hit = (lo..=hi).map(|n| to_xy(m, n as u32)).find(|&(x, y)| {
                edges.is_edge(x, y) && space.rho_bin(x, y, t) == Some(r)
            });
            let Some(p) = hit else {
                continue;
            };

            let step = m as usize;
            run = match run.take() {
                Some(mut cur) if step - cur.last_step - 1 <= max_gap => {
                    cur.last = p;
                    cur.last_step = step;
                    Some(cur)
                }
                Some(done) => {
                    flush_run(done, min_len, out);
                    Some(Run {
                        first: p,
                        last: p,
                        last_step: step,
                    })
                }
                None => Some(Run {
                    first: p,
                    last: p,
                    last_step: step,
                }),
            };
        }
        if let Some(done) = run {
            flush_run(done, min_len, out);
        }
    }
}

fn flush_run(run: Run, min_len: f32, out: &mut Vec<LineSegment>) {
    if run.length() >= min_len {
        out.push(LineSegment::new(
            run.first.0,
            run.first.1,
            run.last.0,
            run.last.1,
        ));
    }
}

/// One-shot helper: validate `config` and detect segments in `edges`.
pub fn detect_lines(edges: &EdgeMap, config: &LineDetectConfig) -> Result<Vec<LineSegment>> {
    LineDetector::new(*config)?.detect_cancellable(edges, &CancelToken::new())
}
