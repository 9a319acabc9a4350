//! Parameter resolution: defaults, optional JSON file, then flag overrides.

use std::path::Path;

use houghlab::{CircleDetectConfig, EdgeConfig, LineDetectConfig, SmoothingConfig};

use crate::CliResult;

/// Every tunable of both detection modes. All sections are optional in JSON.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub edges: EdgeConfig,
    pub lines: LineDetectConfig,
    pub circles: CircleDetectConfig,
    pub smoothing: SmoothingConfig,
}

impl AppConfig {
    /// Defaults, or the JSON file at `path` when given.
    pub fn load(path: Option<&Path>) -> CliResult<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config {}: {}", path.display(), e))?;
        let config = serde_json::from_str(&text)
            .map_err(|e| format!("Failed to parse config {}: {}", path.display(), e))?;
        tracing::info!("Loaded config from {}", path.display());
        Ok(config)
    }
}

/// Flag values for the edge map; `None` keeps the configured value.
#[derive(Debug, Clone, Copy, Default)]
pub struct EdgeOverrides {
    pub low: Option<f32>,
    pub high: Option<f32>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LineOverrides {
    pub rho: Option<f32>,
    pub threshold: Option<u32>,
    pub min_line_length: Option<u32>,
    pub max_line_gap: Option<u32>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CircleOverrides {
    pub blur_ksize: Option<u32>,
    pub blur_sigma: Option<f32>,
    pub dp: Option<f32>,
    pub min_dist: Option<f32>,
    /// Upper Canny threshold of the circle transform.
    pub param1: Option<f32>,
    /// Center accumulator threshold.
    pub param2: Option<u32>,
    pub min_radius: Option<u32>,
    pub max_radius: Option<u32>,
}

fn set<T>(slot: &mut T, value: Option<T>) {
    if let Some(v) = value {
        *slot = v;
    }
}

impl EdgeOverrides {
    pub fn apply(&self, cfg: &mut EdgeConfig) {
        set(&mut cfg.low, self.low);
        set(&mut cfg.high, self.high);
    }
}

impl LineOverrides {
    pub fn apply(&self, cfg: &mut LineDetectConfig) {
        set(&mut cfg.rho_resolution, self.rho);
        set(&mut cfg.vote_threshold, self.threshold);
        set(&mut cfg.min_line_length, self.min_line_length);
        set(&mut cfg.max_line_gap, self.max_line_gap);
    }
}

impl CircleOverrides {
    pub fn apply(&self, circles: &mut CircleDetectConfig, smoothing: &mut SmoothingConfig) {
        set(&mut smoothing.kernel_size, self.blur_ksize);
        set(&mut smoothing.sigma, self.blur_sigma);
        set(&mut circles.dp, self.dp);
        set(&mut circles.min_dist, self.min_dist);
        set(&mut circles.canny_high, self.param1);
        set(&mut circles.accumulator_threshold, self.param2);
        set(&mut circles.min_radius, self.min_radius);
        set(&mut circles.max_radius, self.max_radius);
    }
}
