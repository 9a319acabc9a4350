//! houghlab — Hough-transform line and circle detection.
//!
//! Two independent detectors share the accumulator-voting core:
//!
//! 1. **Lines** – probabilistic Hough transform over a binary [`EdgeMap`],
//!    returning pixel-space [`LineSegment`]s with gap merging.
//! 2. **Circles** – gradient-based Hough transform over a smoothed grayscale
//!    image, returning [`Circle`] centers and radii.
//!
//! Edge maps come from [`EdgeMap::canny`] or any external mask; smoothing
//! for the circle detector is provided by [`gaussian_blur`].
//!
//! Detectors validate their config once in `new` and are pure functions of
//! their input afterwards: results are deterministic and inputs are never
//! mutated. Long runs can be aborted through a [`CancelToken`].
//!
//! # Example
//!
//! ```no_run
//! use houghlab::{EdgeConfig, EdgeMap, LineDetectConfig, LineDetector};
//!
//! let gray = image::open("road.png").unwrap().to_luma8();
//! let edges = EdgeMap::canny(&gray, &EdgeConfig::default()).unwrap();
//! let detector = LineDetector::new(LineDetectConfig::default()).unwrap();
//! for seg in detector.detect(&edges) {
//!     println!("({}, {}) -> ({}, {})", seg.x1, seg.y1, seg.x2, seg.y2);
//! }
//! ```

pub mod accumulator;
mod cancel;
mod circles;
mod edge_map;
mod error;
mod lines;
mod smooth;

#[cfg(test)]
mod test_utils;

pub use cancel::CancelToken;
pub use circles::{detect_circles, Circle, CircleDetectConfig, CircleDetector, CANNY_LOW_RATIO};
pub use edge_map::{EdgeConfig, EdgeMap, EDGE};
pub use error::{HoughError, Result};
pub use lines::{detect_lines, LineDetectConfig, LineDetector, LineSegment};
pub use smooth::{gaussian_blur, SmoothingConfig};

/// Line detection result for a single image.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LineDetection {
    /// Image dimensions [width, height].
    pub image_size: [u32; 2],
    /// Segments in detector output order.
    pub segments: Vec<LineSegment>,
}

impl LineDetection {
    pub fn new(width: u32, height: u32, segments: Vec<LineSegment>) -> Self {
        Self {
            image_size: [width, height],
            segments,
        }
    }
}

/// Circle detection result for a single image.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CircleDetection {
    /// Image dimensions [width, height].
    pub image_size: [u32; 2],
    /// Circles, strongest first.
    pub circles: Vec<Circle>,
}

impl CircleDetection {
    pub fn new(width: u32, height: u32, circles: Vec<Circle>) -> Self {
        Self {
            image_size: [width, height],
            circles,
        }
    }
}
