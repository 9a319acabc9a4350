//! houghlab CLI — detect straight lines or circles and render an overlay.

mod config;
mod overlay;

use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};

use houghlab::{CircleDetection, CircleDetector, EdgeMap, LineDetection, LineDetector};

use config::{AppConfig, CircleOverrides, EdgeOverrides, LineOverrides};

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "houghlab")]
#[command(about = "Detect straight lines or circles with the Hough transform")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect line segments (probabilistic Hough transform).
    Lines(CliLinesArgs),

    /// Detect circles (gradient Hough transform).
    Circles(CliCirclesArgs),
}

#[derive(Debug, Clone, Args)]
struct CliCommonArgs {
    /// Path to the input image.
    #[arg(long)]
    image: PathBuf,

    /// Path to write the overlay image; format follows the extension.
    #[arg(long, default_value = "hasil_hough.jpg")]
    out: PathBuf,

    /// Path to write the Canny edge map (PNG recommended).
    #[arg(long)]
    edges_out: Option<PathBuf>,

    /// Path to write detection results (JSON).
    #[arg(long)]
    json: Option<PathBuf>,

    /// JSON config with optional `edges`, `lines`, `circles`, `smoothing` sections.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Lower Canny hysteresis threshold for the edge map.
    #[arg(long)]
    canny_low: Option<f32>,

    /// Upper Canny hysteresis threshold for the edge map.
    #[arg(long)]
    canny_high: Option<f32>,
}

impl CliCommonArgs {
    fn edge_overrides(&self) -> EdgeOverrides {
        EdgeOverrides {
            low: self.canny_low,
            high: self.canny_high,
        }
    }
}

#[derive(Debug, Clone, Args)]
struct CliLinesArgs {
    #[command(flatten)]
    common: CliCommonArgs,

    /// Accumulator distance resolution in pixels.
    #[arg(long)]
    rho: Option<f32>,

    /// Minimum accumulator votes for a line candidate.
    #[arg(long)]
    threshold: Option<u32>,

    /// Minimum segment length in pixels.
    #[arg(long)]
    min_line_length: Option<u32>,

    /// Maximum gap bridged inside one segment, in pixels.
    #[arg(long)]
    max_line_gap: Option<u32>,
}

impl CliLinesArgs {
    fn to_overrides(&self) -> LineOverrides {
        LineOverrides {
            rho: self.rho,
            threshold: self.threshold,
            min_line_length: self.min_line_length,
            max_line_gap: self.max_line_gap,
        }
    }
}

#[derive(Debug, Clone, Args)]
struct CliCirclesArgs {
    #[command(flatten)]
    common: CliCommonArgs,

    /// Gaussian pre-smoothing kernel size (odd).
    #[arg(long)]
    blur_ksize: Option<u32>,

    /// Gaussian pre-smoothing sigma.
    #[arg(long)]
    blur_sigma: Option<f32>,

    /// Inverse accumulator resolution (>= 1).
    #[arg(long)]
    dp: Option<f32>,

    /// Minimum distance between circle centers in pixels.
    #[arg(long)]
    min_dist: Option<f32>,

    /// Upper Canny threshold of the circle transform.
    #[arg(long)]
    param1: Option<f32>,

    /// Center accumulator threshold.
    #[arg(long)]
    param2: Option<u32>,

    /// Minimum circle radius in pixels.
    #[arg(long)]
    min_radius: Option<u32>,

    /// Maximum circle radius in pixels (0 = image size).
    #[arg(long)]
    max_radius: Option<u32>,
}

impl CliCirclesArgs {
    fn to_overrides(&self) -> CircleOverrides {
        CircleOverrides {
            blur_ksize: self.blur_ksize,
            blur_sigma: self.blur_sigma,
            dp: self.dp,
            min_dist: self.min_dist,
            param1: self.param1,
            param2: self.param2,
            min_radius: self.min_radius,
            max_radius: self.max_radius,
        }
    }
}

fn main() -> CliResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Lines(args) => run_lines(&args),
        Commands::Circles(args) => run_circles(&args),
    }
}

/// Decoded input: the RGB canvas for overlays and the grayscale working copy.
struct LoadedImage {
    rgb: image::RgbImage,
    gray: image::GrayImage,
}

fn load_image(path: &Path) -> CliResult<LoadedImage> {
    tracing::info!("Loading image: {}", path.display());
    let img = image::open(path)
        .map_err(|e| -> CliError { format!("Failed to open image {}: {}", path.display(), e).into() })?;
    let loaded = LoadedImage {
        rgb: img.to_rgb8(),
        gray: img.to_luma8(),
    };
    let (w, h) = loaded.gray.dimensions();
    tracing::info!("Image size: {}x{}", w, h);
    Ok(loaded)
}

/// Canny edge map, written to `--edges-out` when requested.
fn edge_map(common: &CliCommonArgs, cfg: &AppConfig, gray: &image::GrayImage) -> CliResult<EdgeMap> {
    let edges = EdgeMap::canny(gray, &cfg.edges)?;
    tracing::info!("Edge map: {} edge pixels", edges.edge_count());
    if let Some(path) = &common.edges_out {
        edges
            .as_image()
            .save(path)
            .map_err(|e| -> CliError { format!("Failed to write {}: {}", path.display(), e).into() })?;
        tracing::info!("Edge map written to {}", path.display());
    }
    Ok(edges)
}

fn write_outputs<T: serde::Serialize>(
    common: &CliCommonArgs,
    canvas: &image::RgbImage,
    result: &T,
) -> CliResult<()> {
    canvas
        .save(&common.out)
        .map_err(|e| -> CliError { format!("Failed to write {}: {}", common.out.display(), e).into() })?;
    tracing::info!("Overlay written to {}", common.out.display());

    if let Some(path) = &common.json {
        let json = serde_json::to_string_pretty(result)?;
        std::fs::write(path, &json)?;
        tracing::info!("Results written to {}", path.display());
    }
    Ok(())
}

fn run_lines(args: &CliLinesArgs) -> CliResult<()> {
    let mut cfg = AppConfig::load(args.common.config.as_deref())?;
    args.common.edge_overrides().apply(&mut cfg.edges);
    args.to_overrides().apply(&mut cfg.lines);
    tracing::debug!("Resolved config: {:?}", cfg);

    let detector = LineDetector::new(cfg.lines)?;
    let LoadedImage { mut rgb, gray } = load_image(&args.common.image)?;
    let edges = edge_map(&args.common, &cfg, &gray)?;

    let segments = detector.detect(&edges);
    tracing::info!("Detected {} line segments", segments.len());

    overlay::draw_segments(&mut rgb, &segments);
    let (w, h) = gray.dimensions();
    write_outputs(&args.common, &rgb, &LineDetection::new(w, h, segments))
}

fn run_circles(args: &CliCirclesArgs) -> CliResult<()> {
    let mut cfg = AppConfig::load(args.common.config.as_deref())?;
    args.common.edge_overrides().apply(&mut cfg.edges);
    args.to_overrides().apply(&mut cfg.circles, &mut cfg.smoothing);
    tracing::debug!("Resolved config: {:?}", cfg);

    let detector = CircleDetector::new(cfg.circles)?;
    cfg.smoothing.validate()?;
    let LoadedImage { mut rgb, gray } = load_image(&args.common.image)?;
    // Reference output only; the circle transform runs its own edge pass.
    edge_map(&args.common, &cfg, &gray)?;

    let smoothed = cfg.smoothing.apply(&gray)?;
    let circles = detector.detect(&smoothed);
    tracing::info!("Detected {} circles", circles.len());

    overlay::draw_circles(&mut rgb, &circles);
    let (w, h) = gray.dimensions();
    write_outputs(&args.common, &rgb, &CircleDetection::new(w, h, circles))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn circles_flags_map_to_overrides() {
        let cli = Cli::try_parse_from([
            "houghlab",
            "circles",
            "--image",
            "in.png",
            "--param1",
            "80",
            "--param2",
            "25",
            "--blur-ksize",
            "7",
        ])
        .unwrap();
        let Commands::Circles(args) = cli.command else {
            panic!("expected circles subcommand");
        };
        assert_eq!(args.common.out, PathBuf::from("hasil_hough.jpg"));
        let mut cfg = AppConfig::default();
        args.to_overrides()
            .apply(&mut cfg.circles, &mut cfg.smoothing);
        assert_eq!(cfg.circles.canny_high, 80.0);
        assert_eq!(cfg.circles.accumulator_threshold, 25);
        assert_eq!(cfg.smoothing.kernel_size, 7);
        assert_eq!(cfg.circles.min_dist, 50.0);
    }

    #[test]
    fn lines_flags_map_to_overrides() {
        let cli = Cli::try_parse_from([
            "houghlab",
            "lines",
            "--image",
            "in.png",
            "--canny-high",
            "200",
            "--max-line-gap",
            "3",
        ])
        .unwrap();
        let Commands::Lines(args) = cli.command else {
            panic!("expected lines subcommand");
        };
        let mut cfg = AppConfig::default();
        args.common.edge_overrides().apply(&mut cfg.edges);
        args.to_overrides().apply(&mut cfg.lines);
        assert_eq!(cfg.edges.high, 200.0);
        assert_eq!(cfg.edges.low, 50.0);
        assert_eq!(cfg.lines.max_line_gap, 3);
        assert_eq!(cfg.lines.vote_threshold, 50);
    }
}
